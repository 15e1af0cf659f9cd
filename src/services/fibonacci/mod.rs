//! Fibonacci retracement analysis.
//!
//! Level calculation and signal detection live in [`levels`], proximity
//! scoring in [`confidence`]. [`FibonacciAnalyzer`] composes the two and
//! applies the reliability gate.

pub mod confidence;
pub mod levels;

pub use confidence::ConfidenceScorer;
pub use levels::LevelCalculator;

use tracing::debug;

use crate::config::FibonacciConfig;
use crate::types::{Candle, FibonacciAnalysis};

/// Levels + confidence pipeline for a single instrument.
///
/// Signals are dropped when the confidence score is not reliable.
pub struct FibonacciAnalyzer {
    calculator: LevelCalculator,
    scorer: ConfidenceScorer,
}

impl Default for FibonacciAnalyzer {
    fn default() -> Self {
        Self::new(&FibonacciConfig::default())
    }
}

impl FibonacciAnalyzer {
    pub fn new(config: &FibonacciConfig) -> Self {
        Self {
            calculator: LevelCalculator::new(config),
            scorer: ConfidenceScorer::new(config),
        }
    }

    pub fn calculator(&self) -> &LevelCalculator {
        &self.calculator
    }

    pub fn analyze(&self, high: f64, low: f64, current_price: f64) -> FibonacciAnalysis {
        let mut levels = self.calculator.calculate(high, low, current_price);
        let score = self.scorer.score(current_price, &levels.retracements);

        if !score.reliable && !levels.signals.is_empty() {
            debug!(
                current_price,
                confidence = score.confidence,
                "dropping {} unreliable signal(s)",
                levels.signals.len()
            );
            levels.signals.clear();
        }

        FibonacciAnalysis {
            high,
            low,
            current_price,
            levels,
            confidence: score.confidence,
            reliable: score.reliable,
        }
    }
}

/// Highest high and lowest low over the last `lookback` candles.
pub fn window_range(candles: &[Candle], lookback: usize) -> Option<(f64, f64)> {
    let start = candles.len().saturating_sub(lookback);
    let window = &candles[start..];
    if window.is_empty() {
        return None;
    }

    let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    Some((high, low))
}
