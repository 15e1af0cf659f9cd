//! Proximity-based confidence scoring.

use crate::config::FibonacciConfig;
use crate::types::{ConfidenceResult, Level};

const MIN_CONFIDENCE: f64 = 10.0;
const MAX_CONFIDENCE: f64 = 100.0;

/// Scores how close a price sits to its nearest retracement level.
///
/// `confidence = clamp(100 - d * decay, 10, 100)` where `d` is the distance to
/// the nearest level as a percent of the price. With the default decay of 20,
/// prices within 1% of a level score at least 80.
pub struct ConfidenceScorer {
    threshold: f64,
    decay: f64,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(&FibonacciConfig::default())
    }
}

impl ConfidenceScorer {
    pub fn new(config: &FibonacciConfig) -> Self {
        Self {
            threshold: config.reliability_threshold,
            decay: config.confidence_decay,
        }
    }

    pub fn score(&self, current_price: f64, retracements: &[Level]) -> ConfidenceResult {
        let Some(distance) = nearest_distance_pct(current_price, retracements) else {
            return self.result(MIN_CONFIDENCE);
        };

        let confidence = (MAX_CONFIDENCE - distance * self.decay).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);
        self.result(confidence)
    }

    fn result(&self, confidence: f64) -> ConfidenceResult {
        ConfidenceResult {
            confidence,
            reliable: confidence > self.threshold,
        }
    }
}

/// Smallest `|price - level| / price * 100` over all finite levels.
fn nearest_distance_pct(current_price: f64, levels: &[Level]) -> Option<f64> {
    if !current_price.is_finite() || current_price <= 0.0 {
        return None;
    }

    levels
        .iter()
        .filter(|l| l.price.is_finite())
        .map(|l| (current_price - l.price).abs() / current_price * 100.0)
        .fold(None, |min: Option<f64>, d| Some(min.map_or(d, |m| m.min(d))))
}
