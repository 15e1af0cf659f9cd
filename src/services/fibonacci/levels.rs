//! Fibonacci level calculator.

use std::cmp::Ordering;

use tracing::trace;

use crate::config::FibonacciConfig;
use crate::types::{FibSignal, Level, LevelKind, PriceLevelSet, Target};

/// Fibonacci retracement/extension calculator.
///
/// Levels for a range `[low, high]`:
/// - Retracement r: `high - range * r / 100`
/// - Extension r: `high + range * (r - 100) / 100`
///
/// Signals, with `tolerance = price * tolerance_pct / 100`:
/// - Resistance break: first ratio (ascending) with `level < price <= level + tolerance`
/// - Support break: first ratio (descending) with `level - tolerance <= price < level`
pub struct LevelCalculator {
    retracements: Vec<f64>,
    extensions: Vec<f64>,
    /// Retracement ratios sorted ascending, for scanning and target search.
    sorted_retracements: Vec<f64>,
    sorted_extensions: Vec<f64>,
    tolerance_pct: f64,
}

impl Default for LevelCalculator {
    fn default() -> Self {
        Self::new(&FibonacciConfig::default())
    }
}

impl LevelCalculator {
    pub fn new(config: &FibonacciConfig) -> Self {
        Self {
            retracements: config.retracements.clone(),
            extensions: config.extensions.clone(),
            sorted_retracements: sorted(&config.retracements),
            sorted_extensions: sorted(&config.extensions),
            tolerance_pct: config.tolerance_pct,
        }
    }

    /// Compute levels for `[low, high]` and detect crossings at `current_price`.
    ///
    /// Degenerate input (`high <= low`, non-finite values) still yields the
    /// raw levels but never any signal.
    pub fn calculate(&self, high: f64, low: f64, current_price: f64) -> PriceLevelSet {
        let range = high - low;

        let retracements: Vec<Level> = self
            .retracements
            .iter()
            .map(|&ratio| Level {
                ratio,
                price: high - range * ratio / 100.0,
            })
            .collect();

        let extensions: Vec<Level> = self
            .extensions
            .iter()
            .map(|&ratio| Level {
                ratio,
                price: high + range * (ratio - 100.0) / 100.0,
            })
            .collect();

        let mut levels = PriceLevelSet {
            retracements,
            extensions,
            signals: Vec::new(),
        };

        if !is_valid_range(high, low, current_price) {
            trace!(high, low, current_price, "degenerate range, no signals");
            return levels;
        }

        let tolerance = current_price * self.tolerance_pct / 100.0;

        if let Some(signal) = self.scan_resistance(&levels, current_price, tolerance) {
            levels.signals.push(signal);
        }
        if let Some(signal) = self.scan_support(&levels, current_price, tolerance) {
            levels.signals.push(signal);
        }

        levels
    }

    fn scan_resistance(
        &self,
        levels: &PriceLevelSet,
        current_price: f64,
        tolerance: f64,
    ) -> Option<FibSignal> {
        self.sorted_retracements.iter().find_map(|&ratio| {
            let price = levels.retracement(ratio)?;
            if current_price > price && current_price <= price + tolerance {
                trace!(ratio, price, current_price, "resistance break");
                Some(FibSignal::ResistanceBreak {
                    level: ratio,
                    price,
                    next_target: self.next_resistance(ratio, levels),
                })
            } else {
                None
            }
        })
    }

    fn scan_support(
        &self,
        levels: &PriceLevelSet,
        current_price: f64,
        tolerance: f64,
    ) -> Option<FibSignal> {
        self.sorted_retracements.iter().rev().find_map(|&ratio| {
            let price = levels.retracement(ratio)?;
            if current_price < price && current_price >= price - tolerance {
                trace!(ratio, price, current_price, "support break");
                Some(FibSignal::SupportBreak {
                    level: ratio,
                    price,
                    next_target: self.next_support(ratio, levels),
                })
            } else {
                None
            }
        })
    }

    /// Next level above a crossed retracement.
    ///
    /// Walks toward lower ratios (higher prices) for the first retracement priced
    /// strictly above the crossed one, then falls back to the first extension
    /// (ascending ratio) that is strictly above it.
    pub fn next_resistance(&self, ratio: f64, levels: &PriceLevelSet) -> Option<Target> {
        let crossed = levels.retracement(ratio)?;
        let index = self.sorted_retracements.iter().position(|&r| r == ratio)?;

        let retracement = self.sorted_retracements[..index]
            .iter()
            .rev()
            .filter_map(|&r| levels.retracement(r).map(|price| (r, price)))
            .find(|&(_, price)| price > crossed)
            .map(|(ratio, price)| Target {
                kind: LevelKind::Retracement,
                ratio,
                price,
            });

        retracement.or_else(|| {
            self.sorted_extensions
                .iter()
                .filter_map(|&r| levels.extension(r).map(|price| (r, price)))
                .find(|&(_, price)| price > crossed)
                .map(|(ratio, price)| Target {
                    kind: LevelKind::Extension,
                    ratio,
                    price,
                })
        })
    }

    /// Next level below a crossed retracement.
    ///
    /// Walks toward higher ratios (lower prices); there is no extension fallback.
    pub fn next_support(&self, ratio: f64, levels: &PriceLevelSet) -> Option<Target> {
        let crossed = levels.retracement(ratio)?;
        let index = self.sorted_retracements.iter().position(|&r| r == ratio)?;

        self.sorted_retracements[index + 1..]
            .iter()
            .filter_map(|&r| levels.retracement(r).map(|price| (r, price)))
            .find(|&(_, price)| price < crossed)
            .map(|(ratio, price)| Target {
                kind: LevelKind::Retracement,
                ratio,
                price,
            })
    }
}

fn is_valid_range(high: f64, low: f64, current_price: f64) -> bool {
    high.is_finite() && low.is_finite() && current_price.is_finite() && high > low
}

fn sorted(ratios: &[f64]) -> Vec<f64> {
    let mut sorted = ratios.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted.dedup();
    sorted
}
