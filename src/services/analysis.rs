//! Supplementary market statistics over daily candles.

use crate::types::{Candle, MarketAnalysis, Trend};

const TREND_WINDOW: usize = 10;
const STATS_WINDOW: usize = 20;

/// Trend/volatility/percentile statistics for one candle series.
pub fn analyze(candles: &[Candle]) -> MarketAnalysis {
    MarketAnalysis {
        trend: trend(candles),
        volatility: volatility(candles),
        support: support(candles),
        resistance: resistance(candles),
    }
}

/// Compare the mean of the last 10 closes against the 10 before them.
/// More than 2% higher is up, more than 2% lower is down.
pub fn trend(candles: &[Candle]) -> Trend {
    if candles.len() < 2 * TREND_WINDOW {
        return Trend::Undetermined;
    }

    let n = candles.len();
    let recent = mean_close(&candles[n - TREND_WINDOW..]);
    let older = mean_close(&candles[n - 2 * TREND_WINDOW..n - TREND_WINDOW]);

    if recent > older * 1.02 {
        Trend::Up
    } else if recent < older * 0.98 {
        Trend::Down
    } else {
        Trend::Sideways
    }
}

/// Population standard deviation of the last 20 closes as a percent of their mean.
pub fn volatility(candles: &[Candle]) -> f64 {
    if candles.len() < STATS_WINDOW {
        return 0.0;
    }

    let window = &candles[candles.len() - STATS_WINDOW..];
    let avg = mean_close(window);
    if avg == 0.0 {
        return 0.0;
    }
    let variance = window
        .iter()
        .map(|c| (c.close - avg).powi(2))
        .sum::<f64>()
        / window.len() as f64;

    variance.sqrt() / avg * 100.0
}

/// 20th percentile of the last 20 lows.
pub fn support(candles: &[Candle]) -> Option<f64> {
    if candles.len() < STATS_WINDOW {
        return None;
    }
    let mut lows: Vec<f64> = candles[candles.len() - STATS_WINDOW..]
        .iter()
        .map(|c| c.low)
        .collect();
    lows.sort_by(|a, b| a.total_cmp(b));
    lows.get(lows.len() / 5).copied()
}

/// 80th percentile of the last 20 highs.
pub fn resistance(candles: &[Candle]) -> Option<f64> {
    if candles.len() < STATS_WINDOW {
        return None;
    }
    let mut highs: Vec<f64> = candles[candles.len() - STATS_WINDOW..]
        .iter()
        .map(|c| c.high)
        .collect();
    highs.sort_by(|a, b| b.total_cmp(a));
    highs.get(highs.len() / 5).copied()
}

/// Percent move from `current_price` to `target_price`.
pub fn potential_profit(current_price: f64, target_price: f64) -> f64 {
    if current_price == 0.0 {
        return 0.0;
    }
    (target_price - current_price) / current_price * 100.0
}

/// Reward-to-risk ratio for a target and stop. None when the stop equals the price.
pub fn risk_reward(current_price: f64, target_price: f64, stop_loss: f64) -> Option<f64> {
    let reward = (target_price - current_price).abs();
    let risk = (current_price - stop_loss).abs();
    if risk == 0.0 {
        None
    } else {
        Some(reward / risk)
    }
}

fn mean_close(candles: &[Candle]) -> f64 {
    candles.iter().map(|c| c.close).sum::<f64>() / candles.len() as f64
}
