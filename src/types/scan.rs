use serde::{Deserialize, Serialize};

use super::{Exchange, FibonacciAnalysis, SignalKind};

/// Trend over recent closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Sideways,
    Undetermined,
}

/// Supplementary statistics shown next to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub trend: Trend,
    /// Standard deviation of recent closes as a percent of their mean.
    pub volatility: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
}

/// A coin that currently carries at least one reliable signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinSignal {
    pub symbol: String,
    /// Base asset with the quote stripped (`BTC`).
    pub base_asset: String,
    pub price: f64,
    pub change: f64,
    pub volume: f64,
    /// Highest high over the lookback window.
    pub window_high: f64,
    /// Lowest low over the lookback window.
    pub window_low: f64,
    pub fibonacci: FibonacciAnalysis,
    /// Percent move from price to the primary signal's next target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_profit: Option<f64>,
    /// Reward over risk with the candle support as the stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_reward: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<MarketAnalysis>,
    pub price_display: String,
    pub volume_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_display: Option<String>,
    /// True when the entry comes from the tracking list rather than this scan.
    #[serde(default)]
    pub tracked: bool,
}

impl CoinSignal {
    pub fn has_signal(&self, kind: SignalKind) -> bool {
        self.fibonacci.levels.has_signal(kind)
    }
}

/// Which coins to return from a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalFilter {
    #[default]
    All,
    Resistance,
    Support,
}

impl SignalFilter {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(Self::All),
            "resistance" => Some(Self::Resistance),
            "support" => Some(Self::Support),
            _ => None,
        }
    }

    pub fn matches(&self, coin: &CoinSignal) -> bool {
        match self {
            SignalFilter::All => true,
            SignalFilter::Resistance => coin.has_signal(SignalKind::ResistanceBreak),
            SignalFilter::Support => coin.has_signal(SignalKind::SupportBreak),
        }
    }
}

/// Signal counts for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub resistance_breaks: usize,
    pub support_breaks: usize,
    pub total_coins: usize,
    /// Unix timestamp (milliseconds).
    pub updated_at: i64,
}

impl ScanStats {
    pub fn from_coins(coins: &[CoinSignal], updated_at: i64) -> Self {
        Self {
            resistance_breaks: coins
                .iter()
                .filter(|c| c.has_signal(SignalKind::ResistanceBreak))
                .count(),
            support_breaks: coins
                .iter()
                .filter(|c| c.has_signal(SignalKind::SupportBreak))
                .count(),
            total_coins: coins.len(),
            updated_at,
        }
    }
}

/// Result of one poll cycle against one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub exchange: Exchange,
    pub coins: Vec<CoinSignal>,
    pub stats: ScanStats,
    /// Number of pairs that reached the calculator.
    pub scanned: usize,
    pub timestamp: i64,
}

impl ScanResult {
    /// Copy of this result restricted to coins matching `filter`.
    /// Stats always describe the full scan.
    pub fn filtered(&self, filter: SignalFilter) -> Self {
        Self {
            coins: self
                .coins
                .iter()
                .filter(|c| filter.matches(c))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}
