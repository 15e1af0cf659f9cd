use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange a scan runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    #[default]
    Binance,
    Okx,
}

impl Exchange {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "binance" => Some(Self::Binance),
            "okx" => Some(Self::Okx),
            _ => None,
        }
    }

    /// All supported exchanges.
    pub fn all() -> [Exchange; 2] {
        [Exchange::Binance, Exchange::Okx]
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Binance => write!(f, "binance"),
            Exchange::Okx => write!(f, "okx"),
        }
    }
}

/// Daily candle, reduced to the fields the scanner reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// Open time, unix milliseconds.
    pub time: i64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// 24h ticker for a spot pair, normalized across exchanges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    /// Exchange-native symbol (`BTCUSDT`, `BTC-USDT`).
    pub symbol: String,
    pub price: f64,
    /// 24h change in percent.
    pub change: f64,
    pub volume: f64,
}

/// Ticker plus its recent daily candles, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinData {
    pub ticker: Ticker,
    pub candles: Vec<Candle>,
}
