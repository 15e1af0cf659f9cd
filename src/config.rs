use std::env;

use crate::types::Exchange;

pub const DEFAULT_RETRACEMENTS: &[f64] = &[0.0, 23.6, 38.2, 50.0, 61.8, 76.4, 100.0];
pub const DEFAULT_EXTENSIONS: &[f64] = &[61.8, 100.0, 138.2, 161.8, 200.0, 261.8];

/// Fibonacci level configuration.
///
/// Immutable once built; the calculator and scorer only ever read it.
#[derive(Debug, Clone, PartialEq)]
pub struct FibonacciConfig {
    /// Retracement ratios in percent.
    pub retracements: Vec<f64>,
    /// Extension ratios in percent.
    pub extensions: Vec<f64>,
    /// Width of the crossing band as a percent of the current price.
    pub tolerance_pct: f64,
    /// Confidence a result must exceed to be reliable.
    pub reliability_threshold: f64,
    /// Confidence lost per percent of distance to the nearest level.
    pub confidence_decay: f64,
}

impl Default for FibonacciConfig {
    fn default() -> Self {
        Self {
            retracements: DEFAULT_RETRACEMENTS.to_vec(),
            extensions: DEFAULT_EXTENSIONS.to_vec(),
            tolerance_pct: 0.5,
            reliability_threshold: 80.0,
            confidence_decay: 20.0,
        }
    }
}

/// Market scan configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Daily candles requested per pair.
    pub candle_limit: usize,
    /// Candles (most recent) the high/low window spans.
    pub lookback: usize,
    /// Pairs with fewer candles than this are skipped.
    pub min_candles: usize,
    /// Minimum 24h base volume.
    pub min_volume: f64,
    /// Minimum last price.
    pub min_price: f64,
    pub binance_max_pairs: usize,
    pub okx_max_pairs: usize,
    pub okx_batch_size: usize,
    pub okx_batch_delay_ms: u64,
    pub okx_request_delay_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            candle_limit: 100,
            lookback: 50,
            min_candles: 50,
            min_volume: 1_000_000.0,
            min_price: 0.001,
            binance_max_pairs: 100,
            okx_max_pairs: 30,
            okx_batch_size: 3,
            okx_batch_delay_ms: 2000,
            okx_request_delay_ms: 500,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Exchange polled in the background.
    pub default_exchange: Exchange,
    /// Seconds between background scans.
    pub poll_interval_secs: u64,
    /// Binance API key (optional, public endpoints work without).
    pub binance_api_key: Option<String>,
    /// OKX API key (optional).
    pub okx_api_key: Option<String>,
    /// Directory for the best-effort JSON cache.
    pub cache_dir: String,
    pub scanner: ScannerConfig,
    pub fibonacci: FibonacciConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let scanner_defaults = ScannerConfig::default();
        let fib_defaults = FibonacciConfig::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 3001),
            default_exchange: env::var("DEFAULT_EXCHANGE")
                .ok()
                .and_then(|v| Exchange::from_str(&v))
                .unwrap_or_default(),
            poll_interval_secs: parse_var("POLL_INTERVAL_SECS", 300),
            binance_api_key: env::var("BINANCE_API_KEY").ok(),
            okx_api_key: env::var("OKX_API_KEY").ok(),
            cache_dir: env::var("CACHE_DIR").unwrap_or_else(|_| ".fibscan_cache".to_string()),
            scanner: ScannerConfig {
                candle_limit: parse_var("CANDLE_LIMIT", scanner_defaults.candle_limit),
                lookback: parse_var("LOOKBACK_CANDLES", scanner_defaults.lookback),
                min_candles: parse_var("MIN_CANDLES", scanner_defaults.min_candles),
                min_volume: parse_var("MIN_VOLUME", scanner_defaults.min_volume),
                min_price: parse_var("MIN_PRICE", scanner_defaults.min_price),
                binance_max_pairs: parse_var(
                    "BINANCE_MAX_PAIRS",
                    scanner_defaults.binance_max_pairs,
                ),
                okx_max_pairs: parse_var("OKX_MAX_PAIRS", scanner_defaults.okx_max_pairs),
                okx_batch_size: parse_var("OKX_BATCH_SIZE", scanner_defaults.okx_batch_size)
                    .max(1),
                okx_batch_delay_ms: parse_var(
                    "OKX_BATCH_DELAY_MS",
                    scanner_defaults.okx_batch_delay_ms,
                ),
                okx_request_delay_ms: parse_var(
                    "OKX_REQUEST_DELAY_MS",
                    scanner_defaults.okx_request_delay_ms,
                ),
            },
            fibonacci: FibonacciConfig {
                retracements: env::var("FIB_RETRACEMENTS")
                    .ok()
                    .map(|v| parse_ratio_list(&v, DEFAULT_RETRACEMENTS))
                    .unwrap_or(fib_defaults.retracements),
                extensions: env::var("FIB_EXTENSIONS")
                    .ok()
                    .map(|v| parse_ratio_list(&v, DEFAULT_EXTENSIONS))
                    .unwrap_or(fib_defaults.extensions),
                tolerance_pct: non_negative_var("FIB_TOLERANCE_PCT", fib_defaults.tolerance_pct),
                reliability_threshold: non_negative_var(
                    "CONFIDENCE_THRESHOLD",
                    fib_defaults.reliability_threshold,
                ),
                confidence_decay: fib_defaults.confidence_decay,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_negative_var(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| parse_non_negative(&v))
        .unwrap_or(default)
}

/// Parse a finite, non-negative number. NaN, infinities and negatives are rejected.
pub fn parse_non_negative(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parse a comma-separated ratio list ("0,23.6,38.2").
/// Unparsable or non-finite entries are dropped; an empty result yields `fallback`.
pub fn parse_ratio_list(raw: &str, fallback: &[f64]) -> Vec<f64> {
    let ratios: Vec<f64> = raw
        .split(',')
        .filter_map(|part| part.trim().parse::<f64>().ok())
        .filter(|r| r.is_finite())
        .collect();

    if ratios.is_empty() {
        fallback.to_vec()
    } else {
        ratios
    }
}
