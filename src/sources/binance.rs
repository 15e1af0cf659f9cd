use crate::config::ScannerConfig;
use crate::error::{AppError, Result};
use crate::services::filters::{is_stable_coin, parse_number};
use crate::types::{Candle, CoinData, Ticker};
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

const BINANCE_API_URL: &str = "https://api1.binance.com/api/v3";
/// Candle requests in flight at once.
const MAX_CONCURRENT_KLINES: usize = 10;

/// Binance 24hr ticker response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTicker {
    symbol: String,
    last_price: String,
    price_change_percent: String,
    volume: String,
}

impl BinanceTicker {
    fn to_ticker(&self) -> Ticker {
        Ticker {
            symbol: self.symbol.clone(),
            price: parse_number(&self.last_price),
            change: parse_number(&self.price_change_percent),
            volume: parse_number(&self.volume),
        }
    }
}

/// Binance REST client.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    api_key: Option<String>,
    config: ScannerConfig,
}

impl BinanceClient {
    /// Create a new Binance client.
    pub fn new(api_key: Option<String>, config: ScannerConfig) -> Self {
        let client = Client::builder()
            .user_agent("fibscan/0.1")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            config,
        }
    }

    /// Fetch qualifying USDT pairs with their daily candles.
    ///
    /// Pairs whose candles fail to load are dropped.
    pub async fn fetch_market(&self) -> Result<Vec<CoinData>> {
        let tickers = self.fetch_tickers().await?;
        info!("Binance: {} qualifying pairs", tickers.len());

        let coins: Vec<CoinData> = stream::iter(tickers)
            .map(|ticker| async move {
                match self.fetch_klines(&ticker.symbol).await {
                    Ok(candles) => Some(CoinData { ticker, candles }),
                    Err(e) => {
                        warn!("Binance: skipping {}: {}", ticker.symbol, e);
                        None
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_KLINES)
            .filter_map(|coin| async move { coin })
            .collect()
            .await;

        Ok(coins)
    }

    /// Fetch 24h tickers and keep the USDT pairs worth scanning.
    pub async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        let url = format!("{}/ticker/24hr", BINANCE_API_URL);
        let response = self.request(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(
                "Binance API returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            );
            return Err(AppError::from_status("binance", status));
        }

        let tickers: Vec<BinanceTicker> = response.json().await?;
        Ok(select_tickers(&tickers, &self.config))
    }

    /// Fetch daily candles for a trading pair, oldest first.
    pub async fn fetch_klines(&self, symbol: &str) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/klines?symbol={}&interval=1d&limit={}",
            BINANCE_API_URL, symbol, self.config.candle_limit
        );
        let response = self.request(&url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::from_status("binance", response.status()));
        }

        let rows: Vec<Vec<Value>> = response.json().await?;
        let candles = parse_klines(&rows);
        debug!("Binance: {} candles for {}", candles.len(), symbol);
        Ok(candles)
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(ref key) = self.api_key {
            request = request.header("X-MBX-APIKEY", key);
        }
        request
    }
}

fn select_tickers(tickers: &[BinanceTicker], config: &ScannerConfig) -> Vec<Ticker> {
    tickers
        .iter()
        .filter(|t| t.symbol.ends_with("USDT") && !is_stable_coin(&t.symbol))
        .map(BinanceTicker::to_ticker)
        .filter(|t| t.volume > config.min_volume && t.change != 0.0 && t.price > config.min_price)
        .take(config.binance_max_pairs)
        .collect()
}

/// Parse kline rows (`[openTime, open, high, low, close, ...]`), skipping
/// malformed rows.
pub(crate) fn parse_klines(rows: &[Vec<Value>]) -> Vec<Candle> {
    rows.iter().filter_map(|row| parse_kline_row(row)).collect()
}

/// Parse one `[time, open, high, low, close, ...]` row. Fields may be JSON
/// numbers or numeric strings.
pub(crate) fn parse_kline_row(row: &[Value]) -> Option<Candle> {
    if row.len() < 5 {
        return None;
    }
    let time = value_as_f64(&row[0])? as i64;
    let high = value_as_f64(&row[2])?;
    let low = value_as_f64(&row[3])?;
    let close = value_as_f64(&row[4])?;
    Some(Candle {
        time,
        high,
        low,
        close,
    })
}

fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker_json(symbol: &str, price: &str, change: &str, volume: &str) -> String {
        format!(
            r#"{{"symbol":"{}","lastPrice":"{}","priceChangePercent":"{}","volume":"{}","quoteVolume":"1","highPrice":"1","lowPrice":"0.5"}}"#,
            symbol, price, change, volume
        )
    }

    // =========================================================================
    // BinanceTicker Tests
    // =========================================================================

    #[test]
    fn test_binance_ticker_deserialization() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "lastPrice": "43500.50",
            "priceChangePercent": "2.5",
            "volume": "25000.5",
            "quoteVolume": "1087512500.25",
            "highPrice": "44000.00",
            "lowPrice": "42000.00"
        }"#;

        let ticker: BinanceTicker = serde_json::from_str(json).unwrap();
        let normalized = ticker.to_ticker();
        assert_eq!(normalized.symbol, "BTCUSDT");
        assert_eq!(normalized.price, 43500.5);
        assert_eq!(normalized.change, 2.5);
        assert_eq!(normalized.volume, 25000.5);
    }

    // =========================================================================
    // Ticker Selection Tests
    // =========================================================================

    #[test]
    fn test_select_tickers_filters() {
        let json = format!(
            "[{}]",
            [
                ticker_json("BTCUSDT", "43500", "2.5", "5000000"),
                ticker_json("ETHBTC", "0.05", "1.0", "5000000"),
                ticker_json("USDCUSDT", "1.0", "0.01", "90000000"),
                ticker_json("LOWVOLUSDT", "5", "3.0", "1000"),
                ticker_json("FLATUSDT", "5", "0.000", "5000000"),
                ticker_json("DUSTUSDT", "0.0001", "4.0", "5000000000"),
                ticker_json("SOLUSDT", "100", "-1.2", "2000000"),
            ]
            .join(",")
        );
        let tickers: Vec<BinanceTicker> = serde_json::from_str(&json).unwrap();
        let selected = select_tickers(&tickers, &ScannerConfig::default());

        let symbols: Vec<&str> = selected.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "SOLUSDT"]);
    }

    #[test]
    fn test_select_tickers_respects_max_pairs() {
        let json = format!(
            "[{}]",
            (0..5)
                .map(|i| ticker_json(&format!("C{}USDT", i), "10", "1", "5000000"))
                .collect::<Vec<_>>()
                .join(",")
        );
        let tickers: Vec<BinanceTicker> = serde_json::from_str(&json).unwrap();
        let config = ScannerConfig {
            binance_max_pairs: 3,
            ..ScannerConfig::default()
        };
        assert_eq!(select_tickers(&tickers, &config).len(), 3);
    }

    // =========================================================================
    // Kline Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_klines() {
        let json = r#"[
            [1700000000000, "36000.0", "37000.5", "35500.0", "36800.1", "1200.5", 1700086399999, "0", 100, "0", "0", "0"],
            [1700086400000, "36800.1", "38000.0", "36500.0", "37900.0", "900.1", 1700172799999, "0", 100, "0", "0", "0"]
        ]"#;
        let rows: Vec<Vec<Value>> = serde_json::from_str(json).unwrap();
        let candles = parse_klines(&rows);

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, 1700000000000);
        assert_eq!(candles[0].high, 37000.5);
        assert_eq!(candles[0].low, 35500.0);
        assert_eq!(candles[1].close, 37900.0);
    }

    #[test]
    fn test_parse_klines_skips_malformed_rows() {
        let json = r#"[
            [1700000000000, "1", "2"],
            [1700000000000, "1", "abc", "0.5", "1.5"],
            [1700000000000, 1.0, 2.0, 0.5, 1.5]
        ]"#;
        let rows: Vec<Vec<Value>> = serde_json::from_str(json).unwrap();
        let candles = parse_klines(&rows);

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].high, 2.0);
    }
}
