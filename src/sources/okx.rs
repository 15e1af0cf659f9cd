use crate::config::ScannerConfig;
use crate::error::{AppError, Result};
use crate::services::filters::{is_problematic, is_stable_coin, parse_number};
use crate::types::{Candle, CoinData, Ticker};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const OKX_API_URL: &str = "https://www.okx.com/api/v5";

/// OKX response envelope.
#[derive(Debug, Deserialize)]
struct OkxResponse<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T> OkxResponse<T> {
    fn into_data(self) -> Result<Vec<T>> {
        if self.code != "0" {
            warn!("OKX API error: {} - {}", self.code, self.msg);
            return Err(AppError::ExternalApi(format!(
                "okx error {}: {}",
                self.code, self.msg
            )));
        }
        Ok(self.data)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OkxTicker {
    inst_id: String,
    last: String,
    #[serde(default)]
    open24h: String,
    vol24h: String,
}

impl OkxTicker {
    fn to_ticker(&self) -> Ticker {
        let price = parse_number(&self.last);
        Ticker {
            symbol: self.inst_id.clone(),
            price,
            change: change_percent(price, parse_number(&self.open24h)),
            volume: parse_number(&self.vol24h),
        }
    }
}

/// Percent change from `open` to `last`; 0 when there is no open price.
pub(crate) fn change_percent(last: f64, open: f64) -> f64 {
    if open > 0.0 {
        (last - open) / open * 100.0
    } else {
        0.0
    }
}

/// OKX REST client.
///
/// Candle requests are paced (a delay before each request and a longer one
/// between batches) to stay clear of OKX's per-IP limits.
#[derive(Clone)]
pub struct OkxClient {
    client: Client,
    api_key: Option<String>,
    config: ScannerConfig,
}

impl OkxClient {
    /// Create a new OKX client.
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

    /// Fetch qualifying USDT instruments with their daily candles.
    pub async fn fetch_market(&self) -> Result<Vec<CoinData>> {
        let mut tickers = self.fetch_tickers().await?;
        tickers.truncate(self.config.okx_max_pairs);

        let batch_size = self.config.okx_batch_size.max(1);
        let batch_count = tickers.len().div_ceil(batch_size);
        let mut coins = Vec::with_capacity(tickers.len());

        for (index, batch) in tickers.chunks(batch_size).enumerate() {
            debug!("OKX: processing batch {} of {}", index + 1, batch_count);

            for ticker in batch {
                tokio::time::sleep(Duration::from_millis(self.config.okx_request_delay_ms)).await;
                match self.fetch_klines(&ticker.symbol).await {
                    Ok(candles) => coins.push(CoinData {
                        ticker: ticker.clone(),
                        candles,
                    }),
                    Err(e) => warn!("OKX: skipping {}: {}", ticker.symbol, e),
                }
            }

            if index + 1 < batch_count {
                debug!("OKX: waiting {}ms before next batch", self.config.okx_batch_delay_ms);
                tokio::time::sleep(Duration::from_millis(self.config.okx_batch_delay_ms)).await;
            }
        }

        info!("OKX: loaded candles for {} instruments", coins.len());
        Ok(coins)
    }

    /// Fetch spot tickers and keep the USDT instruments worth scanning.
    pub async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        let url = format!("{}/market/tickers?instType=SPOT", OKX_API_URL);
        let response = self.request(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!("OKX API returned {}: {}", status, text.chars().take(200).collect::<String>());
            return Err(AppError::from_status("okx", status));
        }

        let data: OkxResponse<OkxTicker> = response.json().await?;
        Ok(select_tickers(&data.into_data()?, &self.config))
    }

    /// Fetch daily candles for an instrument, oldest first.
    pub async fn fetch_klines(&self, inst_id: &str) -> Result<Vec<Candle>> {
        if is_problematic(inst_id) {
            warn!("OKX: ignoring problematic instrument {}", inst_id);
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/market/candles?instId={}&bar=1D&limit={}",
            OKX_API_URL, inst_id, self.config.candle_limit
        );
        let response = self.request(&url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::from_status("okx", response.status()));
        }

        let data: OkxResponse<Vec<String>> = response.json().await?;
        Ok(parse_candles(data.into_data()?))
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(ref key) = self.api_key {
            request = request.header("OK-ACCESS-KEY", key);
        }
        request
    }
}

fn select_tickers(tickers: &[OkxTicker], config: &ScannerConfig) -> Vec<Ticker> {
    tickers
        .iter()
        .filter(|t| t.inst_id.ends_with("-USDT") && !is_stable_coin(&t.inst_id))
        .map(OkxTicker::to_ticker)
        .filter(|t| t.volume > config.min_volume && t.price > config.min_price)
        .collect()
}

/// Parse `[ts, o, h, l, c, ...]` rows. OKX returns newest first; the result
/// is oldest first.
fn parse_candles(rows: Vec<Vec<String>>) -> Vec<Candle> {
    let mut candles: Vec<Candle> = rows
        .iter()
        .filter(|row| row.len() >= 5)
        .filter_map(|row| {
            Some(Candle {
                time: row[0].parse().ok()?,
                high: row[2].parse().ok()?,
                low: row[3].parse().ok()?,
                close: row[4].parse().ok()?,
            })
        })
        .collect();
    candles.reverse();
    candles
}
