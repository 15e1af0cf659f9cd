//! Market scan cycle.
//!
//! A cycle pulls tickers and daily candles from one exchange, runs every
//! eligible pair through the Fibonacci pipeline, folds in tracked breaks and
//! stores the resulting [`ScanResult`] for the API.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::analysis;
use super::cache::Cache;
use super::fibonacci::{window_range, FibonacciAnalyzer};
use super::file_cache::FileCache;
use super::filters::{base_asset, is_stable_coin};
use super::format::{format_price, format_profit, format_volume};
use super::tracking::TrackingStore;
use crate::config::{Config, ScannerConfig};
use crate::error::Result;
use crate::sources::{BinanceClient, OkxClient};
use crate::types::{CoinData, CoinSignal, Exchange, ScanResult, ScanStats};

/// Shortest time a stored result stays servable.
const MIN_RESULT_TTL_SECS: u64 = 3600;
const MAX_RESULT_TTL_SECS: u64 = 7 * 86_400;

pub struct Scanner {
    config: ScannerConfig,
    poll_interval: Duration,
    analyzer: Arc<FibonacciAnalyzer>,
    tracking: Arc<TrackingStore>,
    binance: BinanceClient,
    okx: OkxClient,
    results: Cache<Exchange, ScanResult>,
    file_cache: Option<FileCache>,
    /// Serializes cycles so a manual refresh never overlaps the poller.
    cycle_lock: Mutex<()>,
}

impl Scanner {
    /// Create a scanner. Results persisted by a previous run are served
    /// until the first cycle completes, if they are still fresh.
    pub fn new(
        config: &Config,
        analyzer: Arc<FibonacciAnalyzer>,
        tracking: Arc<TrackingStore>,
        file_cache: Option<FileCache>,
    ) -> Arc<Self> {
        let ttl = result_ttl(config.poll_interval_secs);
        let results = Cache::new(ttl);

        if let Some(cache) = &file_cache {
            for exchange in Exchange::all() {
                if let Some(result) = cache.get::<ScanResult>(&result_key(exchange), ttl) {
                    info!(
                        "Restored {} scan with {} coins",
                        exchange,
                        result.coins.len()
                    );
                    results.set(exchange, result);
                }
            }
        }

        Arc::new(Self {
            config: config.scanner.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            analyzer,
            tracking,
            binance: BinanceClient::new(config.binance_api_key.clone(), config.scanner.clone()),
            okx: OkxClient::new(config.okx_api_key.clone(), config.scanner.clone()),
            results,
            file_cache,
            cycle_lock: Mutex::new(()),
        })
    }

    /// Most recent result for `exchange`, if any.
    pub fn latest(&self, exchange: Exchange) -> Option<ScanResult> {
        self.results.get(&exchange)
    }

    /// Fetch, analyze and store one scan of `exchange`.
    ///
    /// On error the previously stored result is left in place.
    pub async fn run_cycle(&self, exchange: Exchange) -> Result<ScanResult> {
        let _guard = self.cycle_lock.lock().await;
        info!("Scanning {}", exchange);

        let market = match exchange {
            Exchange::Binance => self.binance.fetch_market().await?,
            Exchange::Okx => self.okx.fetch_market().await?,
        };

        let result = self.build_result(exchange, &market).await;
        info!(
            "{} scan: {} coins ({} resistance, {} support) from {} pairs",
            exchange,
            result.stats.total_coins,
            result.stats.resistance_breaks,
            result.stats.support_breaks,
            result.scanned
        );

        self.store(result.clone());
        Ok(result)
    }

    /// Run `exchange` every poll interval in the background.
    pub fn start_polling(self: Arc<Self>, exchange: Exchange) {
        let scanner = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = scanner.run_cycle(exchange).await {
                    error!("{} scan failed: {}", exchange, e);
                }
                tokio::time::sleep(scanner.poll_interval).await;
            }
        });
    }

    /// Coins from `market` that carry at least one reliable signal.
    pub fn process_coins(&self, market: &[CoinData]) -> Vec<CoinSignal> {
        let mut coins: Vec<CoinSignal> = market
            .iter()
            .filter(|coin| self.is_eligible(coin))
            .filter_map(|coin| self.evaluate(coin))
            .collect();

        coins.sort_by(|a, b| {
            b.fibonacci
                .confidence
                .total_cmp(&a.fibonacci.confidence)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        coins
    }

    async fn build_result(&self, exchange: Exchange, market: &[CoinData]) -> ScanResult {
        let scanned = market.iter().filter(|coin| self.is_eligible(coin)).count();
        let mut coins = self.process_coins(market);

        for coin in market {
            if let Some((high, low)) = window_range(&coin.candles, self.config.lookback) {
                self.tracking
                    .check_exit_conditions(&coin.ticker.symbol, high, low, coin.ticker.price)
                    .await;
            }
        }
        self.tracking.prune_missing(exchange, market).await;
        for coin in &coins {
            self.tracking.record(exchange, coin).await;
        }
        self.tracking.merge_into(exchange, &mut coins, market).await;

        let timestamp = chrono::Utc::now().timestamp_millis();
        ScanResult {
            exchange,
            stats: ScanStats::from_coins(&coins, timestamp),
            coins,
            scanned,
            timestamp,
        }
    }

    fn store(&self, result: ScanResult) {
        if let Some(cache) = &self.file_cache {
            cache.set(&result_key(result.exchange), &result);
        }
        self.results.set(result.exchange, result);
    }

    fn is_eligible(&self, coin: &CoinData) -> bool {
        if is_stable_coin(&coin.ticker.symbol) {
            return false;
        }
        if coin.candles.len() < self.config.min_candles {
            debug!(
                "Skipping {}: {} candles",
                coin.ticker.symbol,
                coin.candles.len()
            );
            return false;
        }
        true
    }

    fn evaluate(&self, coin: &CoinData) -> Option<CoinSignal> {
        let ticker = &coin.ticker;
        let (high, low) = window_range(&coin.candles, self.config.lookback)?;
        let fibonacci = self.analyzer.analyze(high, low, ticker.price);

        let primary = fibonacci.primary_signal()?;
        let target = primary.next_target();
        let potential_profit =
            target.map(|target| analysis::potential_profit(ticker.price, target.price));

        let market = analysis::analyze(&coin.candles);
        let risk_reward = match (target, market.support) {
            (Some(target), Some(stop)) => analysis::risk_reward(ticker.price, target.price, stop),
            _ => None,
        };

        Some(CoinSignal {
            symbol: ticker.symbol.clone(),
            base_asset: base_asset(&ticker.symbol),
            price: ticker.price,
            change: ticker.change,
            volume: ticker.volume,
            window_high: high,
            window_low: low,
            fibonacci,
            potential_profit,
            risk_reward,
            analysis: Some(market),
            price_display: format_price(ticker.price),
            volume_display: format_volume(ticker.volume),
            profit_display: potential_profit.map(format_profit),
            tracked: false,
        })
    }
}

/// Twice the poll interval, kept within one hour and one week.
fn result_ttl(poll_interval_secs: u64) -> Duration {
    Duration::from_secs(
        poll_interval_secs
            .saturating_mul(2)
            .clamp(MIN_RESULT_TTL_SECS, MAX_RESULT_TTL_SECS),
    )
}

fn result_key(exchange: Exchange) -> String {
    format!("scan_{}", exchange)
}
