//! Breakout/breakdown tracking across scans.
//!
//! A coin that shows a reliable break is remembered until price moves back
//! through the nearest retracement on the other side of the break level.
//! Entries are persisted best-effort through [`FileCache`].

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::analysis;
use super::file_cache::FileCache;
use super::fibonacci::FibonacciAnalyzer;
use super::filters::base_asset;
use super::format::{format_price, format_profit, format_volume};
use crate::types::{
    CoinData, CoinSignal, Exchange, FibSignal, FibonacciAnalysis, Level, SignalKind, Ticker,
    TrackedEntry, TrackingSnapshot,
};

const CACHE_KEY: &str = "tracking";
/// Exit band below support / above resistance.
const EXIT_BAND: f64 = 0.005;
/// Confidence reported for coins restored from tracking.
const TRACKED_CONFIDENCE: f64 = 85.0;
/// Synthetic window around a tracked coin's price.
const TRACKED_WINDOW: f64 = 0.2;

/// Tracked breakouts (resistance) and breakdowns (support).
pub struct TrackingStore {
    lists: RwLock<TrackingSnapshot>,
    analyzer: Arc<FibonacciAnalyzer>,
    cache: Option<FileCache>,
}

impl TrackingStore {
    /// Create a store, loading any persisted lists from `cache`.
    pub fn new(analyzer: Arc<FibonacciAnalyzer>, cache: Option<FileCache>) -> Arc<Self> {
        let lists = cache
            .as_ref()
            .and_then(|c| c.get_stale::<TrackingSnapshot>(CACHE_KEY))
            .unwrap_or_default();

        if !lists.breakouts.is_empty() || !lists.breakdowns.is_empty() {
            info!(
                "Loaded {} tracked breakouts and {} breakdowns",
                lists.breakouts.len(),
                lists.breakdowns.len()
            );
        }

        Arc::new(Self {
            lists: RwLock::new(lists),
            analyzer,
            cache,
        })
    }

    pub async fn snapshot(&self) -> TrackingSnapshot {
        self.lists.read().await.clone()
    }

    /// Remember the coin's primary signal. Returns false if the symbol is
    /// already tracked for that kind, or the coin has no signal.
    pub async fn record(&self, exchange: Exchange, coin: &CoinSignal) -> bool {
        let Some(signal) = coin.fibonacci.primary_signal() else {
            return false;
        };

        let entry = TrackedEntry {
            exchange,
            symbol: coin.symbol.clone(),
            price: coin.price,
            timestamp: chrono::Utc::now().timestamp_millis(),
            break_level: signal.level(),
            break_price: signal.price(),
            next_target: signal.next_target(),
            kind: signal.kind(),
        };

        let added = {
            let mut lists = self.lists.write().await;
            let list = match entry.kind {
                SignalKind::ResistanceBreak => &mut lists.breakouts,
                SignalKind::SupportBreak => &mut lists.breakdowns,
            };
            if list
                .iter()
                .any(|e| e.exchange == exchange && e.symbol == entry.symbol)
            {
                false
            } else {
                debug!("Tracking {} {}", entry.kind.label(), entry.symbol);
                list.push(entry);
                true
            }
        };

        if added {
            self.persist().await;
        }
        added
    }

    /// Drop tracked entries for `symbol` whose break has been invalidated.
    ///
    /// A breakout exits when price falls more than 0.5% below the next
    /// retracement under its break level (the next higher ratio); a breakdown
    /// exits when price rises more than 0.5% above the next retracement over
    /// it (the next lower ratio). Levels are matched by ratio, so a break
    /// price reloaded from disk never shadows its own level.
    /// Returns the number of entries removed.
    pub async fn check_exit_conditions(
        &self,
        symbol: &str,
        high: f64,
        low: f64,
        current_price: f64,
    ) -> usize {
        let levels = self.analyzer.calculator().calculate(high, low, current_price);
        let retracements: Vec<Level> = levels
            .retracements
            .into_iter()
            .filter(|l| l.price.is_finite())
            .collect();

        let removed = {
            let mut lists = self.lists.write().await;
            let before = lists.breakouts.len() + lists.breakdowns.len();

            lists.breakouts.retain(|tracked| {
                if tracked.symbol != symbol {
                    return true;
                }
                let support = retracements
                    .iter()
                    .filter(|l| l.ratio > tracked.break_level)
                    .min_by(|a, b| a.ratio.total_cmp(&b.ratio));
                match support {
                    Some(level) if current_price < level.price * (1.0 - EXIT_BAND) => {
                        info!("Removing {} breakout: support broken", symbol);
                        false
                    }
                    _ => true,
                }
            });

            lists.breakdowns.retain(|tracked| {
                if tracked.symbol != symbol {
                    return true;
                }
                let resistance = retracements
                    .iter()
                    .filter(|l| l.ratio < tracked.break_level)
                    .max_by(|a, b| a.ratio.total_cmp(&b.ratio));
                match resistance {
                    Some(level) if current_price > level.price * (1.0 + EXIT_BAND) => {
                        info!("Removing {} breakdown: resistance broken", symbol);
                        false
                    }
                    _ => true,
                }
            });

            before - (lists.breakouts.len() + lists.breakdowns.len())
        };

        if removed > 0 {
            self.persist().await;
        }
        removed
    }

    /// Drop `exchange`'s entries whose symbol is absent from `market`.
    /// An empty market is treated as a failed fetch and prunes nothing.
    pub async fn prune_missing(&self, exchange: Exchange, market: &[CoinData]) -> usize {
        if market.is_empty() {
            return 0;
        }

        let removed = {
            let mut lists = self.lists.write().await;
            let before = lists.breakouts.len() + lists.breakdowns.len();
            let listed = |entry: &TrackedEntry| {
                entry.exchange != exchange
                    || market.iter().any(|c| c.ticker.symbol == entry.symbol)
            };
            lists.breakouts.retain(listed);
            lists.breakdowns.retain(listed);
            before - (lists.breakouts.len() + lists.breakdowns.len())
        };

        if removed > 0 {
            info!("Dropped {} tracked {} entries no longer listed", removed, exchange);
            self.persist().await;
        }
        removed
    }

    /// Append `exchange`'s tracked entries whose symbol is missing from
    /// `coins`, priced from `market` when the symbol is listed there.
    pub async fn merge_into(
        &self,
        exchange: Exchange,
        coins: &mut Vec<CoinSignal>,
        market: &[CoinData],
    ) {
        let lists = self.lists.read().await;
        for entry in lists.breakouts.iter().chain(lists.breakdowns.iter()) {
            if entry.exchange != exchange || coins.iter().any(|c| c.symbol == entry.symbol) {
                continue;
            }
            let live = market
                .iter()
                .map(|c| &c.ticker)
                .find(|t| t.symbol == entry.symbol);
            coins.push(self.tracked_coin(entry, live));
        }
    }

    fn tracked_coin(&self, entry: &TrackedEntry, live: Option<&Ticker>) -> CoinSignal {
        let price = live.map_or(entry.price, |t| t.price);
        let high = price * (1.0 + TRACKED_WINDOW);
        let low = price * (1.0 - TRACKED_WINDOW);

        let mut levels = self.analyzer.calculator().calculate(high, low, price);
        levels.signals = vec![match entry.kind {
            SignalKind::ResistanceBreak => FibSignal::ResistanceBreak {
                level: entry.break_level,
                price: entry.break_price,
                next_target: entry.next_target,
            },
            SignalKind::SupportBreak => FibSignal::SupportBreak {
                level: entry.break_level,
                price: entry.break_price,
                next_target: entry.next_target,
            },
        }];

        let potential_profit = entry
            .next_target
            .map(|t| analysis::potential_profit(price, t.price));
        let volume = live.map_or(0.0, |t| t.volume);

        CoinSignal {
            symbol: entry.symbol.clone(),
            base_asset: base_asset(&entry.symbol),
            price,
            change: live.map_or(0.0, |t| t.change),
            volume,
            window_high: high,
            window_low: low,
            fibonacci: FibonacciAnalysis {
                high,
                low,
                current_price: price,
                levels,
                confidence: TRACKED_CONFIDENCE,
                reliable: true,
            },
            potential_profit,
            risk_reward: None,
            analysis: None,
            price_display: format_price(price),
            volume_display: format_volume(volume),
            profit_display: potential_profit.map(format_profit),
            tracked: true,
        }
    }

    async fn persist(&self) {
        if let Some(cache) = &self.cache {
            let snapshot = self.lists.read().await.clone();
            cache.set(CACHE_KEY, &snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::file_cache::tests::{
        cleanup_test_cache, create_test_cache, test_cache_dir,
    };

    fn store() -> Arc<TrackingStore> {
        TrackingStore::new(Arc::new(FibonacciAnalyzer::default()), None)
    }

    fn coin(symbol: &str, high: f64, low: f64, price: f64) -> CoinSignal {
        let fibonacci = FibonacciAnalyzer::default().analyze(high, low, price);
        CoinSignal {
            symbol: symbol.to_string(),
            base_asset: base_asset(symbol),
            price,
            change: 1.0,
            volume: 2_000_000.0,
            window_high: high,
            window_low: low,
            fibonacci,
            potential_profit: None,
            risk_reward: None,
            analysis: None,
            price_display: format_price(price),
            volume_display: format_volume(2_000_000.0),
            profit_display: None,
            tracked: false,
        }
    }

    fn listing(symbol: &str, price: f64) -> CoinData {
        CoinData {
            ticker: Ticker {
                symbol: symbol.to_string(),
                price,
                change: 4.0,
                volume: 3_000_000.0,
            },
            candles: Vec::new(),
        }
    }

    // =========================================================================
    // Recording Tests
    // =========================================================================

    #[tokio::test]
    async fn test_record_breakout_once() {
        let store = store();
        let btc = coin("BTCUSDT", 100.0, 0.0, 50.2);

        assert!(store.record(Exchange::Binance, &btc).await);
        assert!(!store.record(Exchange::Binance, &btc).await);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.breakouts.len(), 1);
        assert!(snapshot.breakdowns.is_empty());

        let entry = &snapshot.breakouts[0];
        assert_eq!(entry.kind, SignalKind::ResistanceBreak);
        assert_eq!(entry.break_level, 50.0);
        assert_eq!(entry.next_target.unwrap().ratio, 38.2);
    }

    #[tokio::test]
    async fn test_record_breakdown() {
        let store = store();
        assert!(store.record(Exchange::Binance, &coin("ETHUSDT", 100.0, 0.0, 49.9)).await);

        let snapshot = store.snapshot().await;
        assert!(snapshot.breakouts.is_empty());
        assert_eq!(snapshot.breakdowns.len(), 1);
    }

    #[tokio::test]
    async fn test_record_without_signal() {
        let store = store();
        assert!(!store.record(Exchange::Binance, &coin("SOLUSDT", 100.0, 0.0, 70.0)).await);
        assert_eq!(store.snapshot().await, TrackingSnapshot::default());
    }

    // =========================================================================
    // Exit Condition Tests
    // =========================================================================

    #[tokio::test]
    async fn test_breakout_exits_below_support() {
        let store = store();
        store.record(Exchange::Binance, &coin("BTCUSDT", 100.0, 0.0, 50.2)).await;

        // Nearest retracement below the 50 break is 38.2; exit below 38.009.
        assert_eq!(store.check_exit_conditions("BTCUSDT", 100.0, 0.0, 40.0).await, 0);
        assert_eq!(store.check_exit_conditions("BTCUSDT", 100.0, 0.0, 38.0).await, 1);
        assert!(store.snapshot().await.breakouts.is_empty());
    }

    #[tokio::test]
    async fn test_breakdown_exits_above_resistance() {
        let store = store();
        store.record(Exchange::Binance, &coin("ETHUSDT", 100.0, 0.0, 49.9)).await;

        // Nearest retracement above the 50 break is 61.8; exit above 62.109.
        assert_eq!(store.check_exit_conditions("ETHUSDT", 100.0, 0.0, 62.0).await, 0);
        assert_eq!(store.check_exit_conditions("ETHUSDT", 100.0, 0.0, 62.5).await, 1);
        assert!(store.snapshot().await.breakdowns.is_empty());
    }

    #[tokio::test]
    async fn test_exit_only_touches_symbol() {
        let store = store();
        store.record(Exchange::Binance, &coin("BTCUSDT", 100.0, 0.0, 50.2)).await;
        store.record(Exchange::Binance, &coin("ETHUSDT", 100.0, 0.0, 50.2)).await;

        assert_eq!(store.check_exit_conditions("BTCUSDT", 100.0, 0.0, 10.0).await, 1);
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.breakouts.len(), 1);
        assert_eq!(snapshot.breakouts[0].symbol, "ETHUSDT");
    }

    // =========================================================================
    // Merge Tests
    // =========================================================================

    #[tokio::test]
    async fn test_merge_adds_missing_tracked_coins() {
        let store = store();
        store.record(Exchange::Binance, &coin("BTCUSDT", 100.0, 0.0, 50.2)).await;
        store.record(Exchange::Binance, &coin("ETHUSDT", 100.0, 0.0, 49.9)).await;

        let mut coins = vec![coin("BTCUSDT", 100.0, 0.0, 50.2)];
        store.merge_into(Exchange::Binance, &mut coins, &[]).await;

        assert_eq!(coins.len(), 2);
        assert!(!coins[0].tracked);

        let eth = &coins[1];
        assert!(eth.tracked);
        assert_eq!(eth.base_asset, "ETH");
        assert_eq!(eth.fibonacci.confidence, 85.0);
        assert!(eth.fibonacci.reliable);
        assert!(eth.has_signal(SignalKind::SupportBreak));
        assert!((eth.window_high - 49.9 * 1.2).abs() < 1e-9);
        assert!((eth.window_low - 49.9 * 0.8).abs() < 1e-9);
        // Recorded break at 49.9, next target 61.8 at price 38.2.
        assert_eq!(eth.profit_display.as_deref(), Some("-23.45"));
    }

    #[tokio::test]
    async fn test_merge_uses_live_price() {
        let store = store();
        store.record(Exchange::Binance, &coin("BTCUSDT", 100.0, 0.0, 50.2)).await;

        let mut coins = Vec::new();
        let market = vec![listing("BTCUSDT", 55.0)];
        store.merge_into(Exchange::Binance, &mut coins, &market).await;

        let btc = &coins[0];
        assert!(btc.tracked);
        assert_eq!(btc.price, 55.0);
        assert_eq!(btc.fibonacci.current_price, 55.0);
        assert_eq!(btc.change, 4.0);
        assert_eq!(btc.volume, 3_000_000.0);
        assert!((btc.window_high - 66.0).abs() < 1e-9);
        assert!((btc.window_low - 44.0).abs() < 1e-9);
        // Target 61.8 from 55.0
        let profit = btc.potential_profit.unwrap();
        assert!((profit - (61.8 - 55.0) / 55.0 * 100.0).abs() < 1e-9);
        assert_eq!(btc.profit_display.as_deref(), Some("+12.36"));
    }

    // =========================================================================
    // Pruning Tests
    // =========================================================================

    #[tokio::test]
    async fn test_prune_drops_unlisted_symbols() {
        let store = store();
        store.record(Exchange::Binance, &coin("BTCUSDT", 100.0, 0.0, 50.2)).await;
        store.record(Exchange::Binance, &coin("ETHUSDT", 100.0, 0.0, 49.9)).await;
        store.record(Exchange::Okx, &coin("SOL-USDT", 100.0, 0.0, 50.2)).await;

        let market = vec![listing("BTCUSDT", 51.0)];
        assert_eq!(store.prune_missing(Exchange::Binance, &market).await, 1);

        let snapshot = store.snapshot().await;
        let symbols: Vec<&str> = snapshot.breakouts.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "SOL-USDT"]);
        assert!(snapshot.breakdowns.is_empty());
    }

    #[tokio::test]
    async fn test_prune_ignores_empty_market() {
        let store = store();
        store.record(Exchange::Binance, &coin("BTCUSDT", 100.0, 0.0, 50.2)).await;

        assert_eq!(store.prune_missing(Exchange::Binance, &[]).await, 0);
        assert_eq!(store.snapshot().await.breakouts.len(), 1);
    }

    #[tokio::test]
    async fn test_merge_ignores_other_exchange() {
        let store = store();
        store
            .record(Exchange::Okx, &coin("BTC-USDT", 100.0, 0.0, 50.2))
            .await;

        let mut coins = Vec::new();
        store.merge_into(Exchange::Binance, &mut coins, &[]).await;
        assert!(coins.is_empty());

        store.merge_into(Exchange::Okx, &mut coins, &[]).await;
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].symbol, "BTC-USDT");
    }

    // =========================================================================
    // Persistence Tests
    // =========================================================================

    #[tokio::test]
    async fn test_tracking_persists_through_cache() {
        let cache = create_test_cache("tracking_persist");
        let dir = test_cache_dir("tracking_persist");
        let analyzer = Arc::new(FibonacciAnalyzer::default());

        let first = TrackingStore::new(analyzer.clone(), Some(cache));
        first.record(Exchange::Binance, &coin("BTCUSDT", 100.0, 0.0, 50.2)).await;

        let reloaded = TrackingStore::new(analyzer, Some(FileCache::new(&dir)));
        let snapshot = reloaded.snapshot().await;
        assert_eq!(snapshot.breakouts.len(), 1);
        assert_eq!(snapshot.breakouts[0].symbol, "BTCUSDT");

        cleanup_test_cache(&FileCache::new(&dir));
    }

    #[tokio::test]
    async fn test_breakdown_holds_after_reload() {
        let cache = create_test_cache("tracking_reload_exit");
        let dir = test_cache_dir("tracking_reload_exit");
        let analyzer = Arc::new(FibonacciAnalyzer::default());

        // Support break at 76.4 (price 23.6), next resistance 61.8 at 38.2.
        let first = TrackingStore::new(analyzer.clone(), Some(cache));
        assert!(first.record(Exchange::Binance, &coin("BTCUSDT", 100.0, 0.0, 23.55)).await);
        assert_eq!(first.check_exit_conditions("BTCUSDT", 100.0, 0.0, 23.75).await, 0);

        let reloaded = TrackingStore::new(analyzer, Some(FileCache::new(&dir)));
        let entry = &reloaded.snapshot().await.breakdowns[0];
        assert_eq!(entry.break_level, 76.4);
        assert_eq!(reloaded.check_exit_conditions("BTCUSDT", 100.0, 0.0, 23.75).await, 0);
        assert_eq!(reloaded.snapshot().await.breakdowns.len(), 1);

        assert_eq!(reloaded.check_exit_conditions("BTCUSDT", 100.0, 0.0, 38.5).await, 1);

        cleanup_test_cache(&FileCache::new(&dir));
    }
}
