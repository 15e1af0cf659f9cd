//! fibscan - Fibonacci breakout scanner for crypto spot markets

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

use std::sync::Arc;

use config::Config;
use services::{FibonacciAnalyzer, FileCache, Scanner, TrackingStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<FibonacciAnalyzer>,
    pub tracking: Arc<TrackingStore>,
    pub scanner: Arc<Scanner>,
}

impl AppState {
    /// Wire up services from `config`. Persisted tracking lists and scan
    /// results under `config.cache_dir` are loaded here.
    pub fn new(config: &Config) -> Self {
        let analyzer = Arc::new(FibonacciAnalyzer::new(&config.fibonacci));
        let tracking = TrackingStore::new(
            analyzer.clone(),
            Some(FileCache::new(&config.cache_dir)),
        );
        let scanner = Scanner::new(
            config,
            analyzer.clone(),
            tracking.clone(),
            Some(FileCache::new(&config.cache_dir)),
        );

        Self {
            analyzer,
            tracking,
            scanner,
        }
    }
}

// Re-export commonly used types
pub use error::{AppError, Result};
pub use types::*;
