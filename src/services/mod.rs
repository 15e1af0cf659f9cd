pub mod analysis;
pub mod cache;
pub mod fibonacci;
pub mod file_cache;
pub mod filters;
pub mod format;
pub mod scanner;
pub mod tracking;

pub use cache::Cache;
pub use fibonacci::{ConfidenceScorer, FibonacciAnalyzer, LevelCalculator};
pub use file_cache::FileCache;
pub use scanner::Scanner;
pub use tracking::TrackingStore;
