use serde::{Deserialize, Serialize};

use super::{Exchange, SignalKind, Target};

/// A breakout or breakdown kept across scans until its exit condition hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEntry {
    #[serde(default)]
    pub exchange: Exchange,
    pub symbol: String,
    /// Price when the break was first recorded.
    pub price: f64,
    /// Unix timestamp (milliseconds).
    pub timestamp: i64,
    pub break_level: f64,
    pub break_price: f64,
    pub next_target: Option<Target>,
    pub kind: SignalKind,
}

/// Both tracking lists, as persisted and served.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub breakouts: Vec<TrackedEntry>,
    pub breakdowns: Vec<TrackedEntry>,
}
