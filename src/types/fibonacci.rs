use serde::{Deserialize, Serialize};

/// A single Fibonacci level: ratio (percent) and the price it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub ratio: f64,
    pub price: f64,
}

/// Which level family a target was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelKind {
    Retracement,
    Extension,
}

/// The next level beyond a crossed one, in the direction of the break.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type")]
    pub kind: LevelKind,
    pub ratio: f64,
    pub price: f64,
}

/// Direction of a level crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    ResistanceBreak,
    SupportBreak,
}

impl SignalKind {
    /// Get display label.
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::ResistanceBreak => "Resistance Break",
            SignalKind::SupportBreak => "Support Break",
        }
    }
}

/// A level-crossing signal.
///
/// Serialized with a `type` tag so consumers see
/// `{"type": "resistance_break", "level": 50.0, "price": ..., "nextTarget": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FibSignal {
    ResistanceBreak {
        level: f64,
        price: f64,
        #[serde(rename = "nextTarget")]
        next_target: Option<Target>,
    },
    SupportBreak {
        level: f64,
        price: f64,
        #[serde(rename = "nextTarget")]
        next_target: Option<Target>,
    },
}

impl FibSignal {
    pub fn kind(&self) -> SignalKind {
        match self {
            FibSignal::ResistanceBreak { .. } => SignalKind::ResistanceBreak,
            FibSignal::SupportBreak { .. } => SignalKind::SupportBreak,
        }
    }

    /// Ratio of the crossed level.
    pub fn level(&self) -> f64 {
        match self {
            FibSignal::ResistanceBreak { level, .. } | FibSignal::SupportBreak { level, .. } => {
                *level
            }
        }
    }

    /// Price of the crossed level.
    pub fn price(&self) -> f64 {
        match self {
            FibSignal::ResistanceBreak { price, .. } | FibSignal::SupportBreak { price, .. } => {
                *price
            }
        }
    }

    pub fn next_target(&self) -> Option<Target> {
        match self {
            FibSignal::ResistanceBreak { next_target, .. }
            | FibSignal::SupportBreak { next_target, .. } => *next_target,
        }
    }
}

/// Retracement and extension levels for one price range, plus the signals
/// detected against the current price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceLevelSet {
    /// Retracement levels in configured ratio order.
    pub retracements: Vec<Level>,
    /// Extension levels in configured ratio order.
    pub extensions: Vec<Level>,
    /// At most one resistance break and one support break.
    pub signals: Vec<FibSignal>,
}

impl PriceLevelSet {
    /// Look up a retracement price by ratio.
    pub fn retracement(&self, ratio: f64) -> Option<f64> {
        find_level(&self.retracements, ratio)
    }

    /// Look up an extension price by ratio.
    pub fn extension(&self, ratio: f64) -> Option<f64> {
        find_level(&self.extensions, ratio)
    }

    /// First signal of the given kind, if any.
    pub fn signal(&self, kind: SignalKind) -> Option<&FibSignal> {
        self.signals.iter().find(|s| s.kind() == kind)
    }

    pub fn has_signal(&self, kind: SignalKind) -> bool {
        self.signal(kind).is_some()
    }
}

fn find_level(levels: &[Level], ratio: f64) -> Option<f64> {
    levels
        .iter()
        .find(|l| l.ratio == ratio)
        .map(|l| l.price)
}

/// Proximity-based confidence for a set of levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    /// Score in [10, 100].
    pub confidence: f64,
    pub reliable: bool,
}

/// Levels, signals and confidence for one instrument, after gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FibonacciAnalysis {
    pub high: f64,
    pub low: f64,
    pub current_price: f64,
    #[serde(flatten)]
    pub levels: PriceLevelSet,
    pub confidence: f64,
    pub reliable: bool,
}

impl FibonacciAnalysis {
    /// The signal shown for this instrument (resistance first).
    pub fn primary_signal(&self) -> Option<&FibSignal> {
        self.levels.signals.first()
    }
}
