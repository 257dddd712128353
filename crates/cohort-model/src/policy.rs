//! Reduction policies for the windowed join engine.

use serde::{Deserialize, Serialize};

/// Aggregate kinds for statistical-summary reduction.
///
/// Output columns are suffixed with the aggregate name so a single payload
/// column can be reduced several ways in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    /// Chronologically first non-null value in the window.
    First,
    /// Chronologically last non-null value in the window.
    Last,
    Sum,
    Max,
    Min,
    Mean,
    Count,
}

impl Aggregate {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::First => "_FIRST",
            Self::Last => "_LAST",
            Self::Sum => "_SUM",
            Self::Max => "_MAX",
            Self::Min => "_MIN",
            Self::Mean => "_AVG",
            Self::Count => "_COUNT",
        }
    }

    /// First/Last carry any payload type; the rest only apply to numeric
    /// columns.
    pub fn numeric_only(&self) -> bool {
        !matches!(self, Self::First | Self::Last)
    }
}

/// Tie-break rule when two feature rows are exactly equidistant from the
/// anchor in a nearest-to-anchor reduction.
///
/// The default prefers the row strictly before the anchor ("most recently
/// known" semantics). This is an explicit, per-call rule rather than a global
/// assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    #[default]
    Earlier,
    Later,
}
