//! Outcome label values for forward-window targets.

use serde::{Deserialize, Serialize};

/// Terminal state of a forward-looking label for one anchor row.
///
/// `Unobserved` means the patient's follow-up does not cover the full
/// lookahead horizon, so the absence of an event cannot be read as a negative.
/// It is a first-class output value, never an error, and is encoded as -1 so
/// downstream consumers can exclude it without conflating it with 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelValue {
    Positive,
    Negative,
    Unobserved,
}

impl LabelValue {
    /// Integer coding used in the output table: 1 / 0 / -1.
    pub fn as_code(self) -> i8 {
        match self {
            Self::Positive => 1,
            Self::Negative => 0,
            Self::Unobserved => -1,
        }
    }

    /// Resolve the censor-gated state machine: a qualifying event wins; with
    /// no event, the label is negative only when follow-up covers the horizon.
    pub fn resolve(event_in_window: bool, followed_up: bool) -> Self {
        if event_in_window {
            Self::Positive
        } else if followed_up {
            Self::Negative
        } else {
            Self::Unobserved
        }
    }
}
