//! Run configuration for the unify pipeline.
//!
//! Loaded from a JSON file; every field has a default matching the standard
//! production run, so a missing or partial config is usable.

use serde::{Deserialize, Serialize};

use crate::window::DayWindow;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnifyConfig {
    /// Lookback window for symptom survey scores, days relative to anchor.
    pub symp_lookback_window: DayWindow,
    /// Lookback window for lab observations.
    pub lab_lookback_window: DayWindow,
    /// Lookback window for treatment-session features (non-treatment anchors).
    pub trt_lookback_window: DayWindow,
    /// Lookback for counting prior ED visits, in years.
    pub ed_visit_lookback_window: i64,
    /// Death label horizons, days after anchor. One label column per horizon.
    pub death_lookahead_window: Vec<i64>,
    /// ED-visit label horizons, days after anchor.
    pub ed_visit_lookahead_window: Vec<i64>,
    /// Symptom-deterioration label horizon, days after anchor.
    pub symp_lookahead_window: i64,
    /// Lab-toxicity label horizon, days after anchor.
    pub tox_lookahead_window: i64,
    /// Score increase that counts as symptom deterioration.
    pub symp_change_threshold: f64,
    /// Minimum patient age at the anchor date; younger patients are excluded.
    pub min_age: i32,
}

impl Default for UnifyConfig {
    fn default() -> Self {
        Self {
            symp_lookback_window: DayWindow::lookback(30),
            lab_lookback_window: DayWindow::lookback(7),
            trt_lookback_window: DayWindow::lookback(28),
            ed_visit_lookback_window: 5,
            death_lookahead_window: vec![30, 365],
            ed_visit_lookahead_window: vec![30],
            symp_lookahead_window: 30,
            tox_lookahead_window: 30,
            symp_change_threshold: 3.0,
            min_age: 18,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_run() {
        let config = UnifyConfig::default();
        assert_eq!(config.symp_lookback_window, DayWindow::lookback(30));
        assert_eq!(config.lab_lookback_window, DayWindow::lookback(7));
        assert_eq!(config.death_lookahead_window, vec![30, 365]);
        assert_eq!(config.ed_visit_lookback_window, 5);
        assert_eq!(config.min_age, 18);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: UnifyConfig =
            serde_json::from_str(r#"{"lab_lookback_window": [-14, 0], "tox_lookahead_window": 60}"#)
                .unwrap();
        assert_eq!(config.lab_lookback_window, DayWindow::new(-14, 0).unwrap());
        assert_eq!(config.tox_lookahead_window, 60);
        assert_eq!(config.symp_change_threshold, 3.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<UnifyConfig>(r#"{"symp_lookbck": [-30, 0]}"#).is_err());
    }
}
