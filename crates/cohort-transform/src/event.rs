//! Occurrence-style event features: how many qualifying events a patient had
//! in the lookback period, and how recently the last one happened.
//!
//! Unlike the column-wise windowed join, only the event timestamps matter
//! here. The qualifying interval is `(anchor - lookback, anchor]`: an event on
//! the anchor day counts, an event exactly `lookback` days before does not.

use anyhow::Result;
use polars::prelude::{DataFrame, NamedFrom, Series};

use crate::partition::FeatureTable;
use crate::window_join::anchor_view;

const DAYS_PER_YEAR: i64 = 365;

/// Attach `num_prior_<name>s_within_<y>_years` and `days_since_prev_<name>`
/// to the anchor frame. Patients with no qualifying events get a zero count
/// and a missing recency value.
pub fn combine_event_counts(
    anchors: &DataFrame,
    anchor_date_col: &str,
    events: &FeatureTable,
    event_name: &str,
    lookback_years: i64,
) -> Result<DataFrame> {
    let (mrns, anchor_dates) = anchor_view(anchors, anchor_date_col)?;
    let height = anchors.height();
    let lookback_days = lookback_years * DAYS_PER_YEAR;

    let mut counts: Vec<i64> = vec![0; height];
    let mut days_since: Vec<Option<i64>> = vec![None; height];

    for (row, (mrn, anchor)) in mrns.iter().zip(&anchor_dates).enumerate() {
        let from = *anchor - chrono::Duration::days(lookback_days);
        let range = events.window_after(mrn, from, *anchor);
        if range.is_empty() {
            continue;
        }
        counts[row] = range.len() as i64;
        let most_recent = events.dates()[range.end - 1];
        days_since[row] = Some((*anchor - most_recent).num_days());
    }

    let count_name = format!("num_prior_{event_name}s_within_{lookback_years}_years");
    let recency_name = format!("days_since_prev_{event_name}");
    let mut out = anchors.clone();
    out.with_column(Series::new(count_name.as_str().into(), counts))?;
    out.with_column(Series::new(recency_name.as_str().into(), days_since))?;
    Ok(out)
}
