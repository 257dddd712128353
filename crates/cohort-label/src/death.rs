//! Death-within-horizon labels, gated by the per-patient censor date.

use anyhow::Result;
use chrono::Duration;
use cohort_ingest::{date_column, label_series};
use cohort_model::{LabelValue, columns, phi::redact_value};
use polars::prelude::DataFrame;
use tracing::{trace, warn};

use crate::spine::spine;

/// Append `target_death_in_<h>d` for every horizon.
///
/// Positive when the recorded death falls in `(anchor, anchor + horizon]`.
/// Negative when the patient is known to be alive through the horizon, either
/// because the death date is later or because the censor date covers it.
/// Unobserved otherwise, including "ghost" patients whose last-seen date is
/// after their recorded death date.
pub fn add_death_labels(df: &DataFrame, horizons: &[i64]) -> Result<DataFrame> {
    let (mrns, anchors) = spine(df)?;
    let deaths = date_column(df, columns::DATE_OF_DEATH)?;
    let last_seen = date_column(df, columns::LAST_SEEN_DATE)?;

    let ghosts: Vec<bool> = deaths
        .iter()
        .zip(&last_seen)
        .map(|(death, seen)| matches!((death, seen), (Some(death), Some(seen)) if seen > death))
        .collect();
    let ghost_count = ghosts.iter().filter(|ghost| **ghost).count();
    if ghost_count > 0 {
        warn!(rows = ghost_count, "patients recorded as seen after death; labels unobserved");
        for (row, ghost) in ghosts.iter().enumerate() {
            if *ghost {
                trace!(patient = redact_value(&mrns[row]), "seen after recorded death");
            }
        }
    }

    let mut out = df.clone();
    for horizon in horizons {
        let codes: Vec<i8> = (0..df.height())
            .map(|row| {
                if ghosts[row] {
                    return LabelValue::Unobserved.as_code();
                }
                let anchor = anchors[row];
                let cutoff = anchor + Duration::days(*horizon);
                let label = match deaths[row] {
                    Some(death) if death > anchor && death <= cutoff => LabelValue::Positive,
                    // a later death date proves survival through the horizon
                    Some(death) if death > cutoff => LabelValue::Negative,
                    // anchored after the recorded death; nothing to predict
                    Some(_) => LabelValue::Unobserved,
                    None => {
                        let followed_up = last_seen[row].is_some_and(|seen| seen >= cutoff);
                        LabelValue::resolve(false, followed_up)
                    }
                };
                label.as_code()
            })
            .collect();
        out.with_column(label_series(&format!("target_death_in_{horizon}d"), &codes))?;
    }
    Ok(out)
}
