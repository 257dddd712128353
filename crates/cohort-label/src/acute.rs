//! Emergency-department visit labels. Absence of an ED record is informative
//! up to the data-extraction date, so there is no censoring ambiguity: the
//! label is positive or negative, never unobserved.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use cohort_ingest::{date_series, label_series};
use cohort_model::LabelValue;
use cohort_transform::FeatureTable;
use polars::prelude::DataFrame;

use crate::spine::spine;

/// Append `target_ED_<h>d` for every horizon, plus `target_ED_date` with the
/// closest ED visit inside the widest horizon.
pub fn add_ed_visit_labels(
    df: &DataFrame,
    ed_visits: &FeatureTable,
    horizons: &[i64],
) -> Result<DataFrame> {
    let (mrns, anchors) = spine(df)?;
    let widest = horizons.iter().copied().max().unwrap_or(0);

    let mut next_visit: Vec<Option<NaiveDate>> = vec![None; df.height()];
    for (row, (mrn, anchor)) in mrns.iter().zip(&anchors).enumerate() {
        let range = ed_visits.window_after(mrn, *anchor, *anchor + Duration::days(widest));
        if !range.is_empty() {
            next_visit[row] = Some(ed_visits.dates()[range.start]);
        }
    }

    let mut out = df.clone();
    out.with_column(date_series("target_ED_date", &next_visit))?;
    for horizon in horizons {
        let codes: Vec<i8> = (0..df.height())
            .map(|row| {
                let cutoff = anchors[row] + Duration::days(*horizon);
                let visited = next_visit[row].is_some_and(|visit| visit <= cutoff);
                LabelValue::resolve(visited, true).as_code()
            })
            .collect();
        out.with_column(label_series(&format!("target_ED_{horizon}d"), &codes))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn ed_visits() -> FeatureTable {
        let events = df!(
            "mrn" => ["p1", "p1", "p2"],
            "event_date" => ["2024-01-01", "2024-01-20", "2024-03-15"],
        )
        .unwrap();
        FeatureTable::dates_only(&events, "emergency_room_visit", "event_date").unwrap()
    }

    fn table() -> DataFrame {
        df!(
            "mrn" => ["p1", "p2", "p3"],
            "assessment_date" => ["2024-01-01", "2024-01-01", "2024-01-01"],
        )
        .unwrap()
    }

    #[test]
    fn visit_inside_horizon_is_positive() {
        let out = add_ed_visit_labels(&table(), &ed_visits(), &[30]).unwrap();
        let labels = out.column("target_ED_30d").unwrap().i8().unwrap();
        assert_eq!(labels.get(0), Some(1));
    }

    #[test]
    fn same_day_visit_does_not_count() {
        // p1's 2024-01-01 visit is on the anchor itself; the matched visit
        // must be the later one
        let out = add_ed_visit_labels(&table(), &ed_visits(), &[30]).unwrap();
        let dates = out.column("target_ED_date").unwrap();
        assert_eq!(dates.null_count(), 1); // only p3 has no future visit
        let labels = out.column("target_ED_30d").unwrap().i8().unwrap();
        assert_eq!(labels.get(0), Some(1));
    }

    #[test]
    fn no_visit_is_negative_not_unobserved() {
        let out = add_ed_visit_labels(&table(), &ed_visits(), &[30]).unwrap();
        let labels = out.column("target_ED_30d").unwrap().i8().unwrap();
        assert_eq!(labels.get(2), Some(0));
    }

    #[test]
    fn horizons_share_the_widest_match() {
        let out = add_ed_visit_labels(&table(), &ed_visits(), &[30, 90]).unwrap();
        let short = out.column("target_ED_30d").unwrap().i8().unwrap();
        let long = out.column("target_ED_90d").unwrap().i8().unwrap();
        // p2's visit is 74 days out: outside 30, inside 90
        assert_eq!(short.get(1), Some(0));
        assert_eq!(long.get(1), Some(1));
    }
}
