//! Invariants of the windowed join engine over generated inputs: joins are
//! left-outer and never create, destroy, or reorder anchor rows, and anchors
//! with no qualifying history come back with missing values.

use chrono::NaiveDate;
use cohort_model::{Aggregate, DayWindow};
use cohort_transform::{ClosestOptions, FeatureTable, SummaryOptions, join_closest, join_summary};
use polars::prelude::DataFrame;
use proptest::prelude::*;

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
}

fn frame(rows: &[(u8, i64, Option<f64>)], date_col: &str, value_col: &str) -> DataFrame {
    let mrns: Vec<Option<String>> = rows.iter().map(|(p, _, _)| Some(format!("p{p}"))).collect();
    let dates: Vec<Option<NaiveDate>> = rows.iter().map(|(_, d, _)| Some(day(*d))).collect();
    let values: Vec<Option<f64>> = rows.iter().map(|(_, _, v)| *v).collect();
    DataFrame::new(vec![
        cohort_ingest::str_series("mrn", mrns).into(),
        cohort_ingest::date_series(date_col, &dates).into(),
        cohort_ingest::f64_series(value_col, values).into(),
    ])
    .unwrap()
}

proptest! {
    #[test]
    fn closest_join_preserves_anchor_rows(
        anchor_rows in prop::collection::vec((0u8..4, 0i64..90, Just(None)), 1..40),
        feature_rows in prop::collection::vec(
            (0u8..4, 0i64..90, prop::option::of(-50.0f64..50.0)), 0..60
        ),
        lo in -30i64..0,
        span in 0i64..30,
    ) {
        let anchors = frame(&anchor_rows, "assessment_date", "anchor_payload");
        let feats = FeatureTable::from_frame(
            &frame(&feature_rows, "obs_date", "value"),
            "lab",
            "obs_date",
        ).unwrap();

        let window = DayWindow::new(lo, lo + span).unwrap();
        let out = join_closest(
            &anchors, "assessment_date", &feats,
            &ClosestOptions::new(window),
        ).unwrap();

        prop_assert_eq!(out.height(), anchors.height());
        // the original anchor columns survive untouched
        for name in anchors.get_column_names() {
            let before = anchors.column(name.as_str()).unwrap();
            let after = out.column(name.as_str()).unwrap();
            prop_assert!(before.as_materialized_series().equals_missing(
                after.as_materialized_series()
            ));
        }
    }

    #[test]
    fn summary_join_preserves_anchor_rows(
        anchor_rows in prop::collection::vec((0u8..4, 0i64..90, Just(None)), 1..40),
        feature_rows in prop::collection::vec(
            (0u8..4, 0i64..90, prop::option::of(-50.0f64..50.0)), 0..60
        ),
    ) {
        let anchors = frame(&anchor_rows, "assessment_date", "anchor_payload");
        let feats = FeatureTable::from_frame(
            &frame(&feature_rows, "obs_date", "value"),
            "lab",
            "obs_date",
        ).unwrap();

        let opts = SummaryOptions::new(
            DayWindow::lookback(30),
            vec![Aggregate::Last, Aggregate::Mean, Aggregate::Max, Aggregate::Count],
        );
        let out = join_summary(&anchors, "assessment_date", &feats, &opts).unwrap();
        prop_assert_eq!(out.height(), anchors.height());
    }

    #[test]
    fn patients_without_history_always_get_missing(
        anchor_days in prop::collection::vec(0i64..90, 1..20),
    ) {
        let anchor_rows: Vec<(u8, i64, Option<f64>)> =
            anchor_days.iter().map(|d| (9u8, *d, None)).collect();
        let anchors = frame(&anchor_rows, "assessment_date", "anchor_payload");
        // feature table only ever mentions patients p0-p3
        let feats = FeatureTable::from_frame(
            &frame(&[(0, 10, Some(1.0)), (1, 20, Some(2.0))], "obs_date", "value"),
            "lab",
            "obs_date",
        ).unwrap();

        let out = join_closest(
            &anchors, "assessment_date", &feats,
            &ClosestOptions::new(DayWindow::new(-90, 90).unwrap()),
        ).unwrap();
        prop_assert_eq!(out.column("value").unwrap().null_count(), out.height());
    }
}
