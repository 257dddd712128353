//! Symptom-deterioration labels: did any tracked survey score rise by the
//! clinical threshold within the lookahead window?

use anyhow::Result;
use chrono::Duration;
use cohort_ingest::{f64_column, f64_series, label_series};
use cohort_model::{LabelValue, SYMPTOM_COLS};
use cohort_transform::FeatureTable;
use polars::prelude::DataFrame;

use crate::spine::spine;

/// Append, per tracked symptom present in both the combined table and the
/// survey data, the window-maximum score `target_<symptom>_max` and the
/// discrete label `target_<symptom>_<pt>pt_change`.
///
/// The label is unobserved when either the baseline or the window maximum is
/// missing, and also when the baseline is already above `10 - threshold`: a
/// score capped at 10 cannot deteriorate by the threshold from there.
pub fn add_symptom_labels(
    df: &DataFrame,
    surveys: &FeatureTable,
    horizon: i64,
    threshold: f64,
) -> Result<DataFrame> {
    let (mrns, anchors) = spine(df)?;
    let mut out = df.clone();

    for symptom in SYMPTOM_COLS {
        if df.column(symptom).is_err() {
            continue;
        }
        let Some(column) = surveys.column(symptom) else {
            continue;
        };

        let mut window_max: Vec<Option<f64>> = vec![None; df.height()];
        for (row, (mrn, anchor)) in mrns.iter().zip(&anchors).enumerate() {
            let range = surveys.window_after(mrn, *anchor, *anchor + Duration::days(horizon));
            window_max[row] = range
                .filter_map(|idx| column.values().as_float(idx))
                .fold(None, |acc: Option<f64>, value| {
                    Some(acc.map_or(value, |acc| acc.max(value)))
                });
        }

        let baseline = f64_column(df, symptom)?;
        let codes: Vec<i8> = (0..df.height())
            .map(|row| {
                let label = match (baseline[row], window_max[row]) {
                    (Some(base), _) if base > 10.0 - threshold => LabelValue::Unobserved,
                    (Some(base), Some(max)) => {
                        LabelValue::resolve(max - base >= threshold, true)
                    }
                    _ => LabelValue::Unobserved,
                };
                label.as_code()
            })
            .collect();

        out.with_column(f64_series(&format!("target_{symptom}_max"), window_max))?;
        out.with_column(label_series(
            &format!("target_{symptom}_{threshold}pt_change"),
            &codes,
        ))?;
    }
    Ok(out)
}
