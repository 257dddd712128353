//! CTCAE lab-toxicity labels: does a lab value inside the lookahead window
//! cross a grade-2+ or grade-3+ threshold?
//!
//! Cytopenias (hemoglobin, neutrophil, platelet) grade on the window minimum
//! against absolute cutoffs. The rest grade on the window maximum against a
//! multiple of the baseline, clipped against the upper limit of normal.

use anyhow::Result;
use chrono::Duration;
use cohort_ingest::{f64_column, f64_series, label_series};
use cohort_model::{BaselineClip, GradeDirection, LabelValue, ctcae_thresholds};
use cohort_transform::FeatureTable;
use polars::prelude::DataFrame;

use crate::spine::spine;

/// Append, per tracked toxicity, the window-extreme lab value
/// (`target_<lab>_min` or `target_<lab>_max`) and the discrete labels
/// `target_<toxicity>_grade2plus` / `target_<toxicity>_grade3plus`.
pub fn add_ctcae_labels(df: &DataFrame, labs: &FeatureTable, horizon: i64) -> Result<DataFrame> {
    let (mrns, anchors) = spine(df)?;
    let mut out = df.clone();

    for toxicity in ctcae_thresholds() {
        let Some(column) = labs.column(toxicity.lab_column) else {
            continue;
        };

        let mut extreme: Vec<Option<f64>> = vec![None; df.height()];
        for (row, (mrn, anchor)) in mrns.iter().zip(&anchors).enumerate() {
            let range = labs.window_after(mrn, *anchor, *anchor + Duration::days(horizon));
            extreme[row] = range
                .filter_map(|idx| column.values().as_float(idx))
                .fold(None, |acc: Option<f64>, value| {
                    Some(match (acc, toxicity.direction) {
                        (None, _) => value,
                        (Some(acc), GradeDirection::Low) => acc.min(value),
                        (Some(acc), GradeDirection::High) => acc.max(value),
                    })
                });
        }

        // pre-anchor baseline only matters for the multiplier thresholds
        let baseline = if df.column(toxicity.lab_column).is_ok() {
            Some(f64_column(df, toxicity.lab_column)?)
        } else {
            None
        };

        for (grade, threshold) in [(2, toxicity.grade2plus), (3, toxicity.grade3plus)] {
            let codes: Vec<i8> = (0..df.height())
                .map(|row| {
                    let Some(value) = extreme[row] else {
                        return LabelValue::Unobserved.as_code();
                    };
                    let positive = match toxicity.direction {
                        GradeDirection::Low => value < threshold,
                        GradeDirection::High => {
                            let uln = toxicity.uln.unwrap_or(f64::NAN);
                            let observed = baseline.as_ref().and_then(|values| values[row]);
                            let base = match (observed, toxicity.baseline_clip) {
                                (Some(observed), Some(BaselineClip::AtLeastUln)) => {
                                    observed.max(uln)
                                }
                                (Some(observed), Some(BaselineClip::AtMostUln)) => {
                                    observed.min(uln)
                                }
                                _ => uln,
                            };
                            value > threshold * base
                        }
                    };
                    LabelValue::resolve(positive, true).as_code()
                })
                .collect();
            out.with_column(label_series(
                &format!("target_{}_grade{grade}plus", toxicity.name),
                &codes,
            ))?;
        }

        let suffix = match toxicity.direction {
            GradeDirection::Low => "min",
            GradeDirection::High => "max",
        };
        let value_col = format!("target_{}_{suffix}", toxicity.lab_column);
        if out.column(&value_col).is_err() {
            out.with_column(f64_series(&value_col, extreme))?;
        }
    }
    Ok(out)
}
