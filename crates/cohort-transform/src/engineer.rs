//! Engineered features derived from already-combined columns: therapy-line
//! ordinals, treatment recency, cyclical calendar encoding, and
//! change-since-previous-visit deltas.
//!
//! These all assume the combined table is sorted by (patient, anchor date),
//! which the anchor builders guarantee.

use std::f64::consts::PI;

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use cohort_ingest::{date_column, f64_column, f64_series, key_column};
use cohort_model::columns;
use polars::prelude::{DataFrame, NamedFrom, Series};

use crate::partition::{ColumnValues, FeatureTable};

/// Cyclical month-of-year encoding of the anchor date; December and January
/// end up adjacent instead of eleven ordinal steps apart.
pub fn add_visit_month_features(df: &DataFrame, date_col: &str) -> Result<DataFrame> {
    let dates = date_column(df, date_col)?;
    let angles: Vec<Option<f64>> = dates
        .iter()
        .map(|date| date.map(|date| 2.0 * PI * f64::from(date.month() - 1) / 12.0))
        .collect();
    let sin: Vec<Option<f64>> = angles.iter().map(|angle| angle.map(f64::sin)).collect();
    let cos: Vec<Option<f64>> = angles.iter().map(|angle| angle.map(f64::cos)).collect();
    let mut out = df.clone();
    out.with_column(f64_series("visit_month_sin", sin))?;
    out.with_column(f64_series("visit_month_cos", cos))?;
    Ok(out)
}

/// Days since the start of treatment and since the most recent session. The
/// start is the patient's earliest session on or before the anchor, derived
/// from the session history itself. When anchors are the sessions, "most
/// recent" means the previous session, not the anchor's own.
pub fn add_treatment_timing(
    df: &DataFrame,
    anchor_date_col: &str,
    treatment: &DataFrame,
    anchored_on_treatment: bool,
) -> Result<DataFrame> {
    let anchors = date_column(df, anchor_date_col)?;
    let sessions = date_column(df, columns::TREATMENT_DATE)?;
    let mrns = key_column(df, "combined table", columns::MRN)?;
    let history = FeatureTable::dates_only(treatment, "treatment", columns::TREATMENT_DATE)?;

    let since_start: Vec<Option<i64>> = mrns
        .iter()
        .zip(&anchors)
        .map(|(mrn, anchor)| {
            let anchor = (*anchor)?;
            history
                .first_date_on_or_before(mrn, anchor)
                .map(|start| (anchor - start).num_days())
        })
        .collect();

    let mut since_last: Vec<Option<i64>> = vec![None; df.height()];
    for row in 0..df.height() {
        let Some(anchor) = anchors[row] else { continue };
        let reference = if anchored_on_treatment {
            // previous session of the same patient
            (row > 0 && mrns[row - 1] == mrns[row])
                .then(|| sessions[row - 1])
                .flatten()
        } else {
            sessions[row]
        };
        since_last[row] = reference.map(|reference| (anchor - reference).num_days());
    }

    let mut out = df.clone();
    out.with_column(Series::new("days_since_starting_treatment".into(), since_start))?;
    out.with_column(Series::new("days_since_last_treatment".into(), since_last))?;
    Ok(out)
}

/// Ordinal therapy line at each anchor: the number of regimen switches in the
/// patient's session history up to the anchor, starting from 1. Missing when
/// the patient has no session on or before the anchor.
pub fn add_line_of_therapy(
    df: &DataFrame,
    anchor_date_col: &str,
    treatment: &DataFrame,
) -> Result<DataFrame> {
    let feats = FeatureTable::from_frame_selecting(
        treatment,
        "treatment",
        columns::TREATMENT_DATE,
        &[columns::REGIMEN],
    )?;
    let Some(regimen_column) = feats.column(columns::REGIMEN) else {
        anyhow::bail!("treatment table has no {} column", columns::REGIMEN);
    };
    let ColumnValues::Str(regimens) = regimen_column.values() else {
        anyhow::bail!("treatment {} column is not string-typed", columns::REGIMEN);
    };

    // precompute the line number at every session, per patient
    let mut line_at: Vec<Option<i64>> = vec![None; feats.len()];
    let patients: Vec<String> = feats.patients().map(str::to_string).collect();
    for mrn in &patients {
        let span = feats.window(mrn, NaiveDate::MIN, NaiveDate::MAX);
        let mut line = 0i64;
        let mut current: Option<String> = None;
        for idx in span {
            if let Some(regimen) = regimens[idx].as_deref() {
                if current.as_deref() != Some(regimen) {
                    line += 1;
                    current = Some(regimen.to_string());
                }
            }
            line_at[idx] = (line > 0).then_some(line);
        }
    }

    let mrns = key_column(df, "combined table", columns::MRN)?;
    let anchors = date_column(df, anchor_date_col)?;
    let lines: Vec<Option<i64>> = mrns
        .iter()
        .zip(&anchors)
        .map(|(mrn, anchor)| {
            let anchor = (*anchor)?;
            let range = feats.window(mrn, NaiveDate::MIN, anchor);
            if range.is_empty() {
                None
            } else {
                line_at[range.end - 1]
            }
        })
        .collect();

    let mut out = df.clone();
    out.with_column(Series::new("line_of_therapy".into(), lines))?;
    Ok(out)
}

/// Per-patient deltas against the previous anchor row, one `<col>_change`
/// column per tracked measurement column present in the table.
pub fn add_change_since_prev(df: &DataFrame, tracked: &[&str]) -> Result<DataFrame> {
    let mrns = key_column(df, "combined table", columns::MRN)?;
    let mut out = df.clone();
    for name in tracked {
        if df.column(name).is_err() {
            continue;
        }
        let values = f64_column(df, name)?;
        let deltas: Vec<Option<f64>> = (0..df.height())
            .map(|row| {
                if row == 0 || mrns[row - 1] != mrns[row] {
                    return None;
                }
                match (values[row], values[row - 1]) {
                    (Some(current), Some(previous)) => Some(current - previous),
                    _ => None,
                }
            })
            .collect();
        out.with_column(f64_series(&format!("{name}_change"), deltas))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn line_of_therapy_counts_regimen_switches() {
        let treatment = df!(
            "mrn" => ["p1", "p1", "p1", "p1", "p1"],
            "treatment_date" => ["2024-01-01", "2024-01-08", "2024-02-01", "2024-02-08", "2024-03-01"],
            "regimen" => ["A", "A", "B", "B", "A"],
        )
        .unwrap();
        let anchors = df!(
            "mrn" => ["p1", "p1", "p1", "p1", "p1"],
            "assessment_date" => ["2024-01-01", "2024-01-08", "2024-02-01", "2024-02-08", "2024-03-01"],
        )
        .unwrap();
        let out = add_line_of_therapy(&anchors, "assessment_date", &treatment).unwrap();
        let lines = out.column("line_of_therapy").unwrap().i64().unwrap();
        let got: Vec<Option<i64>> = lines.into_iter().collect();
        // returning to a previous regimen counts as a new line
        assert_eq!(got, vec![Some(1), Some(1), Some(2), Some(2), Some(3)]);
    }

    #[test]
    fn line_of_therapy_is_missing_before_any_treatment() {
        let treatment = df!(
            "mrn" => ["p1"],
            "treatment_date" => ["2024-06-01"],
            "regimen" => ["A"],
        )
        .unwrap();
        let anchors = df!(
            "mrn" => ["p1"],
            "assessment_date" => ["2024-01-01"],
        )
        .unwrap();
        let out = add_line_of_therapy(&anchors, "assessment_date", &treatment).unwrap();
        assert_eq!(out.column("line_of_therapy").unwrap().null_count(), 1);
    }

    #[test]
    fn cyclical_month_encoding_wraps_smoothly() {
        let df = df!(
            "mrn" => ["p1", "p2"],
            "assessment_date" => ["2024-01-15", "2024-07-15"],
        )
        .unwrap();
        let out = add_visit_month_features(&df, "assessment_date").unwrap();
        let sin = out.column("visit_month_sin").unwrap().f64().unwrap();
        let cos = out.column("visit_month_cos").unwrap().f64().unwrap();
        // january maps to angle zero
        assert!((sin.get(0).unwrap()).abs() < 1e-12);
        assert!((cos.get(0).unwrap() - 1.0).abs() < 1e-12);
        // july is the opposite side of the circle
        assert!((cos.get(1).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn treatment_timing_uses_previous_session_when_anchored_on_sessions() {
        let treatment = df!(
            "mrn" => ["p1", "p1", "p2"],
            "treatment_date" => ["2024-01-01", "2024-01-15", "2024-01-20"],
        )
        .unwrap();
        // sessions only; no precomputed course-start column anywhere
        let df = df!(
            "mrn" => ["p1", "p1", "p2"],
            "assessment_date" => ["2024-01-01", "2024-01-15", "2024-01-20"],
            "treatment_date" => ["2024-01-01", "2024-01-15", "2024-01-20"],
        )
        .unwrap();
        let out = add_treatment_timing(&df, "assessment_date", &treatment, true).unwrap();
        let since_start = out.column("days_since_starting_treatment").unwrap().i64().unwrap();
        let since_last = out.column("days_since_last_treatment").unwrap().i64().unwrap();
        assert_eq!(since_start.get(0), Some(0));
        assert_eq!(since_start.get(1), Some(14));
        assert_eq!(since_last.get(0), None);
        assert_eq!(since_last.get(1), Some(14));
        // patient boundary resets the shift
        assert_eq!(since_last.get(2), None);
    }

    #[test]
    fn treatment_start_is_missing_before_the_first_session() {
        let treatment = df!(
            "mrn" => ["p1"],
            "treatment_date" => ["2024-02-01"],
        )
        .unwrap();
        let df = df!(
            "mrn" => ["p1", "p1"],
            "assessment_date" => ["2024-01-08", "2024-02-05"],
            "treatment_date" => [None::<&str>, Some("2024-02-01")],
        )
        .unwrap();
        let out = add_treatment_timing(&df, "assessment_date", &treatment, false).unwrap();
        let since_start = out.column("days_since_starting_treatment").unwrap().i64().unwrap();
        let since_last = out.column("days_since_last_treatment").unwrap().i64().unwrap();
        assert_eq!(since_start.get(0), None);
        assert_eq!(since_start.get(1), Some(4));
        assert_eq!(since_last.get(1), Some(4));
    }

    #[test]
    fn change_since_prev_is_per_patient() {
        let df = df!(
            "mrn" => ["p1", "p1", "p2"],
            "pain" => [Some(2.0), Some(5.0), Some(7.0)],
            "nausea" => [None, Some(3.0), Some(1.0)],
        )
        .unwrap();
        let out = add_change_since_prev(&df, &["pain", "nausea", "absent"]).unwrap();
        let pain = out.column("pain_change").unwrap().f64().unwrap();
        assert_eq!(pain.get(0), None);
        assert_eq!(pain.get(1), Some(3.0));
        assert_eq!(pain.get(2), None);
        // missing previous reading yields a missing delta
        assert_eq!(out.column("nausea_change").unwrap().f64().unwrap().get(1), None);
        assert!(out.column("absent_change").is_err());
    }
}
