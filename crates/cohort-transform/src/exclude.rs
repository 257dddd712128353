//! Data-quality exclusions. Each exclusion keeps going with a reduced table
//! and reports how many patients and rows were discarded; only schema
//! violations abort the run.

use std::collections::HashSet;

use anyhow::{Context, Result, ensure};
use cohort_ingest::{key_column, str_column};
use cohort_model::{columns, phi::redact_value};
use polars::prelude::{BooleanChunked, DataFrame, DataType, NewChunkedArray};
use tracing::{info, trace};

/// Keep the rows where `keep` is true, logging the number of rows and whole
/// patients removed.
pub fn filter_report(df: &DataFrame, keep: &[bool], context: &str) -> Result<DataFrame> {
    ensure!(
        keep.len() == df.height(),
        "exclusion mask length {} does not match table height {}",
        keep.len(),
        df.height()
    );
    let mrns = key_column(df, context, columns::MRN)?;
    let patients_before: HashSet<&str> = mrns.iter().map(String::as_str).collect();
    let kept_patients: HashSet<&str> = mrns
        .iter()
        .zip(keep)
        .filter(|(_, keep)| **keep)
        .map(|(mrn, _)| mrn.as_str())
        .collect();

    let mask = BooleanChunked::from_slice("keep".into(), keep);
    let filtered = df.filter(&mask).context("applying exclusion mask")?;

    let rows_removed = df.height() - filtered.height();
    let patients_removed = patients_before.len() - kept_patients.len();
    if rows_removed > 0 {
        info!(
            rows = rows_removed,
            patients = patients_removed,
            "excluded {context}"
        );
        for mrn in patients_before.difference(&kept_patients) {
            trace!(patient = redact_value(mrn), "patient excluded: {context}");
        }
    }
    Ok(filtered)
}

/// Keep only rows where `column` is populated.
pub fn keep_non_null(df: &DataFrame, column: &str, context: &str) -> Result<DataFrame> {
    let series = df.column(column)?.as_materialized_series();
    let keep: Vec<bool> = series.is_not_null().into_iter().map(|flag| flag.unwrap_or(false)).collect();
    filter_report(df, &keep, context)
}

/// Remove duplicate rows, comparing every column except the ignored ones.
/// The first occurrence wins.
pub fn drop_duplicate_rows(df: &DataFrame, ignore: &[&str]) -> Result<DataFrame> {
    let compare: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| !ignore.contains(&name.as_str()))
        .collect();

    // render each compared column as strings once, then hash composite keys
    let mut rendered: Vec<Vec<Option<String>>> = Vec::with_capacity(compare.len());
    for name in &compare {
        let series = df.column(name)?.as_materialized_series();
        let casted = series
            .cast(&DataType::String)
            .with_context(|| format!("rendering column {name} for duplicate detection"))?;
        rendered.push(str_column(&DataFrame::new(vec![casted.into()])?, name)?);
    }

    let mut seen: HashSet<String> = HashSet::with_capacity(df.height());
    let mut keep = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let mut key = String::new();
        for column in &rendered {
            match &column[row] {
                Some(value) => key.push_str(value),
                None => key.push('\u{0}'),
            }
            key.push('\u{1f}');
        }
        keep.push(seen.insert(key));
    }
    filter_report(df, &keep, "duplicate rows")
}
