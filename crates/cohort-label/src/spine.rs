//! Shared anchor-spine extraction for the label derivations.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use cohort_ingest::{date_column, key_column};
use cohort_model::columns;
use polars::prelude::DataFrame;

/// Patient keys and assessment dates of the combined table. Label derivation
/// runs after anchor construction, so a missing assessment date here is a
/// schema violation, not a data-quality gap.
pub(crate) fn spine(df: &DataFrame) -> Result<(Vec<String>, Vec<NaiveDate>)> {
    let mrns = key_column(df, "combined table", columns::MRN)?;
    let raw = date_column(df, columns::ASSESSMENT_DATE)?;
    let mut dates = Vec::with_capacity(raw.len());
    for (row, date) in raw.into_iter().enumerate() {
        match date {
            Some(date) => dates.push(date),
            None => bail!("combined table: null {} at row {row}", columns::ASSESSMENT_DATE),
        }
    }
    Ok((mrns, dates))
}
