//! Event-table schema validation.
//!
//! Missing required columns or a malformed patient key are category (a)
//! failures: the run aborts rather than continuing with a silently wrong
//! join key.

use cohort_model::{EventSource, columns};
use polars::prelude::{DataFrame, DataType};

use crate::error::{IngestError, Result};

/// Require every named column to be present, reporting all gaps at once.
pub fn require_columns(df: &DataFrame, table: &str, required: &[&str]) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| df.column(name).is_err())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(IngestError::schema(
            table,
            format!("missing required columns: {}", missing.join(", ")),
        ))
    }
}

/// Validate an event table against its source contract: required columns
/// present, patient key string-typed and fully populated.
pub fn validate_event_table(df: &DataFrame, source: EventSource) -> Result<()> {
    let table = source.file_stem();
    require_columns(df, table, source.required_columns())?;

    let key = df.column(columns::MRN)?;
    if !matches!(key.dtype(), DataType::String) {
        return Err(IngestError::schema(
            table,
            format!("{} must be a string column, found {}", columns::MRN, key.dtype()),
        ));
    }
    let nulls = key.null_count();
    if nulls > 0 {
        return Err(IngestError::schema(
            table,
            format!("{} has {nulls} null values", columns::MRN),
        ));
    }
    Ok(())
}
