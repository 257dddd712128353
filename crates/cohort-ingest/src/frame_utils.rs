//! DataFrame column extraction helpers.
//!
//! The windowing engine works on plain vectors of dates and values rather
//! than on polars columns directly; these helpers bridge the two, tolerating
//! the dtype drift that shows up in real extracts (dates stored as strings,
//! integers where floats are expected).

use chrono::NaiveDate;
use polars::prelude::{DataFrame, DataType, NamedFrom, Series, TimeUnit};

use crate::error::{IngestError, Result};

const EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

/// Extract a column as dates, accepting Date, Datetime, or ISO-8601 strings.
pub fn date_column(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let series = df.column(name)?.as_materialized_series();
    match series.dtype() {
        DataType::Date => Ok(series.date()?.as_date_iter().collect()),
        DataType::Datetime(_, _) => {
            let casted = series.cast(&DataType::Date)?;
            Ok(casted.date()?.as_date_iter().collect())
        }
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_date))
            .collect()),
        DataType::Null => Ok(vec![None; series.len()]),
        other => Err(IngestError::schema(
            name,
            format!("expected a date-like column, found {other}"),
        )),
    }
}

/// Extract a column as f64 values. Non-numeric strings become nulls.
pub fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.as_materialized_series();
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.to_vec())
}

/// Extract a column as strings.
pub fn str_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series();
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// The patient key column, which must be string-typed and fully populated.
/// A null or non-string key is a malformed-key precondition failure.
pub fn key_column(df: &DataFrame, table: &str, name: &str) -> Result<Vec<String>> {
    let series = df.column(name)?.as_materialized_series();
    if !matches!(series.dtype(), DataType::String) {
        return Err(IngestError::schema(
            table,
            format!("key column {name} must be a string, found {}", series.dtype()),
        ));
    }
    let nulls = series.null_count();
    if nulls > 0 {
        return Err(IngestError::schema(
            table,
            format!("key column {name} has {nulls} null values"),
        ));
    }
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.unwrap_or_default().to_string())
        .collect())
}

/// Build a Date series from optional dates.
pub fn date_series(name: &str, dates: &[Option<NaiveDate>]) -> Series {
    let days: Vec<Option<i32>> = dates.iter().map(|date| date.map(days_from_epoch)).collect();
    let series = Series::new(name.into(), days);
    // Int32 -> Date is a reinterpreting cast and cannot fail
    series.cast(&DataType::Date).unwrap_or(series)
}

pub fn days_from_epoch(date: NaiveDate) -> i32 {
    (date - EPOCH).num_days() as i32
}

pub fn date_from_epoch_days(days: i32) -> NaiveDate {
    EPOCH + chrono::Duration::days(i64::from(days))
}

/// True for dtypes the feature arena treats as numeric payload.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean)
}

/// True for dtypes the feature arena treats as date payload.
pub fn is_date_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Date | DataType::Datetime(TimeUnit::Milliseconds | TimeUnit::Microseconds | TimeUnit::Nanoseconds, _)
    )
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    // keep only the date part of a timestamp; garbage (including non-ASCII
    // where the cut would split a character) parses to None, never panics
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Build a Series out of float values, preserving nulls.
pub fn f64_series(name: &str, values: Vec<Option<f64>>) -> Series {
    Series::new(name.into(), values)
}

/// Build a Series out of optional strings.
pub fn str_series(name: &str, values: Vec<Option<String>>) -> Series {
    Series::new(name.into(), values)
}

/// Build an Int8 label series from 1/0/-1 codes.
pub fn label_series(name: &str, codes: &[i8]) -> Series {
    let wide: Vec<i32> = codes.iter().map(|code| i32::from(*code)).collect();
    let series = Series::new(name.into(), wide);
    series.cast(&DataType::Int8).unwrap_or(series)
}
