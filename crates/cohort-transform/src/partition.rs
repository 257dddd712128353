//! Per-patient, timestamp-sorted feature arena.
//!
//! Every windowed computation partitions its feature table by patient key
//! before doing anything else: the rows are re-ordered once into contiguous
//! per-patient spans sorted by event date, and each window query is then a
//! pair of binary searches inside one span. This keeps the hot path at
//! O(anchors x log rows) regardless of total table size.

use std::collections::HashMap;
use std::ops::Range;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use cohort_ingest::{date_column, f64_column, is_date_dtype, is_numeric_dtype, key_column, str_column};
use cohort_model::columns;
use polars::prelude::{DataFrame, DataType};
use tracing::{debug, warn};

/// Payload values of one feature column, re-ordered into arena order.
#[derive(Debug, Clone)]
pub enum ColumnValues {
    Float(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Float(values) => values.len(),
            Self::Str(values) => values.len(),
            Self::Date(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, idx: usize) -> bool {
        match self {
            Self::Float(values) => values[idx].is_none(),
            Self::Str(values) => values[idx].is_none(),
            Self::Date(values) => values[idx].is_none(),
        }
    }

    pub fn as_float(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Float(values) => values[idx],
            _ => None,
        }
    }
}

/// One payload column of a [`FeatureTable`].
#[derive(Debug, Clone)]
pub struct FeatureColumn {
    name: String,
    values: ColumnValues,
}

impl FeatureColumn {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.values, ColumnValues::Float(_))
    }
}

/// A patient-partitioned, date-sorted view over one event table.
///
/// Construction drops rows with a missing event timestamp (a data-quality
/// exclusion, reported via the log); a null patient key is a fatal schema
/// violation surfaced by the key extraction.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    table: String,
    date_column: String,
    spans: HashMap<String, Range<usize>>,
    dates: Vec<NaiveDate>,
    columns: Vec<FeatureColumn>,
}

impl FeatureTable {
    /// Build the arena over every usable payload column of `df` (everything
    /// except the key and timestamp; unsupported dtypes are skipped).
    pub fn from_frame(df: &DataFrame, table: &str, date_col: &str) -> Result<Self> {
        let payload: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .filter(|name| name != columns::MRN && name != date_col)
            .collect();
        let payload_refs: Vec<&str> = payload.iter().map(String::as_str).collect();
        Self::from_frame_selecting(df, table, date_col, &payload_refs)
    }

    /// Build the arena over an explicit set of payload columns.
    pub fn from_frame_selecting(
        df: &DataFrame,
        table: &str,
        date_col: &str,
        payload: &[&str],
    ) -> Result<Self> {
        let mrns = key_column(df, table, columns::MRN)
            .with_context(|| format!("building feature arena for {table}"))?;
        let raw_dates = date_column(df, date_col)
            .with_context(|| format!("building feature arena for {table}"))?;

        // order rows by (patient, date); rows without a timestamp are dropped
        let mut order: Vec<usize> = (0..df.height())
            .filter(|idx| raw_dates[*idx].is_some())
            .collect();
        let dropped = df.height() - order.len();
        if dropped > 0 {
            warn!(table, rows = dropped, "dropping rows with missing {}", date_col);
        }
        order.sort_by(|a, b| {
            (&mrns[*a], raw_dates[*a]).cmp(&(&mrns[*b], raw_dates[*b]))
        });

        let dates: Vec<NaiveDate> = order.iter().map(|idx| raw_dates[*idx].unwrap()).collect();

        let mut spans: HashMap<String, Range<usize>> = HashMap::new();
        let mut start = 0;
        for end in 1..=order.len() {
            let at_boundary = end == order.len() || mrns[order[end]] != mrns[order[start]];
            if at_boundary {
                spans.insert(mrns[order[start]].clone(), start..end);
                start = end;
            }
        }

        let mut feature_columns = Vec::with_capacity(payload.len());
        for name in payload {
            let dtype = df
                .column(name)
                .with_context(|| format!("{table}: missing payload column {name}"))?
                .dtype()
                .clone();
            let values = if is_numeric_dtype(&dtype) {
                let raw = f64_column(df, name)?;
                ColumnValues::Float(order.iter().map(|idx| raw[*idx]).collect())
            } else if is_date_dtype(&dtype) {
                let raw = date_column(df, name)?;
                ColumnValues::Date(order.iter().map(|idx| raw[*idx]).collect())
            } else if matches!(dtype, DataType::String) {
                let raw = str_column(df, name)?;
                ColumnValues::Str(order.iter().map(|idx| raw[*idx].clone()).collect())
            } else {
                debug!(table, column = *name, dtype = %dtype, "skipping unsupported payload dtype");
                continue;
            };
            feature_columns.push(FeatureColumn {
                name: (*name).to_string(),
                values,
            });
        }

        Ok(Self {
            table: table.to_string(),
            date_column: date_col.to_string(),
            spans,
            dates,
            columns: feature_columns,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn date_column_name(&self) -> &str {
        &self.date_column
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn patients(&self) -> impl Iterator<Item = &str> {
        self.spans.keys().map(String::as_str)
    }

    /// Dates in arena order; index with a range returned by a window query.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Arena indices of the patient's rows with date in `[from, until]`.
    /// An unknown patient yields an empty range, never an error.
    pub fn window(&self, mrn: &str, from: NaiveDate, until: NaiveDate) -> Range<usize> {
        let Some(span) = self.spans.get(mrn) else {
            return 0..0;
        };
        let dates = &self.dates[span.clone()];
        let lo = span.start + dates.partition_point(|date| *date < from);
        let hi = span.start + dates.partition_point(|date| *date <= until);
        lo..hi
    }

    /// Arena indices with date in `(after, until]` (exclusive lower bound).
    pub fn window_after(&self, mrn: &str, after: NaiveDate, until: NaiveDate) -> Range<usize> {
        let Some(span) = self.spans.get(mrn) else {
            return 0..0;
        };
        let dates = &self.dates[span.clone()];
        let lo = span.start + dates.partition_point(|date| *date <= after);
        let hi = span.start + dates.partition_point(|date| *date <= until);
        lo..hi
    }

    /// Earliest event date on or before `until`.
    pub fn first_date_on_or_before(&self, mrn: &str, until: NaiveDate) -> Option<NaiveDate> {
        let span = self.spans.get(mrn)?;
        let first = self.dates[span.clone()].first().copied()?;
        (first <= until).then_some(first)
    }

    /// Most recent event date on or before `until`.
    pub fn last_date_on_or_before(&self, mrn: &str, until: NaiveDate) -> Option<NaiveDate> {
        let span = self.spans.get(mrn)?;
        let dates = &self.dates[span.clone()];
        let idx = dates.partition_point(|date| *date <= until);
        (idx > 0).then(|| dates[idx - 1])
    }

    /// Most recent event date for the patient, if any.
    pub fn last_date(&self, mrn: &str) -> Option<NaiveDate> {
        let span = self.spans.get(mrn)?;
        self.dates[span.clone()].last().copied()
    }

    /// Column lookup by name.
    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// A payload-free arena over event timestamps only (for occurrence
    /// counting, where no column values are needed).
    pub fn dates_only(df: &DataFrame, table: &str, date_col: &str) -> Result<Self> {
        Self::from_frame_selecting(df, table, date_col, &[])
    }
}

/// Fail fast when the frame is not patient-keyed at all: callers treat this
/// differently from an empty-but-valid table.
pub fn ensure_patient_keyed(df: &DataFrame, table: &str) -> Result<()> {
    if df.column(columns::MRN).is_err() {
        bail!("schema violation in {table}: missing {} column", columns::MRN);
    }
    Ok(())
}
