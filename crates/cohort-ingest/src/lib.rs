//! Event-table ingestion: Parquet/CSV I/O, schema validation, and reference
//! data loading for the cohort feature builder.

pub mod error;
pub mod frame_utils;
pub mod reference;
pub mod schema;
pub mod store;

pub use error::{IngestError, Result};
pub use frame_utils::{
    date_column, date_from_epoch_days, date_series, days_from_epoch, f64_column, f64_series,
    is_date_dtype, is_numeric_dtype, key_column, label_series, str_column, str_series,
};
pub use reference::load_included_drugs;
pub use schema::{require_columns, validate_event_table};
pub use store::{read_csv, read_event_table, read_parquet, write_parquet};
