//! Columnar storage for event tables and the final dataset.
//!
//! Everything is persisted as zstd-compressed Parquet; a written table must
//! round-trip exactly (schema, column order, values) through a read-back.

use std::fs::File;
use std::path::Path;

use cohort_model::EventSource;
use polars::prelude::{
    CsvParseOptions, CsvReadOptions, DataFrame, ParquetCompression, ParquetReader, ParquetWriter,
    SerReader,
};
use tracing::info;

use crate::error::Result;
use crate::schema::validate_event_table;

pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)?;
    let df = ParquetReader::new(file).finish()?;
    Ok(df)
}

pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(None))
        .finish(df)?;
    Ok(())
}

/// Load one source extract from `<data_dir>/<stem>.parquet` and validate its
/// schema. Schema violations abort the run.
pub fn read_event_table(data_dir: &Path, source: EventSource) -> Result<DataFrame> {
    let path = data_dir.join(format!("{}.parquet", source.file_stem()));
    let df = read_parquet(&path)?;
    validate_event_table(&df, source)?;
    info!(
        source = source.file_stem(),
        rows = df.height(),
        columns = df.width(),
        "loaded event table"
    );
    Ok(df)
}

/// Read a CSV table, parsing date-like columns.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}
