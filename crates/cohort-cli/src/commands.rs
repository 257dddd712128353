use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use cohort_core::{Alignment, PipelineContext, UnifyOptions, load_config, run_unify};
use cohort_ingest::write_parquet;
use cohort_model::{EventSource, columns};
use comfy_table::Table;
use polars::prelude::DataFrame;
use tracing::{info, info_span};

use crate::cli::UnifyArgs;
use crate::summary::apply_table_style;
use crate::types::RunResult;

pub fn run_sources() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Source", "Date column", "Required columns", "Contents"]);
    apply_table_style(&mut table);
    for source in EventSource::ALL {
        table.add_row(vec![
            source.file_stem().to_string(),
            source.date_column().to_string(),
            source.required_columns().join(", "),
            source.describe().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_unify_command(args: &UnifyArgs) -> Result<RunResult> {
    let span = info_span!("unify", data_dir = %args.data_dir.display());
    let _guard = span.enter();
    let started = Instant::now();

    let config = load_config(args.config.as_deref())?;
    let ctx = PipelineContext::load(&args.data_dir, config).context("loading event tables")?;

    let options = UnifyOptions {
        alignment: parse_alignment(args)?,
        date_column: args.date_column.clone(),
    };
    let mut unified = run_unify(&ctx, &options)?;

    let output = args.output.clone().unwrap_or_else(|| {
        args.data_dir.join("processed").join("unified.parquet")
    });
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let rows = unified.height();
    let width = unified.width();
    let patients = unique_patients(&unified)?;
    let label_columns = unified
        .get_column_names()
        .iter()
        .filter(|name| name.starts_with("target_"))
        .count();
    write_parquet(&mut unified, &output).context("writing unified table")?;
    info!(path = %output.display(), rows, "wrote unified table");

    Ok(RunResult {
        output,
        rows,
        columns: width,
        patients,
        label_columns,
        duration: started.elapsed(),
    })
}

fn parse_alignment(args: &UnifyArgs) -> Result<Alignment> {
    match args.align_on.as_str() {
        "treatment-dates" => Ok(Alignment::TreatmentDates),
        "clinic-visits" => Ok(Alignment::ClinicVisits),
        "weekly-mondays" => {
            let (Some(start), Some(end)) = (args.start, args.end) else {
                bail!("weekly-mondays alignment requires --start and --end");
            };
            if end < start {
                bail!("--end {end} is before --start {start}");
            }
            Ok(Alignment::WeeklyMondays { start, end })
        }
        path if path.ends_with(".parquet") || path.ends_with(".csv") => {
            Ok(Alignment::External(PathBuf::from(path)))
        }
        other => bail!(
            "unknown alignment {other}; expected treatment-dates, clinic-visits, \
             weekly-mondays, or a path to a parquet/CSV anchor table"
        ),
    }
}

fn unique_patients(df: &DataFrame) -> Result<usize> {
    let mrn = df.column(columns::MRN)?.str()?;
    let seen: HashSet<&str> = mrn.iter().flatten().collect();
    Ok(seen.len())
}
