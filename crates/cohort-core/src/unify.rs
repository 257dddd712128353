//! The unify run: build the anchor frame for the chosen alignment, execute
//! the feature and label steps, and hand back one row per anchor.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use cohort_ingest::{read_csv, read_parquet};
use cohort_model::columns;
use cohort_transform::{
    attach_last_seen, clinic_anchors, drop_duplicate_rows, keep_non_null, treatment_anchors,
    weekly_anchors, with_assessment_date,
};
use polars::prelude::DataFrame;
use tracing::info;

use crate::censor::last_seen_table;
use crate::context::PipelineContext;
use crate::pipeline::FeaturePipeline;
use crate::steps::{
    DeathLabelStep, DemographicStep, DoseIntensityStep, EdVisitCountStep, EdVisitLabelStep,
    EngineeredFeaturesStep, LabJoinStep, SymptomJoinStep, SymptomLabelStep, ToxicityLabelStep,
    TreatmentContextStep,
};

/// What the anchor rows are aligned on.
#[derive(Debug, Clone)]
pub enum Alignment {
    /// One anchor per treatment session.
    TreatmentDates,
    /// One anchor per clinic visit.
    ClinicVisits,
    /// Every Monday in the date range, for every patient in the registry.
    WeeklyMondays { start: NaiveDate, end: NaiveDate },
    /// Anchors read from an external parquet/CSV table.
    External(PathBuf),
}

/// Options for one unify run.
#[derive(Debug, Clone)]
pub struct UnifyOptions {
    pub alignment: Alignment,
    /// Anchor date column in the external/grid table. Ignored for treatment
    /// and clinic alignment, which have fixed date columns.
    pub date_column: String,
}

/// Run the whole pipeline and return the unified table, one row per
/// surviving anchor.
pub fn run_unify(ctx: &PipelineContext, options: &UnifyOptions) -> Result<DataFrame> {
    let (anchors, date_col) = build_anchors(ctx, options)?;

    let last_seen = last_seen_table(ctx)?;
    let anchors = attach_last_seen(&anchors, &last_seen)?;
    let anchors = with_assessment_date(&anchors, &date_col)?;

    let on_treatment = matches!(options.alignment, Alignment::TreatmentDates);
    let mut pipeline = FeaturePipeline::new();
    if !on_treatment {
        pipeline = pipeline.add_step(Box::new(TreatmentContextStep));
    }
    let pipeline = pipeline
        .add_step(Box::new(DemographicStep))
        .add_step(Box::new(SymptomJoinStep))
        .add_step(Box::new(LabJoinStep))
        .add_step(Box::new(EdVisitCountStep))
        .add_step(Box::new(DoseIntensityStep))
        .add_step(Box::new(EngineeredFeaturesStep {
            anchored_on_treatment: on_treatment,
        }))
        .add_step(Box::new(DeathLabelStep))
        .add_step(Box::new(EdVisitLabelStep))
        .add_step(Box::new(SymptomLabelStep))
        .add_step(Box::new(ToxicityLabelStep));

    let out = pipeline.execute(anchors, ctx)?;
    info!(rows = out.height(), columns = out.width(), "unify run complete");
    Ok(out)
}

/// Columns that would collide with the event tables' own date columns when
/// anchors are not the treatment sessions themselves.
const RESERVED_DATE_COLUMNS: [&str; 4] = [
    columns::SURVEY_DATE,
    columns::OBS_DATE,
    columns::EVENT_DATE,
    columns::TREATMENT_DATE,
];

fn build_anchors(
    ctx: &PipelineContext,
    options: &UnifyOptions,
) -> Result<(DataFrame, String)> {
    match &options.alignment {
        Alignment::TreatmentDates => {
            let anchors = treatment_anchors(&ctx.treatment)?;
            let anchors =
                keep_non_null(&anchors, columns::REGIMEN, "sessions with missing regimen")?;
            // course-level bookkeeping columns do not distinguish sessions
            let anchors =
                drop_duplicate_rows(&anchors, &[columns::FIRST_TREATMENT_DATE])?;
            Ok((anchors, columns::TREATMENT_DATE.to_string()))
        }
        Alignment::ClinicVisits => {
            let Some(clinic) = &ctx.clinic else {
                bail!("clinic alignment requested but no clinic table was loaded");
            };
            let anchors = clinic_anchors(clinic, &ctx.treatment)?;
            let anchors = drop_duplicate_rows(&anchors, &[])?;
            Ok((anchors, columns::CLINIC_DATE.to_string()))
        }
        Alignment::WeeklyMondays { start, end } => {
            validate_anchor_date_column(&options.date_column)?;
            let anchors =
                weekly_anchors(&ctx.demographic, *start, *end, &options.date_column)?;
            Ok((anchors, options.date_column.clone()))
        }
        Alignment::External(path) => {
            validate_anchor_date_column(&options.date_column)?;
            let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
            let anchors = match extension {
                "parquet" => read_parquet(path)?,
                "csv" => read_csv(path)?,
                other => bail!("unsupported anchor table format: .{other}"),
            };
            if anchors.column(&options.date_column).is_err() {
                bail!(
                    "anchor table {} has no {} column",
                    path.display(),
                    options.date_column
                );
            }
            let anchors = anchors
                .sort([columns::MRN, options.date_column.as_str()], Default::default())
                .context("sorting external anchors")?;
            Ok((anchors, options.date_column.clone()))
        }
    }
}

fn validate_anchor_date_column(date_column: &str) -> Result<()> {
    if RESERVED_DATE_COLUMNS.contains(&date_column) {
        bail!(
            "anchor date column {date_column} collides with an event table's date column; \
             pick a distinct name such as {}",
            columns::ASSESSMENT_DATE
        );
    }
    Ok(())
}
