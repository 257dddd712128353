//! The concrete pipeline steps, thin adapters over the transform and label
//! crates. Feature steps run backward-looking derivations; label steps run
//! the forward-looking ones and come last so no label column ever feeds a
//! feature.

use anyhow::Result;
use cohort_label::{add_ctcae_labels, add_death_labels, add_ed_visit_labels, add_symptom_labels};
use cohort_model::{EventSource, LAB_COLS, SYMPTOM_COLS, columns};
use cohort_transform::{
    ClosestOptions, FeatureTable, add_change_since_prev, add_line_of_therapy,
    add_treatment_timing, add_visit_month_features, combine_demographics, combine_dose_intensity,
    combine_event_counts, combine_treatment, join_closest,
};
use polars::prelude::DataFrame;

use crate::context::PipelineContext;
use crate::pipeline::FeatureStep;

/// Carry treatment-session context onto non-treatment-aligned anchors.
pub struct TreatmentContextStep;

impl FeatureStep for TreatmentContextStep {
    fn name(&self) -> &'static str {
        "treatment-context"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        combine_treatment(
            &df,
            columns::ASSESSMENT_DATE,
            &ctx.treatment,
            ctx.config.trt_lookback_window,
        )
    }
}

/// Demographics join with eligibility exclusions and diagnosis encoding.
pub struct DemographicStep;

impl FeatureStep for DemographicStep {
    fn name(&self) -> &'static str {
        "demographics"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        combine_demographics(
            &df,
            columns::ASSESSMENT_DATE,
            &ctx.demographic,
            ctx.config.min_age,
        )
    }
}

/// Closest-to-anchor symptom survey scores inside the lookback window.
pub struct SymptomJoinStep;

impl FeatureStep for SymptomJoinStep {
    fn name(&self) -> &'static str {
        "symptom-scores"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        let feats = FeatureTable::from_frame(
            &ctx.symptom,
            EventSource::Symptom.file_stem(),
            EventSource::Symptom.date_column(),
        )?;
        let opts = ClosestOptions::new(ctx.config.symp_lookback_window);
        join_closest(&df, columns::ASSESSMENT_DATE, &feats, &opts)
    }
}

/// Closest-to-anchor lab observations inside the lookback window.
pub struct LabJoinStep;

impl FeatureStep for LabJoinStep {
    fn name(&self) -> &'static str {
        "lab-values"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        let feats = FeatureTable::from_frame(
            &ctx.lab,
            EventSource::Lab.file_stem(),
            EventSource::Lab.date_column(),
        )?;
        let opts = ClosestOptions::new(ctx.config.lab_lookback_window);
        join_closest(&df, columns::ASSESSMENT_DATE, &feats, &opts)
    }
}

/// Prior-ED-visit count and recency.
pub struct EdVisitCountStep;

impl FeatureStep for EdVisitCountStep {
    fn name(&self) -> &'static str {
        "ed-visit-history"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        let events = FeatureTable::dates_only(
            &ctx.ed_visits,
            EventSource::EdVisit.file_stem(),
            EventSource::EdVisit.date_column(),
        )?;
        combine_event_counts(
            &df,
            columns::ASSESSMENT_DATE,
            &events,
            "ED_visit",
            ctx.config.ed_visit_lookback_window,
        )
    }
}

/// Percent-of-ideal-dose columns; consumes the raw drug-dose columns.
pub struct DoseIntensityStep;

impl FeatureStep for DoseIntensityStep {
    fn name(&self) -> &'static str {
        "dose-intensity"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        combine_dose_intensity(&df, &ctx.drugs)
    }
}

/// Engineered features: calendar encoding, treatment recency, therapy line,
/// and change-since-previous-visit deltas.
pub struct EngineeredFeaturesStep {
    /// True when the anchors are the treatment sessions themselves, in which
    /// case "days since last treatment" means the previous session.
    pub anchored_on_treatment: bool,
}

impl FeatureStep for EngineeredFeaturesStep {
    fn name(&self) -> &'static str {
        "engineered-features"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        let df = add_visit_month_features(&df, columns::ASSESSMENT_DATE)?;
        let df = add_treatment_timing(
            &df,
            columns::ASSESSMENT_DATE,
            &ctx.treatment,
            self.anchored_on_treatment,
        )?;
        let df = add_line_of_therapy(&df, columns::ASSESSMENT_DATE, &ctx.treatment)?;
        let tracked: Vec<&str> = LAB_COLS.iter().chain(SYMPTOM_COLS).copied().collect();
        add_change_since_prev(&df, &tracked)
    }
}

/// Death-within-horizon labels.
pub struct DeathLabelStep;

impl FeatureStep for DeathLabelStep {
    fn name(&self) -> &'static str {
        "death-labels"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        add_death_labels(&df, &ctx.config.death_lookahead_window)
    }
}

/// ED-visit-within-horizon labels.
pub struct EdVisitLabelStep;

impl FeatureStep for EdVisitLabelStep {
    fn name(&self) -> &'static str {
        "ed-visit-labels"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        let events = FeatureTable::dates_only(
            &ctx.ed_visits,
            EventSource::EdVisit.file_stem(),
            EventSource::EdVisit.date_column(),
        )?;
        add_ed_visit_labels(&df, &events, &ctx.config.ed_visit_lookahead_window)
    }
}

/// Symptom-deterioration labels.
pub struct SymptomLabelStep;

impl FeatureStep for SymptomLabelStep {
    fn name(&self) -> &'static str {
        "symptom-labels"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        let surveys = FeatureTable::from_frame(
            &ctx.symptom,
            EventSource::Symptom.file_stem(),
            EventSource::Symptom.date_column(),
        )?;
        add_symptom_labels(
            &df,
            &surveys,
            ctx.config.symp_lookahead_window,
            ctx.config.symp_change_threshold,
        )
    }
}

/// CTCAE lab-toxicity labels.
pub struct ToxicityLabelStep;

impl FeatureStep for ToxicityLabelStep {
    fn name(&self) -> &'static str {
        "toxicity-labels"
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        let labs = FeatureTable::from_frame(
            &ctx.lab,
            EventSource::Lab.file_stem(),
            EventSource::Lab.date_column(),
        )?;
        add_ctcae_labels(&df, &labs, ctx.config.tox_lookahead_window)
    }
}
