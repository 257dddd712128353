//! Ordered step execution over the anchor frame.
//!
//! Each step widens (or, for the exclusion-bearing steps, filters) the frame
//! and hands it to the next. Steps are trait objects so alignment modes can
//! compose different pipelines from the same parts.

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::context::PipelineContext;

/// A single derivation applied to the evolving cohort table.
pub trait FeatureStep {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this step applies to the current run. Skipped steps are logged.
    fn should_skip(&self, _ctx: &PipelineContext) -> bool {
        false
    }

    fn apply(&self, df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame>;
}

/// An ordered pipeline of feature and label steps.
#[derive(Default)]
pub struct FeaturePipeline {
    steps: Vec<Box<dyn FeatureStep>>,
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(mut self, step: Box<dyn FeatureStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Run every step in order.
    pub fn execute(&self, mut df: DataFrame, ctx: &PipelineContext) -> Result<DataFrame> {
        for step in &self.steps {
            if step.should_skip(ctx) {
                debug!(step = step.name(), "skipped");
                continue;
            }
            let rows_in = df.height();
            df = step
                .apply(df, ctx)
                .with_context(|| format!("pipeline step {}", step.name()))?;
            info!(
                step = step.name(),
                rows_in,
                rows_out = df.height(),
                columns = df.width(),
                "completed step"
            );
        }
        Ok(df)
    }
}
