//! Orchestration of the cohort unify pipeline: input loading, censor-date
//! computation, and ordered execution of the feature and label steps.

pub mod censor;
pub mod context;
pub mod pipeline;
pub mod steps;
pub mod unify;

pub use censor::last_seen_table;
pub use context::{PipelineContext, load_config};
pub use pipeline::{FeaturePipeline, FeatureStep};
pub use unify::{Alignment, UnifyOptions, run_unify};
