//! Core data model for the clinical cohort feature builder.
//!
//! Defines the vocabulary shared by every crate in the workspace: errors,
//! day-offset windows, reduction policies, label values, run configuration,
//! the event-source catalog, and static clinical reference data.

pub mod config;
pub mod error;
pub mod label;
pub mod phi;
pub mod policy;
pub mod reference;
pub mod source;
pub mod window;

pub use config::UnifyConfig;
pub use error::{CohortError, Result};
pub use label::LabelValue;
pub use policy::{Aggregate, TieBreak};
pub use reference::{
    BaselineClip, CtcaeThreshold, DoseFormula, DrugReference, GradeDirection, LAB_COLS,
    SYMPTOM_COLS, ctcae_thresholds, normalize_drug_name,
};
pub use source::{EventSource, columns};
pub use window::DayWindow;
