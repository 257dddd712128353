//! Temporal record-linkage and feature-alignment engine.
//!
//! Everything here widens a patient-keyed anchor frame: windowed joins
//! against event tables, occurrence counting, source-specific combiners,
//! dose intensity, and engineered features. Anchor cardinality is preserved
//! by every operation; rows are only ever removed by the explicit exclusion
//! helpers.

pub mod anchor;
pub mod combine;
pub mod dose;
pub mod engineer;
pub mod event;
pub mod exclude;
pub mod partition;
pub mod window_join;

pub use anchor::{
    attach_last_seen, clinic_anchors, treatment_anchors, weekly_anchors, with_assessment_date,
};
pub use combine::{combine_demographics, combine_treatment};
pub use dose::combine_dose_intensity;
pub use engineer::{
    add_change_since_prev, add_line_of_therapy, add_treatment_timing, add_visit_month_features,
};
pub use event::combine_event_counts;
pub use exclude::{drop_duplicate_rows, filter_report, keep_non_null};
pub use partition::{ColumnValues, FeatureColumn, FeatureTable, ensure_patient_keyed};
pub use window_join::{ClosestOptions, SummaryOptions, join_closest, join_summary};
