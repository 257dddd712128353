//! CLI library components for the cohort feature builder.

pub mod logging;
