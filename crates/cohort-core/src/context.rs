//! Pipeline context: every table and reference the unify run needs, loaded
//! once up front so the steps themselves stay pure.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cohort_ingest::{load_included_drugs, read_event_table};
use cohort_model::{DrugReference, EventSource, UnifyConfig};
use polars::prelude::DataFrame;
use tracing::debug;

/// Loaded inputs for one unify run.
#[derive(Debug)]
pub struct PipelineContext {
    pub config: UnifyConfig,
    pub treatment: DataFrame,
    pub lab: DataFrame,
    pub symptom: DataFrame,
    pub ed_visits: DataFrame,
    /// Clinic visits are only needed for clinic-aligned runs.
    pub clinic: Option<DataFrame>,
    pub demographic: DataFrame,
    pub drugs: DrugReference,
}

impl PipelineContext {
    /// Load every event table from `<data_dir>/interim` and the drug
    /// allowlist from `<data_dir>/external`.
    pub fn load(data_dir: &Path, config: UnifyConfig) -> Result<Self> {
        let interim = data_dir.join("interim");
        let treatment = read_event_table(&interim, EventSource::Treatment)?;
        let lab = read_event_table(&interim, EventSource::Lab)?;
        let symptom = read_event_table(&interim, EventSource::Symptom)?;
        let ed_visits = read_event_table(&interim, EventSource::EdVisit)?;
        let demographic = read_event_table(&interim, EventSource::Demographic)?;

        let clinic_path = interim.join(format!("{}.parquet", EventSource::Clinic.file_stem()));
        let clinic = if clinic_path.exists() {
            Some(read_event_table(&interim, EventSource::Clinic)?)
        } else {
            debug!("no clinic table in {}; clinic alignment unavailable", interim.display());
            None
        };

        let drugs = load_included_drugs(&data_dir.join("external").join("included_drugs.csv"))?;

        Ok(Self {
            config,
            treatment,
            lab,
            symptom,
            ed_visits,
            clinic,
            demographic,
            drugs,
        })
    }
}

/// Read the run configuration from a JSON file; a missing path means the
/// defaults.
pub fn load_config(path: Option<&Path>) -> Result<UnifyConfig> {
    let Some(path) = path else {
        return Ok(UnifyConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_config_path_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.min_age, 18);
    }

    #[test]
    fn config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"min_age": 21, "tox_lookahead_window": 60}}"#).unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.min_age, 21);
        assert_eq!(config.tox_lookahead_window, 60);
        assert_eq!(config.symp_change_threshold, 3.0);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"min_age": "plenty"}}"#).unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }
}
