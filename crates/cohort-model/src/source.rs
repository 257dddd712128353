//! Catalog of the event tables consumed by the pipeline.
//!
//! Each source-specific preprocessor produces a patient-keyed, timestamped
//! table persisted as `<file_stem>.parquet`. This module names those tables,
//! their timestamp columns, and the columns a table must carry to be usable.

use serde::{Deserialize, Serialize};

/// Well-known column names shared across event tables.
pub mod columns {
    pub const MRN: &str = "mrn";
    pub const ASSESSMENT_DATE: &str = "assessment_date";
    pub const TREATMENT_DATE: &str = "treatment_date";
    pub const FIRST_TREATMENT_DATE: &str = "first_treatment_date";
    pub const OBS_DATE: &str = "obs_date";
    pub const SURVEY_DATE: &str = "survey_date";
    pub const EVENT_DATE: &str = "event_date";
    pub const CLINIC_DATE: &str = "clinic_date";
    pub const DATE_OF_BIRTH: &str = "date_of_birth";
    pub const DATE_OF_DEATH: &str = "date_of_death";
    pub const LAST_CONTACT_DATE: &str = "last_contact_date";
    pub const LAST_SEEN_DATE: &str = "last_seen_date";
    pub const REGIMEN: &str = "regimen";
    pub const INTENT: &str = "intent";
    pub const FEMALE: &str = "female";
    pub const AGE: &str = "age";
    pub const WEIGHT: &str = "weight";
    pub const BODY_SURFACE_AREA: &str = "body_surface_area";
    pub const CREATININE: &str = "creatinine";

    /// Prefix of per-drug administered dose columns (`drug_<NAME>_given_dose`).
    pub const DRUG_PREFIX: &str = "drug_";
    pub const GIVEN_DOSE_SUFFIX: &str = "_given_dose";
    pub const REGIMEN_DOSE_SUFFIX: &str = "_regimen_dose";
}

/// One of the heterogeneous EHR extracts feeding the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Treatment,
    Lab,
    Symptom,
    EdVisit,
    Clinic,
    Demographic,
}

impl EventSource {
    pub const ALL: [EventSource; 6] = [
        Self::Treatment,
        Self::Lab,
        Self::Symptom,
        Self::EdVisit,
        Self::Clinic,
        Self::Demographic,
    ];

    /// File stem of the persisted extract (`<stem>.parquet`).
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Treatment => "treatment",
            Self::Lab => "lab",
            Self::Symptom => "symptom",
            Self::EdVisit => "emergency_room_visit",
            Self::Clinic => "clinic",
            Self::Demographic => "demographic",
        }
    }

    /// The event timestamp column of this source. For demographics this is the
    /// last-contact date, used only for censor-date computation.
    pub fn date_column(&self) -> &'static str {
        match self {
            Self::Treatment => columns::TREATMENT_DATE,
            Self::Lab => columns::OBS_DATE,
            Self::Symptom => columns::SURVEY_DATE,
            Self::EdVisit => columns::EVENT_DATE,
            Self::Clinic => columns::CLINIC_DATE,
            Self::Demographic => columns::LAST_CONTACT_DATE,
        }
    }

    /// Columns that must be present for the table to enter the pipeline.
    /// Absence is a schema violation and aborts the run.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Treatment => &[
                columns::MRN,
                columns::TREATMENT_DATE,
                columns::REGIMEN,
            ],
            Self::Lab => &[columns::MRN, columns::OBS_DATE],
            Self::Symptom => &[columns::MRN, columns::SURVEY_DATE],
            Self::EdVisit => &[columns::MRN, columns::EVENT_DATE],
            Self::Clinic => &[columns::MRN, columns::CLINIC_DATE],
            Self::Demographic => &[columns::MRN, columns::DATE_OF_BIRTH],
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Treatment => "systemic therapy sessions (regimen, drug doses, body metrics)",
            Self::Lab => "laboratory observations (one numeric column per analyte)",
            Self::Symptom => "patient-reported symptom survey scores (0-10)",
            Self::EdVisit => "emergency department visit timestamps",
            Self::Clinic => "clinic visit timestamps",
            Self::Demographic => "patient registry (birth date, sex, diagnosis codes)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_source_requires_the_patient_key() {
        for source in EventSource::ALL {
            assert!(source.required_columns().contains(&columns::MRN));
        }
    }

    #[test]
    fn date_column_is_required() {
        for source in EventSource::ALL {
            if source == EventSource::Demographic {
                continue; // last_contact_date is optional in the registry
            }
            assert!(source.required_columns().contains(&source.date_column()));
        }
    }
}
