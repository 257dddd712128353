//! Included-drug allowlist loading.
//!
//! The allowlist CSV maps each drug to its ideal-dose formula. Only rows with
//! category `INCLUDE` participate; everything else is scope reduction, not an
//! error.

use std::path::Path;

use cohort_model::{DoseFormula, DrugReference};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;

#[derive(Debug, Deserialize)]
struct IncludedDrugRecord {
    name: String,
    category: String,
    recommended_dose_formula: String,
}

pub fn load_included_drugs(path: &Path) -> Result<DrugReference> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut entries = Vec::new();
    for record in reader.deserialize() {
        let record: IncludedDrugRecord = record?;
        if !record.category.eq_ignore_ascii_case("INCLUDE") {
            continue;
        }
        match record.recommended_dose_formula.parse::<DoseFormula>() {
            Ok(formula) => entries.push((record.name, formula)),
            Err(error) => {
                // the drug stays excluded; its dose-intensity column is
                // simply never produced
                warn!(drug = %record.name, %error, "skipping drug with unparseable dose formula");
            }
        }
    }
    let reference = DrugReference::new(entries)?;
    info!(drugs = reference.len(), path = %path.display(), "loaded included-drug allowlist");
    Ok(reference)
}
