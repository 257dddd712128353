//! Static clinical reference data.
//!
//! Loaded once into immutable lookup structures and passed explicitly into the
//! components that need them, so the engine stays testable with injected
//! fixtures.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{CohortError, Result};

/// Symptom survey domains (ESAS-style), each a 0-10 severity score column.
pub const SYMPTOM_COLS: &[&str] = &[
    "anxiety",
    "depression",
    "drowsiness",
    "ecog",
    "lack_of_appetite",
    "nausea",
    "pain",
    "shortness_of_breath",
    "tiredness",
    "well_being",
];

/// Lab analytes tracked for change features and toxicity labels.
pub const LAB_COLS: &[&str] = &[
    "alanine_aminotransferase",
    "aspartate_aminotransferase",
    "creatinine",
    "hemoglobin",
    "neutrophil",
    "platelet",
    "total_bilirubin",
];

/// Ideal-dose formula for an included drug, keyed by the allowlist's
/// `recommended_dose_formula` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseFormula {
    /// Ideal dose is the protocol regimen dose as-is.
    Flat,
    /// Regimen dose scaled by body surface area.
    PerBsa,
    /// Regimen dose scaled by weight.
    PerWeight,
    /// Carboplatin AUC dosing: min(regimen_dose * 150,
    /// regimen_dose * (creatinine_clearance + 25)), Cockcroft-Gault clearance.
    Carboplatin,
}

impl FromStr for DoseFormula {
    type Err = CohortError;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "regimen_dose" => Ok(Self::Flat),
            "regimen_dose * bsa" => Ok(Self::PerBsa),
            "regimen_dose * weight" => Ok(Self::PerWeight),
            // the allowlist spells the carboplatin formula out in full
            _ if normalized.contains("creatinine") => Ok(Self::Carboplatin),
            _ => Err(CohortError::Message(format!(
                "unsupported ideal dose formula: {value}"
            ))),
        }
    }
}

/// Immutable (drug -> ideal dose formula) lookup built from the included-drug
/// allowlist. Drugs absent from the reference are dropped from the output
/// entirely; an unknown formula for a known drug yields missing values.
#[derive(Debug, Clone, Default)]
pub struct DrugReference {
    formulas: BTreeMap<String, DoseFormula>,
}

impl DrugReference {
    pub fn new(entries: impl IntoIterator<Item = (String, DoseFormula)>) -> Result<Self> {
        let mut formulas = BTreeMap::new();
        for (name, formula) in entries {
            let name = normalize_drug_name(&name);
            if formulas.insert(name.clone(), formula).is_some() {
                return Err(CohortError::Message(format!(
                    "duplicate drug in allowlist: {name}"
                )));
            }
        }
        Ok(Self { formulas })
    }

    pub fn formula(&self, drug: &str) -> Option<DoseFormula> {
        self.formulas.get(&normalize_drug_name(drug)).copied()
    }

    pub fn drugs(&self) -> impl Iterator<Item = &str> {
        self.formulas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }
}

/// Canonical drug spelling used in column names and the allowlist.
pub fn normalize_drug_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Direction in which a lab value crosses into a toxicity grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeDirection {
    /// Grade worsens as the value falls (cytopenias): positive when the window
    /// minimum drops below the absolute threshold.
    Low,
    /// Grade worsens as the value rises: positive when the window maximum
    /// exceeds threshold x baseline, baseline clipped against the upper limit
    /// of normal.
    High,
}

/// How the pre-anchor baseline is clipped against the upper limit of normal
/// before a multiplier threshold is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineClip {
    /// baseline = max(observed, ULN); missing baseline falls back to ULN.
    AtLeastUln,
    /// baseline = min(observed, ULN); missing baseline falls back to ULN.
    AtMostUln,
}

/// CTCAE grade thresholds for one toxicity, tied to a lab analyte column.
#[derive(Debug, Clone)]
pub struct CtcaeThreshold {
    /// Toxicity name used in output column names (e.g. "hemoglobin", "AKI").
    pub name: &'static str,
    /// The lab table column the grade is derived from.
    pub lab_column: &'static str,
    pub grade2plus: f64,
    pub grade3plus: f64,
    pub direction: GradeDirection,
    /// Upper limit of normal; only meaningful for `GradeDirection::High`.
    pub uln: Option<f64>,
    pub baseline_clip: Option<BaselineClip>,
}

/// CTCAE v5 grade-2+/3+ thresholds for the tracked toxicities.
///
/// Cytopenias use absolute cutoffs on the window minimum; the rest compare the
/// window maximum against a multiple of the ULN-clipped baseline.
pub fn ctcae_thresholds() -> Vec<CtcaeThreshold> {
    vec![
        CtcaeThreshold {
            name: "hemoglobin",
            lab_column: "hemoglobin",
            grade2plus: 100.0, // < 100 g/L
            grade3plus: 80.0,  // < 80 g/L
            direction: GradeDirection::Low,
            uln: None,
            baseline_clip: None,
        },
        CtcaeThreshold {
            name: "neutrophil",
            lab_column: "neutrophil",
            grade2plus: 1.5, // < 1.5 x 10e9/L
            grade3plus: 1.0, // < 1.0 x 10e9/L
            direction: GradeDirection::Low,
            uln: None,
            baseline_clip: None,
        },
        CtcaeThreshold {
            name: "platelet",
            lab_column: "platelet",
            grade2plus: 75.0, // < 75 x 10e9/L
            grade3plus: 50.0, // < 50 x 10e9/L
            direction: GradeDirection::Low,
            uln: None,
            baseline_clip: None,
        },
        CtcaeThreshold {
            name: "bilirubin",
            lab_column: "total_bilirubin",
            grade2plus: 1.5, // > 1.5 x baseline/ULN
            grade3plus: 3.0,
            direction: GradeDirection::High,
            uln: Some(22.0),
            baseline_clip: Some(BaselineClip::AtLeastUln),
        },
        CtcaeThreshold {
            name: "AKI",
            lab_column: "creatinine",
            grade2plus: 1.5,
            grade3plus: 3.0,
            direction: GradeDirection::High,
            uln: Some(353.68),
            baseline_clip: Some(BaselineClip::AtMostUln),
        },
        CtcaeThreshold {
            name: "ALT",
            lab_column: "alanine_aminotransferase",
            grade2plus: 3.0,
            grade3plus: 5.0,
            direction: GradeDirection::High,
            uln: Some(40.0),
            baseline_clip: Some(BaselineClip::AtLeastUln),
        },
        CtcaeThreshold {
            name: "AST",
            lab_column: "aspartate_aminotransferase",
            grade2plus: 3.0,
            grade3plus: 5.0,
            direction: GradeDirection::High,
            uln: Some(34.0),
            baseline_clip: Some(BaselineClip::AtLeastUln),
        },
    ]
}
