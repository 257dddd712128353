//! Dose intensity: administered dose as a percentage of the ideal dose from
//! the included-drug reference. Raw per-drug dose columns are consumed and
//! dropped from the output.

use anyhow::Result;
use cohort_model::{DoseFormula, DrugReference, columns};
use polars::prelude::DataFrame;
use tracing::debug;

use cohort_ingest::{f64_column, f64_series};

/// Body metrics and session dosing inputs for one anchor row.
struct DoseInputs {
    regimen_dose: Option<f64>,
    given_dose: Option<f64>,
    bsa: Option<f64>,
    weight: Option<f64>,
    age: Option<f64>,
    female: Option<bool>,
    creatinine: Option<f64>,
}

impl DoseInputs {
    /// Cockcroft-Gault creatinine clearance, with the standard female factor.
    fn creatinine_clearance(&self) -> Option<f64> {
        let age = self.age?;
        let weight = self.weight?;
        let creatinine = self.creatinine?;
        if creatinine == 0.0 {
            return None;
        }
        let sex_factor = if self.female? { 0.85 } else { 1.0 };
        Some((140.0 - age) * weight * 1.23 * sex_factor / creatinine)
    }

    fn ideal_dose(&self, formula: DoseFormula) -> Option<f64> {
        let regimen_dose = self.regimen_dose?;
        let ideal = match formula {
            DoseFormula::Flat => regimen_dose,
            DoseFormula::PerBsa => regimen_dose * self.bsa?,
            DoseFormula::PerWeight => regimen_dose * self.weight?,
            DoseFormula::Carboplatin => {
                let clearance = self.creatinine_clearance()?;
                (regimen_dose * 150.0).min(regimen_dose * (clearance + 25.0))
            }
        };
        (ideal > 0.0).then_some(ideal)
    }

    fn percent_ideal_given(&self, formula: DoseFormula) -> Option<f64> {
        Some(self.given_dose? / self.ideal_dose(formula)? * 100.0)
    }
}

/// Append `%_ideal_dose_given_<drug>` for every included drug with dose
/// columns in the table, then drop all raw `drug_` columns. Rows where the
/// ideal dose cannot be determined yield missing, never zero and never an
/// error.
pub fn combine_dose_intensity(df: &DataFrame, reference: &DrugReference) -> Result<DataFrame> {
    let mut out = df.clone();

    let bsa = optional_f64(df, columns::BODY_SURFACE_AREA)?;
    let weight = optional_f64(df, columns::WEIGHT)?;
    let age = optional_f64(df, columns::AGE)?;
    let female = optional_f64(df, columns::FEMALE)?;
    let creatinine = optional_f64(df, columns::CREATININE)?;

    for drug in reference.drugs() {
        let given_col = format!("{}{drug}{}", columns::DRUG_PREFIX, columns::GIVEN_DOSE_SUFFIX);
        if df.column(&given_col).is_err() {
            continue;
        }
        let Some(formula) = reference.formula(drug) else {
            continue;
        };
        let regimen_col =
            format!("{}{drug}{}", columns::DRUG_PREFIX, columns::REGIMEN_DOSE_SUFFIX);
        let given = f64_column(df, &given_col)?;
        let regimen_dose = optional_f64(df, &regimen_col)?;

        let percents: Vec<Option<f64>> = (0..df.height())
            .map(|row| {
                let inputs = DoseInputs {
                    regimen_dose: at(&regimen_dose, row),
                    given_dose: given[row],
                    bsa: at(&bsa, row),
                    weight: at(&weight, row),
                    age: at(&age, row),
                    female: at(&female, row).map(|flag| flag > 0.5),
                    creatinine: at(&creatinine, row),
                };
                inputs.percent_ideal_given(formula)
            })
            .collect();
        out.with_column(f64_series(&format!("%_ideal_dose_given_{drug}"), percents))?;
    }

    // the raw dosage columns have served their purpose
    let dropped: Vec<String> = out
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| name.starts_with(columns::DRUG_PREFIX))
        .collect();
    for name in &dropped {
        out.drop_in_place(name)?;
    }
    if !dropped.is_empty() {
        debug!(columns = dropped.len(), "dropped raw drug-dose columns");
    }
    Ok(out)
}

fn optional_f64(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>> {
    if df.column(name).is_err() {
        return Ok(None);
    }
    Ok(Some(f64_column(df, name)?))
}

fn at(values: &Option<Vec<Option<f64>>>, row: usize) -> Option<f64> {
    values.as_ref().and_then(|values| values[row])
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn reference() -> DrugReference {
        DrugReference::new(vec![
            ("CISPLATIN".to_string(), DoseFormula::PerBsa),
            ("VINCRISTINE".to_string(), DoseFormula::Flat),
            ("CARBOPLATIN".to_string(), DoseFormula::Carboplatin),
        ])
        .unwrap()
    }

    #[test]
    fn flat_formula_gives_plain_percentage() {
        let df = df!(
            "mrn" => ["p1"],
            "drug_VINCRISTINE_given_dose" => [150.0],
            "drug_VINCRISTINE_regimen_dose" => [200.0],
        )
        .unwrap();
        let out = combine_dose_intensity(&df, &reference()).unwrap();
        let pct = out.column("%_ideal_dose_given_VINCRISTINE").unwrap().f64().unwrap();
        assert_eq!(pct.get(0), Some(75.0));
    }

    #[test]
    fn bsa_formula_scales_the_regimen_dose() {
        let df = df!(
            "mrn" => ["p1"],
            "body_surface_area" => [2.0],
            "drug_CISPLATIN_given_dose" => [100.0],
            "drug_CISPLATIN_regimen_dose" => [100.0],
        )
        .unwrap();
        let out = combine_dose_intensity(&df, &reference()).unwrap();
        let pct = out.column("%_ideal_dose_given_CISPLATIN").unwrap().f64().unwrap();
        assert_eq!(pct.get(0), Some(50.0));
    }

    #[test]
    fn carboplatin_uses_the_clearance_cap() {
        let df = df!(
            "mrn" => ["p1"],
            "age" => [60.0],
            "weight" => [70.0],
            "female" => [0.0],
            "creatinine" => [80.0],
            "drug_CARBOPLATIN_given_dose" => [500.0],
            "drug_CARBOPLATIN_regimen_dose" => [5.0],
        )
        .unwrap();
        let out = combine_dose_intensity(&df, &reference()).unwrap();
        let pct = out
            .column("%_ideal_dose_given_CARBOPLATIN")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        // CrCl = (140-60)*70*1.23/80 = 86.1; ideal = 5*(86.1+25) = 555.5 < 5*150
        assert!((pct - 500.0 / 555.5 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn unresolvable_ideal_dose_is_missing_not_zero() {
        let df = df!(
            "mrn" => ["p1"],
            "drug_CISPLATIN_given_dose" => [100.0],
            "drug_CISPLATIN_regimen_dose" => [100.0],
        )
        .unwrap();
        // no body_surface_area column at all
        let out = combine_dose_intensity(&df, &reference()).unwrap();
        let pct = out.column("%_ideal_dose_given_CISPLATIN").unwrap().f64().unwrap();
        assert_eq!(pct.get(0), None);
    }

    #[test]
    fn raw_drug_columns_are_dropped() {
        let df = df!(
            "mrn" => ["p1"],
            "drug_VINCRISTINE_given_dose" => [150.0],
            "drug_VINCRISTINE_regimen_dose" => [200.0],
            "drug_UNLISTED_given_dose" => [10.0],
        )
        .unwrap();
        let out = combine_dose_intensity(&df, &reference()).unwrap();
        for name in out.get_column_names() {
            assert!(!name.starts_with("drug_"), "leaked {name}");
        }
        // drugs outside the included set are dropped without a derived column
        assert!(out.column("%_ideal_dose_given_UNLISTED").is_err());
    }
}
