//! End-to-end unify runs over a small in-memory cohort.

use chrono::NaiveDate;
use cohort_core::{Alignment, PipelineContext, UnifyOptions, run_unify};
use cohort_model::{DoseFormula, DrugReference, UnifyConfig};
use polars::df;

fn context() -> PipelineContext {
    PipelineContext {
        config: UnifyConfig::default(),
        treatment: df!(
            "mrn" => ["p1", "p1", "p2"],
            "treatment_date" => ["2024-01-02", "2024-01-23", "2024-01-09"],
            "first_treatment_date" => ["2024-01-02", "2024-01-02", "2024-01-09"],
            "regimen" => ["FOLFOX", "FOLFOX", "GEMCIS"],
            "intent" => ["PALLIATIVE", "PALLIATIVE", "ADJUVANT"],
            "weight" => [70.0, 69.0, 80.0],
            "body_surface_area" => [1.8, 1.8, 2.0],
            "drug_CISPLATIN_given_dose" => [Some(90.0), Some(80.0), None],
            "drug_CISPLATIN_regimen_dose" => [Some(50.0), Some(50.0), None],
        )
        .unwrap(),
        lab: df!(
            "mrn" => ["p1", "p1", "p2"],
            "obs_date" => ["2024-01-01", "2024-02-01", "2024-01-08"],
            "hemoglobin" => [Some(120.0), Some(75.0), Some(130.0)],
            "creatinine" => [Some(80.0), Some(85.0), Some(70.0)],
        )
        .unwrap(),
        symptom: df!(
            "mrn" => ["p1", "p1"],
            "survey_date" => ["2024-01-01", "2024-02-10"],
            "pain" => [Some(2.0), Some(8.0)],
        )
        .unwrap(),
        ed_visits: df!(
            "mrn" => ["p1"],
            "event_date" => ["2023-06-15"],
        )
        .unwrap(),
        clinic: None,
        demographic: df!(
            "mrn" => ["p1", "p2"],
            "date_of_birth" => ["1959-03-01", "1980-07-01"],
            "date_of_death" => [Some("2024-04-01"), None],
            "female" => [false, true],
            "last_contact_date" => ["2024-03-01", "2025-06-01"],
            "cancer_site_lung" => [Some("2023-05-01"), None],
        )
        .unwrap(),
        drugs: DrugReference::new(vec![("CISPLATIN".to_string(), DoseFormula::PerBsa)]).unwrap(),
    }
}

#[test]
fn treatment_aligned_run_produces_one_row_per_session() {
    let out = run_unify(
        &context(),
        &UnifyOptions {
            alignment: Alignment::TreatmentDates,
            date_column: "treatment_date".to_string(),
        },
    )
    .unwrap();

    assert_eq!(out.height(), 3);
    for name in [
        "assessment_date",
        "age",
        "hemoglobin",
        "pain",
        "num_prior_ED_visits_within_5_years",
        "%_ideal_dose_given_CISPLATIN",
        "line_of_therapy",
        "visit_month_sin",
        "target_death_in_30d",
        "target_death_in_365d",
        "target_ED_30d",
        "target_pain_3pt_change",
        "target_hemoglobin_grade2plus",
    ] {
        assert!(out.column(name).is_ok(), "missing column {name}");
    }
    // raw drug dose columns are consumed by the dose-intensity step
    for name in out.get_column_names() {
        assert!(!name.starts_with("drug_"), "leaked {name}");
    }
}

#[test]
fn death_label_respects_the_censor_date() {
    let out = run_unify(
        &context(),
        &UnifyOptions {
            alignment: Alignment::TreatmentDates,
            date_column: "treatment_date".to_string(),
        },
    )
    .unwrap();

    let death_365 = out.column("target_death_in_365d").unwrap().i8().unwrap();
    let mrn = out.column("mrn").unwrap().str().unwrap();
    for row in 0..out.height() {
        match mrn.get(row).unwrap() {
            // p1 dies 2024-04-01, within a year of every session
            "p1" => assert_eq!(death_365.get(row), Some(1)),
            // p2 is followed up past anchor + 365
            "p2" => assert_eq!(death_365.get(row), Some(0)),
            other => panic!("unexpected patient {other}"),
        }
    }
}

#[test]
fn weekly_aligned_run_carries_treatment_context() {
    let out = run_unify(
        &context(),
        &UnifyOptions {
            alignment: Alignment::WeeklyMondays {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            },
            date_column: "assessment_date".to_string(),
        },
    )
    .unwrap();

    // two registry patients x five mondays, minus nothing (both are adults)
    assert_eq!(out.height(), 10);
    assert!(out.column("regimen").is_ok());
    assert!(out.column("treatment_date").is_ok());

    // 2024-01-08 follows p1's first session; the carried regimen matches
    let dates = out.column("assessment_date").unwrap();
    let regimen = out.column("regimen").unwrap().str().unwrap();
    let mrn = out.column("mrn").unwrap().str().unwrap();
    let mut checked = false;
    for row in 0..out.height() {
        let date = dates.get(row).unwrap().to_string();
        if mrn.get(row) == Some("p1") && date.starts_with("2024-01-08") {
            assert_eq!(regimen.get(row), Some("FOLFOX"));
            checked = true;
        }
    }
    assert!(checked);
}

#[test]
fn clinic_aligned_run_keeps_only_visits_during_active_treatment() {
    let mut ctx = context();
    ctx.clinic = Some(
        df!(
            "mrn" => ["p1", "p1"],
            "clinic_date" => ["2024-01-01", "2027-01-03"],
        )
        .unwrap(),
    );
    let out = run_unify(
        &ctx,
        &UnifyOptions {
            alignment: Alignment::ClinicVisits,
            date_column: "clinic_date".to_string(),
        },
    )
    .unwrap();

    // the 2027 visit has no treatment session within five days
    assert_eq!(out.height(), 1);
    let dates = out.column("assessment_date").unwrap();
    assert!(dates.get(0).unwrap().to_string().starts_with("2024-01-01"));
}

#[test]
fn duplicate_sessions_differing_only_in_course_start_collapse() {
    let mut ctx = context();
    // the second row repeats the first session with a divergent course-start
    ctx.treatment = df!(
        "mrn" => ["p1", "p1", "p1", "p2"],
        "treatment_date" => ["2024-01-02", "2024-01-02", "2024-01-23", "2024-01-09"],
        "first_treatment_date" => ["2024-01-02", "2023-06-01", "2024-01-02", "2024-01-09"],
        "regimen" => ["FOLFOX", "FOLFOX", "FOLFOX", "GEMCIS"],
        "intent" => ["PALLIATIVE", "PALLIATIVE", "PALLIATIVE", "ADJUVANT"],
        "weight" => [70.0, 70.0, 69.0, 80.0],
        "body_surface_area" => [1.8, 1.8, 1.8, 2.0],
        "drug_CISPLATIN_given_dose" => [Some(90.0), Some(90.0), Some(80.0), None],
        "drug_CISPLATIN_regimen_dose" => [Some(50.0), Some(50.0), Some(50.0), None],
    )
    .unwrap();
    let out = run_unify(
        &ctx,
        &UnifyOptions {
            alignment: Alignment::TreatmentDates,
            date_column: "treatment_date".to_string(),
        },
    )
    .unwrap();

    assert_eq!(out.height(), 3);
}

#[test]
fn reserved_date_columns_are_rejected_for_grid_alignment() {
    let result = run_unify(
        &context(),
        &UnifyOptions {
            alignment: Alignment::WeeklyMondays {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            },
            date_column: "obs_date".to_string(),
        },
    );
    assert!(result.is_err());
}
