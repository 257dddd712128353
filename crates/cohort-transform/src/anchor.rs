//! Anchor frame construction: the (patient, anchor date) spine every feature
//! and label joins onto. Three modes: one anchor per treatment session, one
//! per clinic visit, or a dense weekly grid crossed with all known patients.

use anyhow::{Context, Result, ensure};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use cohort_ingest::{date_column, date_series, key_column, str_series};
use polars::prelude::{DataFrame, IntoLazy, JoinArgs, JoinType, col};
use tracing::info;

use cohort_model::columns;

use crate::exclude::filter_report;
use crate::partition::FeatureTable;

/// A clinic visit belongs to an active treatment period when the next
/// treatment session occurs within this many days of the visit.
const ACTIVE_TREATMENT_LINK_DAYS: i64 = 5;

/// One anchor per treatment session. The session payload rides along so the
/// dose and engineered-feature derivations can read it later.
pub fn treatment_anchors(treatment: &DataFrame) -> Result<DataFrame> {
    ensure!(
        treatment.column(columns::TREATMENT_DATE).is_ok(),
        "treatment table has no {} column",
        columns::TREATMENT_DATE
    );
    let mut out = treatment.clone();
    out = out
        .sort(
            [columns::MRN, columns::TREATMENT_DATE],
            Default::default(),
        )
        .context("sorting treatment anchors")?;
    info!(anchors = out.height(), "built treatment-session anchor frame");
    Ok(out)
}

/// One anchor per clinic visit within an active treatment period: visits
/// whose next treatment session is more than five days away (or never comes)
/// are excluded.
pub fn clinic_anchors(clinic: &DataFrame, treatment: &DataFrame) -> Result<DataFrame> {
    let mut out = clinic
        .select([columns::MRN, columns::CLINIC_DATE])
        .context("selecting clinic anchor columns")?;
    out = out
        .sort([columns::MRN, columns::CLINIC_DATE], Default::default())
        .context("sorting clinic anchors")?;

    let sessions = FeatureTable::dates_only(treatment, "treatment", columns::TREATMENT_DATE)?;
    let mrns = key_column(&out, "clinic", columns::MRN)?;
    let dates = date_column(&out, columns::CLINIC_DATE)?;
    let keep: Vec<bool> = mrns
        .iter()
        .zip(&dates)
        .map(|(mrn, date)| {
            date.is_some_and(|date| {
                !sessions
                    .window(mrn, date, date + Duration::days(ACTIVE_TREATMENT_LINK_DAYS))
                    .is_empty()
            })
        })
        .collect();
    let out = filter_report(&out, &keep, "clinic visits outside an active treatment period")?;
    info!(anchors = out.height(), "built clinic-visit anchor frame");
    Ok(out)
}

/// Every Monday in `[start, end]` crossed with every patient in the
/// demographic registry.
pub fn weekly_anchors(
    demographic: &DataFrame,
    start: NaiveDate,
    end: NaiveDate,
    date_col: &str,
) -> Result<DataFrame> {
    ensure!(start <= end, "weekly grid start {start} is after end {end}");
    let mrns = key_column(demographic, "demographic", columns::MRN)?;
    let mut unique: Vec<String> = mrns;
    unique.sort_unstable();
    unique.dedup();

    let mut mondays = Vec::new();
    let mut day = start;
    while day.weekday() != Weekday::Mon {
        day += Duration::days(1);
    }
    while day <= end {
        mondays.push(day);
        day += Duration::days(7);
    }

    let mut keys = Vec::with_capacity(unique.len() * mondays.len());
    let mut dates = Vec::with_capacity(unique.len() * mondays.len());
    for mrn in &unique {
        for monday in &mondays {
            keys.push(Some(mrn.clone()));
            dates.push(Some(*monday));
        }
    }

    let mut out = DataFrame::new(vec![str_series(columns::MRN, keys).into()])
        .context("building weekly anchor frame")?;
    out.with_column(date_series(date_col, &dates))?;
    info!(
        patients = unique.len(),
        mondays = mondays.len(),
        anchors = out.height(),
        "built weekly-monday anchor frame"
    );
    Ok(out)
}

/// Copy the aligning date column to the canonical assessment-date name so the
/// downstream joins see one anchor column regardless of alignment mode.
pub fn with_assessment_date(anchors: &DataFrame, date_col: &str) -> Result<DataFrame> {
    let mut out = anchors.clone();
    if date_col != columns::ASSESSMENT_DATE {
        ensure!(
            out.column(columns::ASSESSMENT_DATE).is_err(),
            "anchor frame already has an {} column",
            columns::ASSESSMENT_DATE
        );
        let mut assessment = out.column(date_col)?.clone();
        assessment.rename(columns::ASSESSMENT_DATE.into());
        out.with_column(assessment.as_materialized_series().clone())?;
    }
    Ok(out)
}

/// Left-join the per-patient censor date onto the anchor frame.
pub fn attach_last_seen(anchors: &DataFrame, last_seen: &DataFrame) -> Result<DataFrame> {
    let censor = last_seen
        .select([columns::MRN, columns::LAST_SEEN_DATE])
        .context("selecting last-seen columns")?;
    let out = anchors
        .clone()
        .lazy()
        .join(
            censor.lazy(),
            [col(columns::MRN)],
            [col(columns::MRN)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()
        .context("joining last-seen dates onto anchors")?;
    ensure!(
        out.height() == anchors.height(),
        "last-seen join changed anchor cardinality (duplicate mrn in registry?)"
    );
    Ok(out)
}
