//! Source-specific combiners that widen the anchor frame: demographics with
//! eligibility exclusions and diagnosis encoding, and treatment sessions with
//! carried-forward features plus windowed drug-dose sums.

use anyhow::{Context, Result, ensure};
use chrono::{Datelike, NaiveDate};
use cohort_ingest::date_column;
use cohort_model::{Aggregate, DayWindow, columns};
use polars::prelude::{DataFrame, IntoLazy, JoinArgs, JoinType, NamedFrom, Series, col};

use crate::exclude::filter_report;
use crate::partition::FeatureTable;
use crate::window_join::{SummaryOptions, join_summary};

/// Left-join the demographic registry onto the anchor frame, apply the
/// eligibility exclusions, derive `age`, and encode diagnosis-date columns.
///
/// Cancer-site/morphology columns arrive as diagnosis dates and leave as
/// ternary codes: 0 = no diagnosis before the anchor, 1 = prior diagnosis,
/// 2 = the most recent prior diagnosis within its category.
pub fn combine_demographics(
    anchors: &DataFrame,
    anchor_date_col: &str,
    demographic: &DataFrame,
    min_age: i32,
) -> Result<DataFrame> {
    let mut df = anchors
        .clone()
        .lazy()
        .join(
            demographic.clone().lazy(),
            [col(columns::MRN)],
            [col(columns::MRN)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()
        .context("joining demographics onto anchors")?;
    ensure!(
        df.height() == anchors.height(),
        "demographic join changed anchor cardinality (duplicate mrn in registry?)"
    );

    let births = date_column(&df, columns::DATE_OF_BIRTH)?;
    let keep: Vec<bool> = births.iter().map(Option::is_some).collect();
    df = filter_report(&df, &keep, "rows with missing birth date")?;

    // age as calendar-year difference, not exact day arithmetic
    let births = date_column(&df, columns::DATE_OF_BIRTH)?;
    let anchor_dates = date_column(&df, anchor_date_col)?;
    let ages: Vec<Option<i32>> = births
        .iter()
        .zip(&anchor_dates)
        .map(|(birth, anchor)| match (birth, anchor) {
            (Some(birth), Some(anchor)) => Some(anchor.year() - birth.year()),
            _ => None,
        })
        .collect();
    df.with_column(Series::new(columns::AGE.into(), ages.clone()))?;

    let keep: Vec<bool> = ages
        .iter()
        .map(|age| age.is_some_and(|age| age >= min_age))
        .collect();
    df = filter_report(&df, &keep, format!("rows under {min_age} years of age").as_str())?;

    for category in ["cancer_site", "morphology"] {
        df = encode_diagnosis_dates(&df, category, anchor_date_col)?;
    }
    Ok(df)
}

/// Replace one category's diagnosis-date columns with ternary codes relative
/// to the anchor date.
fn encode_diagnosis_dates(
    df: &DataFrame,
    category: &str,
    anchor_date_col: &str,
) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| name.contains(category))
        .collect();
    if names.is_empty() {
        return Ok(df.clone());
    }

    let anchor_dates = date_column(df, anchor_date_col)?;
    let mut diagnosis_dates: Vec<Vec<Option<NaiveDate>>> = Vec::with_capacity(names.len());
    for name in &names {
        diagnosis_dates.push(date_column(df, name)?);
    }

    let mut out = df.clone();
    let mut encoded: Vec<Vec<i32>> = vec![vec![0; df.height()]; names.len()];
    for row in 0..df.height() {
        let Some(anchor) = anchor_dates[row] else {
            continue;
        };
        let prior: Vec<Option<NaiveDate>> = diagnosis_dates
            .iter()
            .map(|dates| dates[row].filter(|date| *date < anchor))
            .collect();
        let most_recent = prior.iter().flatten().max().copied();
        for (slot, date) in prior.iter().enumerate() {
            encoded[slot][row] = match date {
                Some(date) if Some(*date) == most_recent => 2,
                Some(_) => 1,
                None => 0,
            };
        }
    }
    for (name, codes) in names.iter().zip(encoded) {
        out.with_column(Series::new(name.as_str().into(), codes))?;
    }
    Ok(out)
}

/// Attach treatment-session context to a non-treatment-aligned anchor frame:
/// the last session's features in the lookback window are carried forward and
/// the per-drug doses over the window are summed.
pub fn combine_treatment(
    anchors: &DataFrame,
    anchor_date_col: &str,
    treatment: &DataFrame,
    window: DayWindow,
) -> Result<DataFrame> {
    let names: Vec<String> = treatment
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let drug_cols: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| name.starts_with(columns::DRUG_PREFIX))
        .collect();
    let session_cols: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| {
            *name != columns::MRN
                && *name != columns::TREATMENT_DATE
                && !name.starts_with(columns::DRUG_PREFIX)
        })
        .collect();

    // carry the matched session's own date along as a feature
    let mut sessions = treatment.clone();
    let mut session_date = sessions.column(columns::TREATMENT_DATE)?.clone();
    session_date.rename("session_date".into());
    sessions.with_column(session_date.as_materialized_series().clone())?;
    let mut payload = session_cols.clone();
    payload.push("session_date");

    let session_feats = FeatureTable::from_frame_selecting(
        &sessions,
        "treatment",
        columns::TREATMENT_DATE,
        &payload,
    )?;
    let opts = SummaryOptions::new(window, vec![Aggregate::Last]);
    let mut out = join_summary(anchors, anchor_date_col, &session_feats, &opts)?;
    for name in &payload {
        out.rename(&format!("{name}{}", Aggregate::Last.suffix()), (*name).into())?;
    }
    out.rename("session_date", columns::TREATMENT_DATE.into())?;

    if !drug_cols.is_empty() {
        let drug_feats = FeatureTable::from_frame_selecting(
            treatment,
            "treatment",
            columns::TREATMENT_DATE,
            &drug_cols,
        )?;
        let opts = SummaryOptions::new(window, vec![Aggregate::Sum]);
        out = join_summary(&out, anchor_date_col, &drug_feats, &opts)?;
        for name in &drug_cols {
            out.rename(&format!("{name}{}", Aggregate::Sum.suffix()), (*name).into())?;
        }
    }
    Ok(out)
}
