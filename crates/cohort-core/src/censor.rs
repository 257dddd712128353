//! Per-patient censor dates: the last day each patient is known to have been
//! observed anywhere in the system. Labels cannot assert a negative beyond
//! this date.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use cohort_ingest::{date_column, date_series, key_column, str_series};
use cohort_model::columns;
use polars::prelude::DataFrame;
use tracing::info;

use crate::context::PipelineContext;

/// Censor date per patient: the maximum over each source's latest activity
/// date and the registry's last-contact date.
pub fn last_seen_table(ctx: &PipelineContext) -> Result<DataFrame> {
    let mut last_seen: BTreeMap<String, NaiveDate> = BTreeMap::new();

    let sources: [(&DataFrame, &str, &str); 4] = [
        (&ctx.lab, "lab", columns::OBS_DATE),
        (&ctx.symptom, "symptom", columns::SURVEY_DATE),
        (&ctx.treatment, "treatment", columns::TREATMENT_DATE),
        (&ctx.demographic, "demographic", columns::LAST_CONTACT_DATE),
    ];
    for (df, table, date_col) in sources {
        if df.column(date_col).is_err() {
            // last_contact_date is optional in the registry
            continue;
        }
        let mrns = key_column(df, table, columns::MRN)?;
        let dates = date_column(df, date_col)?;
        for (mrn, date) in mrns.into_iter().zip(dates) {
            let Some(date) = date else { continue };
            last_seen
                .entry(mrn)
                .and_modify(|seen| *seen = (*seen).max(date))
                .or_insert(date);
        }
    }

    info!(patients = last_seen.len(), "computed censor dates");
    let (mrns, dates): (Vec<Option<String>>, Vec<Option<NaiveDate>>) = last_seen
        .into_iter()
        .map(|(mrn, date)| (Some(mrn), Some(date)))
        .unzip();
    let mut out = DataFrame::new(vec![str_series(columns::MRN, mrns).into()])?;
    out.with_column(date_series(columns::LAST_SEEN_DATE, &dates))?;
    Ok(out)
}
