//! Interval-bounded asof-join of feature tables onto an anchor frame.
//!
//! The join is always left-outer over the anchor frame: every anchor row
//! produces exactly one output row, widened with one column per payload
//! column (and aggregate). An anchor with no qualifying feature rows gets
//! missing values, never zeros and never an error.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use cohort_ingest::{date_column, date_series, f64_series, key_column, str_series};
use cohort_model::{Aggregate, DayWindow, TieBreak, columns};
use polars::prelude::{DataFrame, NamedFrom, Series};

use crate::partition::{ColumnValues, FeatureTable};

/// Options for nearest-to-anchor reduction.
#[derive(Debug, Clone)]
pub struct ClosestOptions {
    pub window: DayWindow,
    /// Rule applied when two rows are exactly equidistant from the anchor.
    pub tie_break: TieBreak,
    /// Also emit `<column>_<event date column>` with the matched row's date.
    pub include_event_date: bool,
}

impl ClosestOptions {
    pub fn new(window: DayWindow) -> Self {
        Self {
            window,
            tie_break: TieBreak::default(),
            include_event_date: false,
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_event_date(mut self, include: bool) -> Self {
        self.include_event_date = include;
        self
    }
}

/// Options for statistical-summary reduction.
#[derive(Debug, Clone)]
pub struct SummaryOptions {
    pub window: DayWindow,
    pub aggregates: Vec<Aggregate>,
    /// Prepended to every output column name (label derivation uses
    /// `"target_"` so feature and target blocks cannot collide).
    pub prefix: Option<String>,
}

impl SummaryOptions {
    pub fn new(window: DayWindow, aggregates: Vec<Aggregate>) -> Self {
        Self {
            window,
            aggregates,
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Attach, per anchor, the single qualifying feature row closest to the
/// anchor date, independently for each payload column (rows where a column is
/// null do not block that column from matching an earlier row).
pub fn join_closest(
    anchors: &DataFrame,
    anchor_date_col: &str,
    feats: &FeatureTable,
    opts: &ClosestOptions,
) -> Result<DataFrame> {
    let (mrns, anchor_dates) = anchor_view(anchors, anchor_date_col)?;
    let height = anchors.height();
    let mut out = anchors.clone();

    for column in feats.columns() {
        ensure_no_collision(&out, column.name(), feats.table())?;
        let mut buffer = OutBuffer::like(column.values(), height);
        let mut matched_dates: Vec<Option<NaiveDate>> = if opts.include_event_date {
            vec![None; height]
        } else {
            Vec::new()
        };

        for (row, (mrn, anchor)) in mrns.iter().zip(&anchor_dates).enumerate() {
            let (from, until) = opts.window.bounds(*anchor);
            let range = feats.window(mrn, from, until);
            let mut best: Option<(i64, NaiveDate, usize)> = None;
            for idx in range {
                if column.values().is_null(idx) {
                    continue;
                }
                let date = feats.dates()[idx];
                let distance = (date - *anchor).num_days().abs();
                let better = match best {
                    None => true,
                    Some((best_distance, best_date, _)) => {
                        distance < best_distance
                            || (distance == best_distance
                                && match opts.tie_break {
                                    TieBreak::Earlier => date < best_date,
                                    TieBreak::Later => date > best_date,
                                })
                    }
                };
                if better {
                    best = Some((distance, date, idx));
                }
            }
            if let Some((_, date, idx)) = best {
                buffer.copy_from(row, column.values(), idx);
                if opts.include_event_date {
                    matched_dates[row] = Some(date);
                }
            }
        }

        out.with_column(buffer.into_series(column.name()))?;
        if opts.include_event_date {
            let name = format!("{}_{}", column.name(), feats.date_column_name());
            ensure_no_collision(&out, &name, feats.table())?;
            out.with_column(date_series(&name, &matched_dates))?;
        }
    }

    debug_assert_eq!(out.height(), height);
    Ok(out)
}

/// Attach named aggregates of the qualifying rows, independently per payload
/// column. Column names are suffixed by aggregate kind.
pub fn join_summary(
    anchors: &DataFrame,
    anchor_date_col: &str,
    feats: &FeatureTable,
    opts: &SummaryOptions,
) -> Result<DataFrame> {
    let (mrns, anchor_dates) = anchor_view(anchors, anchor_date_col)?;
    let height = anchors.height();
    let prefix = opts.prefix.as_deref().unwrap_or("");
    let mut out = anchors.clone();

    for column in feats.columns() {
        for aggregate in &opts.aggregates {
            if aggregate.numeric_only() && !column.is_numeric() {
                continue;
            }
            let name = format!("{prefix}{}{}", column.name(), aggregate.suffix());
            ensure_no_collision(&out, &name, feats.table())?;

            let series = match aggregate {
                Aggregate::First | Aggregate::Last => {
                    let mut buffer = OutBuffer::like(column.values(), height);
                    for (row, (mrn, anchor)) in mrns.iter().zip(&anchor_dates).enumerate() {
                        let (from, until) = opts.window.bounds(*anchor);
                        let range = feats.window(mrn, from, until);
                        let pick = match aggregate {
                            Aggregate::First => {
                                range.clone().find(|idx| !column.values().is_null(*idx))
                            }
                            _ => range.rev().find(|idx| !column.values().is_null(*idx)),
                        };
                        if let Some(idx) = pick {
                            buffer.copy_from(row, column.values(), idx);
                        }
                    }
                    buffer.into_series(&name)
                }
                Aggregate::Count => {
                    let mut counts: Vec<Option<i64>> = vec![None; height];
                    for (row, (mrn, anchor)) in mrns.iter().zip(&anchor_dates).enumerate() {
                        let (from, until) = opts.window.bounds(*anchor);
                        let range = feats.window(mrn, from, until);
                        if range.is_empty() {
                            continue;
                        }
                        let count = range.filter(|idx| !column.values().is_null(*idx)).count();
                        counts[row] = Some(count as i64);
                    }
                    Series::new(name.as_str().into(), counts)
                }
                Aggregate::Sum | Aggregate::Max | Aggregate::Min | Aggregate::Mean => {
                    let mut values: Vec<Option<f64>> = vec![None; height];
                    for (row, (mrn, anchor)) in mrns.iter().zip(&anchor_dates).enumerate() {
                        let (from, until) = opts.window.bounds(*anchor);
                        let range = feats.window(mrn, from, until);
                        values[row] = reduce_numeric(column.values(), range, *aggregate);
                    }
                    f64_series(&name, values)
                }
            };
            out.with_column(series)?;
        }
    }

    debug_assert_eq!(out.height(), height);
    Ok(out)
}

fn reduce_numeric(
    values: &ColumnValues,
    range: std::ops::Range<usize>,
    aggregate: Aggregate,
) -> Option<f64> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for idx in range {
        let Some(value) = values.as_float(idx) else {
            continue;
        };
        count += 1;
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }
    if count == 0 {
        return None;
    }
    match aggregate {
        Aggregate::Sum => Some(sum),
        Aggregate::Max => Some(max),
        Aggregate::Min => Some(min),
        Aggregate::Mean => Some(sum / count as f64),
        _ => None,
    }
}

/// Patient keys and anchor dates of the spine. Anchor timestamps must be
/// fully populated; a null anchor is a fatal precondition failure.
pub(crate) fn anchor_view(
    anchors: &DataFrame,
    anchor_date_col: &str,
) -> Result<(Vec<String>, Vec<NaiveDate>)> {
    let mrns = key_column(anchors, "anchor frame", columns::MRN)?;
    let raw_dates = date_column(anchors, anchor_date_col)?;
    let mut dates = Vec::with_capacity(raw_dates.len());
    for (row, date) in raw_dates.into_iter().enumerate() {
        match date {
            Some(date) => dates.push(date),
            None => bail!("anchor frame: null {anchor_date_col} at row {row}"),
        }
    }
    Ok((mrns, dates))
}

// checked against the evolving output so two generated names colliding with
// each other fail the same way as a clash with a pre-existing column
fn ensure_no_collision(out: &DataFrame, name: &str, table: &str) -> Result<()> {
    if out.column(name).is_ok() {
        bail!("joining {table} would overwrite existing column {name}");
    }
    Ok(())
}

/// Output value buffer matching the payload column's type.
enum OutBuffer {
    Float(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
}

impl OutBuffer {
    fn like(values: &ColumnValues, height: usize) -> Self {
        match values {
            ColumnValues::Float(_) => Self::Float(vec![None; height]),
            ColumnValues::Str(_) => Self::Str(vec![None; height]),
            ColumnValues::Date(_) => Self::Date(vec![None; height]),
        }
    }

    fn copy_from(&mut self, row: usize, values: &ColumnValues, idx: usize) {
        match (self, values) {
            (Self::Float(out), ColumnValues::Float(src)) => out[row] = src[idx],
            (Self::Str(out), ColumnValues::Str(src)) => out[row] = src[idx].clone(),
            (Self::Date(out), ColumnValues::Date(src)) => out[row] = src[idx],
            _ => {}
        }
    }

    fn into_series(self, name: &str) -> Series {
        match self {
            Self::Float(values) => f64_series(name, values),
            Self::Str(values) => str_series(name, values),
            Self::Date(values) => date_series(name, &values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn anchors() -> DataFrame {
        df!(
            "mrn" => ["p1", "p1", "p2"],
            "assessment_date" => ["2024-01-10", "2024-02-01", "2024-01-10"],
        )
        .unwrap()
    }

    fn labs() -> FeatureTable {
        let df = df!(
            "mrn" => ["p1", "p1", "p1"],
            "obs_date" => ["2024-01-05", "2024-01-15", "2024-01-30"],
            "hemoglobin" => [Some(120.0), Some(110.0), None],
            "platelet" => [None, Some(250.0), Some(200.0)],
        )
        .unwrap();
        FeatureTable::from_frame(&df, "lab", "obs_date").unwrap()
    }

    #[test]
    fn preserves_anchor_cardinality() {
        let opts = ClosestOptions::new(DayWindow::new(-7, 7).unwrap());
        let out = join_closest(&anchors(), "assessment_date", &labs(), &opts).unwrap();
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn equidistant_tie_prefers_earlier_row() {
        // rows at day 5 and day 15, anchor at day 10: both 5 days away
        let opts = ClosestOptions::new(DayWindow::new(-7, 7).unwrap());
        let out = join_closest(&anchors(), "assessment_date", &labs(), &opts).unwrap();
        let hb = out.column("hemoglobin").unwrap().f64().unwrap();
        assert_eq!(hb.get(0), Some(120.0));
    }

    #[test]
    fn tie_break_later_picks_the_later_row() {
        let opts = ClosestOptions::new(DayWindow::new(-7, 7).unwrap())
            .with_tie_break(TieBreak::Later);
        let out = join_closest(&anchors(), "assessment_date", &labs(), &opts).unwrap();
        let hb = out.column("hemoglobin").unwrap().f64().unwrap();
        assert_eq!(hb.get(0), Some(110.0));
    }

    #[test]
    fn null_values_fall_through_to_other_rows() {
        // platelet is null on day 5; anchor day 10 should match day 15 instead
        let opts = ClosestOptions::new(DayWindow::new(-7, 7).unwrap());
        let out = join_closest(&anchors(), "assessment_date", &labs(), &opts).unwrap();
        let plt = out.column("platelet").unwrap().f64().unwrap();
        assert_eq!(plt.get(0), Some(250.0));
    }

    #[test]
    fn no_qualifying_rows_yields_missing_for_every_column() {
        let opts = ClosestOptions::new(DayWindow::new(-7, 7).unwrap());
        let out = join_closest(&anchors(), "assessment_date", &labs(), &opts).unwrap();
        // p2 has no lab history at all
        assert!(out.column("hemoglobin").unwrap().f64().unwrap().get(2).is_none());
        assert!(out.column("platelet").unwrap().f64().unwrap().get(2).is_none());
    }

    #[test]
    fn matched_event_date_is_exposed_on_request() {
        let opts = ClosestOptions::new(DayWindow::new(-7, 7).unwrap()).with_event_date(true);
        let out = join_closest(&anchors(), "assessment_date", &labs(), &opts).unwrap();
        assert!(out.column("hemoglobin_obs_date").is_ok());
    }

    #[test]
    fn summary_aggregates_match_hand_computation() {
        let anchors = df!(
            "mrn" => ["p1"],
            "assessment_date" => ["2024-01-31"],
        )
        .unwrap();
        let feats = FeatureTable::from_frame(
            &df!(
                "mrn" => ["p1", "p1", "p1"],
                "obs_date" => ["2024-01-10", "2024-01-20", "2024-01-30"],
                "score" => [3.0, 7.0, 9.0],
            )
            .unwrap(),
            "scores",
            "obs_date",
        )
        .unwrap();
        let opts = SummaryOptions::new(
            DayWindow::lookback(30),
            vec![Aggregate::Last, Aggregate::Mean, Aggregate::Max],
        );
        let out = join_summary(&anchors, "assessment_date", &feats, &opts).unwrap();
        let last = out.column("score_LAST").unwrap().f64().unwrap().get(0).unwrap();
        let mean = out.column("score_AVG").unwrap().f64().unwrap().get(0).unwrap();
        let max = out.column("score_MAX").unwrap().f64().unwrap().get(0).unwrap();
        assert_eq!(last, 9.0);
        assert!((mean - 19.0 / 3.0).abs() < 1e-9);
        assert_eq!(max, 9.0);
    }

    #[test]
    fn summary_prefix_namespaces_output() {
        let opts = SummaryOptions::new(DayWindow::lookahead(30), vec![Aggregate::Max])
            .with_prefix("target_");
        let out = join_summary(&anchors(), "assessment_date", &labs(), &opts).unwrap();
        assert!(out.column("target_hemoglobin_MAX").is_ok());
    }

    #[test]
    fn column_collision_is_an_error() {
        let anchors = df!(
            "mrn" => ["p1"],
            "assessment_date" => ["2024-01-10"],
            "hemoglobin" => [1.0],
        )
        .unwrap();
        let opts = ClosestOptions::new(DayWindow::lookback(7));
        assert!(join_closest(&anchors, "assessment_date", &labs(), &opts).is_err());
    }

    #[test]
    fn collision_between_generated_columns_is_an_error() {
        // "pain" with the matched-date option generates "pain_obs_date",
        // which the payload column of the same name then collides with
        let feats = FeatureTable::from_frame(
            &df!(
                "mrn" => ["p1"],
                "obs_date" => ["2024-01-05"],
                "pain" => [2.0],
                "pain_obs_date" => [1.0],
            )
            .unwrap(),
            "symptom",
            "obs_date",
        )
        .unwrap();
        let anchors = df!(
            "mrn" => ["p1"],
            "assessment_date" => ["2024-01-10"],
        )
        .unwrap();
        let opts = ClosestOptions::new(DayWindow::lookback(7)).with_event_date(true);
        let err = join_closest(&anchors, "assessment_date", &feats, &opts).unwrap_err();
        assert!(err.to_string().contains("overwrite"));
    }

    #[test]
    fn null_anchor_date_is_fatal() {
        let anchors = df!(
            "mrn" => ["p1"],
            "assessment_date" => [None::<&str>],
        )
        .unwrap();
        let opts = ClosestOptions::new(DayWindow::lookback(7));
        assert!(join_closest(&anchors, "assessment_date", &labs(), &opts).is_err());
    }
}
