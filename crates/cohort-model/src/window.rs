//! Day-offset windows relative to an anchor date.
//!
//! A window is a pair of day offsets `(lo, hi)` with `lo <= hi`. Offsets may be
//! negative (lookback), zero, or positive (lookahead). A feature row qualifies
//! for an anchor when its date falls in `[anchor + lo, anchor + hi]`.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CohortError, Result};

/// An inclusive day-offset window relative to an anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(i64, i64)", into = "(i64, i64)")]
pub struct DayWindow {
    lo: i64,
    hi: i64,
}

impl DayWindow {
    pub fn new(lo: i64, hi: i64) -> Result<Self> {
        if lo > hi {
            return Err(CohortError::Config(format!(
                "day window lower bound {lo} exceeds upper bound {hi}"
            )));
        }
        Ok(Self { lo, hi })
    }

    /// A single-sided window looking back `days` days, anchor inclusive.
    pub fn lookback(days: i64) -> Self {
        Self { lo: -days, hi: 0 }
    }

    /// A forward window `(anchor, anchor + days]`, exclusive of the anchor
    /// itself so labels never read same-day baseline measurements.
    pub fn lookahead(days: i64) -> Self {
        Self { lo: 1, hi: days }
    }

    pub fn lo(&self) -> i64 {
        self.lo
    }

    pub fn hi(&self) -> i64 {
        self.hi
    }

    /// Resolve the window to concrete inclusive date bounds for an anchor.
    pub fn bounds(&self, anchor: NaiveDate) -> (NaiveDate, NaiveDate) {
        (offset_date(anchor, self.lo), offset_date(anchor, self.hi))
    }
}

impl TryFrom<(i64, i64)> for DayWindow {
    type Error = CohortError;

    fn try_from(value: (i64, i64)) -> Result<Self> {
        Self::new(value.0, value.1)
    }
}

impl From<DayWindow> for (i64, i64) {
    fn from(window: DayWindow) -> Self {
        (window.lo, window.hi)
    }
}

/// Shift a date by a signed number of days, saturating at the calendar limits.
pub fn offset_date(date: NaiveDate, days: i64) -> NaiveDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert!(DayWindow::new(1, -1).is_err());
        assert!(DayWindow::new(-7, 0).is_ok());
        assert!(DayWindow::new(0, 0).is_ok());
    }

    #[test]
    fn lookback_bounds() {
        let window = DayWindow::lookback(7);
        let (from, until) = window.bounds(date(2024, 3, 10));
        assert_eq!(from, date(2024, 3, 3));
        assert_eq!(until, date(2024, 3, 10));
    }

    #[test]
    fn lookahead_excludes_anchor() {
        let window = DayWindow::lookahead(30);
        let (from, until) = window.bounds(date(2024, 3, 10));
        assert_eq!(from, date(2024, 3, 11));
        assert_eq!(until, date(2024, 4, 9));
    }

    #[test]
    fn deserializes_from_pair() {
        let window: DayWindow = serde_json::from_str("[-30, 0]").unwrap();
        assert_eq!(window.lo(), -30);
        assert_eq!(window.hi(), 0);
        assert!(serde_json::from_str::<DayWindow>("[5, -5]").is_err());
    }
}
