//! Inclusive calendar date ranges supplied by callers as `YYYY-MM-DD` strings.

use crate::data::DataError;
use chrono::{Days, NaiveDate};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive `[start, end]` date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DataError> {
        if start > end {
            return Err(DataError::InvalidDateRange(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse caller-supplied date strings and check ordering.
    pub fn parse(start: &str, end: &str) -> Result<Self, DataError> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Split into consecutive non-overlapping windows of at most `max_days` days.
    pub fn windows(&self, max_days: i64) -> Vec<DateRange> {
        let max_days = max_days.max(1);
        let mut windows = Vec::new();
        let mut cursor = self.start;
        while cursor <= self.end {
            // past chrono's last representable date the window just ends at `end`
            let window_end = cursor
                .checked_add_days(Days::new((max_days - 1) as u64))
                .map_or(self.end, |d| d.min(self.end));
            windows.push(DateRange {
                start: cursor,
                end: window_end,
            });
            match window_end.succ_opt() {
                Some(next) => cursor = next,
                None => break,
            }
        }
        windows
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| DataError::InvalidDateRange(format!("'{s}' is not a YYYY-MM-DD date: {e}")))
}
