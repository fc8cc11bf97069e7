//! Inclusive calendar-date filtering over derived sessions.

use crate::aggregations::Session;
use chrono::NaiveDate;
use desk_core::error::DeskError;
use serde::{Deserialize, Serialize};

/// Optional lower and upper calendar-date bounds, both inclusive.
///
/// `start` covers its whole day from midnight and `end` covers its whole day
/// to the last instant, so with day-granular sessions both reduce to plain
/// date comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Parse `YYYY-MM-DD` bounds. Blank strings mean "unbounded".
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, DeskError> {
        Ok(Self {
            start: parse_bound(start)?,
            end: parse_bound(end)?,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// True when `start` falls after `end`; such a range matches nothing.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        !self.is_inverted()
            && self.start.map_or(true, |s| date >= s)
            && self.end.map_or(true, |e| date <= e)
    }

    /// Keep the sessions inside this range, preserving their order.
    pub fn apply(&self, sessions: &[Session]) -> Vec<Session> {
        if self.is_inverted() {
            return Vec::new();
        }
        sessions
            .iter()
            .filter(|s| self.contains(s.date))
            .cloned()
            .collect()
    }
}

fn parse_bound(raw: Option<&str>) -> Result<Option<NaiveDate>, DeskError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| DeskError::InvalidInput(format!("invalid date '{}': {}", s, e))),
    }
}

/// Narrow sessions to `[start, end]`. An absent bound is unbounded on that
/// side; `start` after `end` yields nothing.
pub fn filter_by_range(
    sessions: &[Session],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<Session> {
    DateRange::new(start, end).apply(sessions)
}
