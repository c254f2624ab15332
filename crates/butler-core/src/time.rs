//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start times
//! (which may be either a specific datetime or an all-day date),
//! [`parse_date`] for decoding the strings the Calendar API hands back, and
//! [`TimeWindow`] for defining query ranges.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Layout of a bare all-day date (`YYYY-MM-DD`).
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A date string that is neither RFC 3339 nor `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised date {input:?}: expected RFC 3339 or YYYY-MM-DD")]
pub struct DateParseError {
    /// The rejected input.
    pub input: String,
}

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (with timezone, stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// For all-day events, returns midnight UTC on that date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// Returns the instant this event time starts at as seen in `tz`.
    ///
    /// All-day dates start at local midnight in `tz`; midnights skipped by a
    /// DST jump fall back to midnight UTC.
    pub fn start_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => tz
                .from_local_datetime(&date.and_time(NaiveTime::MIN))
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| self.to_utc_datetime()),
        }
    }

    /// Returns the calendar date of this event time as seen in `tz`.
    ///
    /// All-day dates are floating and are returned unchanged.
    pub fn local_date<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.with_timezone(tz).date_naive(),
            Self::AllDay(date) => *date,
        }
    }

    /// Returns the weekday of this event time as seen in `tz`.
    pub fn local_weekday<Tz: TimeZone>(&self, tz: &Tz) -> Weekday {
        self.local_date(tz).weekday()
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// Parses an event date as returned by the Calendar API.
///
/// Timed events carry an RFC 3339 timestamp, all-day events a bare
/// `YYYY-MM-DD` date. Anything else is a [`DateParseError`].
pub fn parse_date(input: &str) -> Result<EventTime, DateParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(EventTime::DateTime(dt.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map(EventTime::AllDay)
        .map_err(|_| DateParseError {
            input: input.to_string(),
        })
}

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates the reporting window: from `now` until tomorrow 23:59:59 in
    /// the timezone of `now`.
    ///
    /// If tomorrow's 23:59:59 does not exist locally, the window falls back
    /// to 48 hours.
    pub fn until_end_of_tomorrow<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let start = now.with_timezone(&Utc);
        let end = now
            .date_naive()
            .succ_opt()
            .and_then(|tomorrow| tomorrow.and_hms_opt(23, 59, 59))
            .and_then(|naive| tz.from_local_datetime(&naive).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| start + Duration::hours(48));
        Self { start, end }
    }

}
