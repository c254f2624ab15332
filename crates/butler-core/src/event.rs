//! Mail and calendar types shared by the providers and the reports.
//!
//! - [`Label`] and [`resolve_label_ids`]: mapping user-facing label names to ids
//! - [`Message`]: subject and sender assembled from message headers
//! - [`Event`], [`sort_events`] and [`sort_events_in`]: calendar entries
//!   ordered by start time

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{DateParseError, EventTime, parse_date};

/// A mailbox label as listed by the mail provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Provider identifier (e.g. `Label_12` or `UNREAD`).
    pub id: String,
    /// Display name, matched case-sensitively.
    pub name: String,
}

impl Label {
    /// Creates a new label.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Splits a comma-separated label list, as given on the command line.
///
/// Surrounding whitespace is trimmed and empty entries are skipped.
pub fn parse_label_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Resolves label names to label ids.
///
/// Each name is looked up independently, in input order, with an exact
/// case-sensitive match; the first matching label wins. Names that match no
/// label are dropped.
pub fn resolve_label_ids<S: AsRef<str>>(names: &[S], labels: &[Label]) -> Vec<String> {
    names
        .iter()
        .filter_map(|name| {
            labels
                .iter()
                .find(|label| label.name == name.as_ref())
                .map(|label| label.id.clone())
        })
        .collect()
}

/// A mail message reduced to what the report shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Provider message id.
    pub id: String,
    /// Label ids attached to the message.
    pub labels: Vec<String>,
    /// Raw `Subject` header value.
    pub subject: String,
    /// Sender as derived from `From` or `Return-Path`.
    pub sender: String,
}

impl Message {
    /// Builds a message from its header list.
    ///
    /// `Subject` sets the subject. `From` sets the sender verbatim;
    /// `Return-Path` sets it to the domain part of the address. When a header
    /// name repeats, the last occurrence wins, and between `From` and
    /// `Return-Path` whichever comes last wins.
    pub fn from_headers<'a, I>(id: impl Into<String>, labels: Vec<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut subject = String::new();
        let mut sender = String::new();

        for (name, value) in headers {
            match name {
                "Subject" => subject = value.to_string(),
                "From" => sender = value.to_string(),
                "Return-Path" => {
                    if let Some(domain) = return_path_domain(value) {
                        sender = domain;
                    }
                }
                _ => {}
            }
        }

        Self {
            id: id.into(),
            labels,
            subject,
            sender,
        }
    }
}

/// `<bounce@mail.example.com>` -> `mail.example.com`.
fn return_path_domain(value: &str) -> Option<String> {
    let (_, domain) = value.split_once('@')?;
    Some(domain.replace('>', ""))
}

/// A calendar event reduced to what the report shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event title.
    pub summary: String,
    /// Start exactly as the provider returned it.
    pub start_raw: String,
    /// Parsed start.
    pub start: EventTime,
    /// End of a timed event. `None` for all-day events.
    pub end: Option<DateTime<Utc>>,
}

impl Event {
    /// Creates an event from its raw start string.
    ///
    /// # Errors
    ///
    /// Returns [`DateParseError`] if `start_raw` is neither RFC 3339 nor a
    /// bare date.
    pub fn new(
        summary: impl Into<String>,
        start_raw: impl Into<String>,
    ) -> Result<Self, DateParseError> {
        let start_raw = start_raw.into();
        let start = parse_date(&start_raw)?;
        Ok(Self {
            summary: summary.into(),
            start_raw,
            start,
            end: None,
        })
    }

    /// Sets the end from a raw RFC 3339 string.
    ///
    /// Anything that is not a timestamp leaves the event without an end,
    /// which renders as all day.
    pub fn with_end_raw(mut self, end_raw: Option<&str>) -> Self {
        self.end = end_raw
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));
        self
    }
}

/// Sorts events by ascending start; events with equal starts keep their order.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| a.start.cmp(&b.start));
}

/// Like [`sort_events`], with all-day events placed at local midnight in `tz`.
pub fn sort_events_in<Tz: TimeZone>(events: &mut [Event], tz: &Tz) {
    events.sort_by_key(|event| event.start.start_in(tz));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn labels() -> Vec<Label> {
        vec![
            Label::new("L1", "UNREAD"),
            Label::new("L2", "Work"),
            Label::new("L3", "Work"),
        ]
    }

    mod label_resolution {
        use super::*;

        #[test]
        fn unmatched_names_are_dropped() {
            let ids = resolve_label_ids(&["UNREAD", "BOGUS"], &[Label::new("L1", "UNREAD")]);
            assert_eq!(ids, vec!["L1".to_string()]);
        }

        #[test]
        fn keeps_input_order() {
            let ids = resolve_label_ids(&["Work", "UNREAD"], &labels());
            assert_eq!(ids, vec!["L2".to_string(), "L1".to_string()]);
        }

        #[test]
        fn first_match_wins() {
            let ids = resolve_label_ids(&["Work"], &labels());
            assert_eq!(ids, vec!["L2".to_string()]);
        }

        #[test]
        fn match_is_case_sensitive() {
            let ids = resolve_label_ids(&["unread", "work"], &labels());
            assert!(ids.is_empty());
        }

        #[test]
        fn duplicates_resolve_independently() {
            let ids = resolve_label_ids(&["UNREAD", "UNREAD"], &labels());
            assert_eq!(ids, vec!["L1".to_string(), "L1".to_string()]);
        }

        #[test]
        fn parse_list() {
            assert_eq!(parse_label_list("UNREAD"), vec!["UNREAD"]);
            assert_eq!(parse_label_list("UNREAD, Work ,,"), vec!["UNREAD", "Work"]);
            assert!(parse_label_list("").is_empty());
        }
    }

    mod headers {
        use super::*;

        #[test]
        fn subject_and_from() {
            let msg = Message::from_headers(
                "m1",
                vec!["UNREAD".to_string()],
                [("Subject", "  Hello  "), ("From", "Alice <alice@example.com>")],
            );
            assert_eq!(msg.id, "m1");
            assert_eq!(msg.subject, "  Hello  ");
            assert_eq!(msg.sender, "Alice <alice@example.com>");
            assert_eq!(msg.labels, vec!["UNREAD".to_string()]);
        }

        #[test]
        fn return_path_yields_domain() {
            let msg = Message::from_headers(
                "m1",
                vec![],
                [("Return-Path", "<bounce@mail.example.com>")],
            );
            assert_eq!(msg.sender, "mail.example.com");
        }

        #[test]
        fn later_sender_header_wins() {
            let msg = Message::from_headers(
                "m1",
                vec![],
                [
                    ("Return-Path", "<bounce@mail.example.com>"),
                    ("From", "Alice <alice@example.com>"),
                ],
            );
            assert_eq!(msg.sender, "Alice <alice@example.com>");

            let msg = Message::from_headers(
                "m1",
                vec![],
                [
                    ("From", "Alice <alice@example.com>"),
                    ("Return-Path", "<bounce@mail.example.com>"),
                ],
            );
            assert_eq!(msg.sender, "mail.example.com");
        }

        #[test]
        fn repeated_subject_last_wins() {
            let msg =
                Message::from_headers("m1", vec![], [("Subject", "first"), ("Subject", "second")]);
            assert_eq!(msg.subject, "second");
        }

        #[test]
        fn return_path_without_at_is_ignored() {
            let msg = Message::from_headers(
                "m1",
                vec![],
                [("From", "alice@example.com"), ("Return-Path", "<>")],
            );
            assert_eq!(msg.sender, "alice@example.com");
        }

        #[test]
        fn missing_headers_are_empty() {
            let msg = Message::from_headers("m1", vec![], [("X-Mailer", "mutt")]);
            assert!(msg.subject.is_empty());
            assert!(msg.sender.is_empty());
        }
    }

    mod events {
        use super::*;

        fn event(summary: &str, start: &str) -> Event {
            Event::new(summary, start).unwrap()
        }

        #[test]
        fn new_parses_start() {
            let ev = event("Standup", "2025-02-05T10:00:00Z");
            assert_eq!(
                ev.start.as_datetime(),
                Some(&Utc.with_ymd_and_hms(2025, 2, 5, 10, 0, 0).unwrap())
            );
            assert_eq!(ev.start_raw, "2025-02-05T10:00:00Z");
        }

        #[test]
        fn new_rejects_bad_start() {
            assert!(Event::new("Broken", "next tuesday").is_err());
        }

        #[test]
        fn end_must_be_timestamp() {
            let timed = event("a", "2025-02-05T10:00:00Z").with_end_raw(Some("2025-02-05T11:00:00Z"));
            assert!(timed.end.is_some());

            let all_day = event("b", "2025-02-05").with_end_raw(Some("2025-02-06"));
            assert!(all_day.end.is_none());
        }

        #[test]
        fn sort_is_ascending() {
            let mut events = vec![
                event("c", "2025-02-05T12:00:00Z"),
                event("a", "2025-02-05T08:00:00Z"),
                event("b", "2025-02-05T10:00:00+00:00"),
            ];
            sort_events(&mut events);
            let order: Vec<_> = events.iter().map(|e| e.summary.as_str()).collect();
            assert_eq!(order, ["a", "b", "c"]);
        }

        #[test]
        fn sort_is_stable_for_ties() {
            let mut events = vec![
                event("late", "2025-02-05T12:00:00Z"),
                event("first", "2025-02-05T10:00:00Z"),
                event("second", "2025-02-05T11:00:00+01:00"),
                event("third", "2025-02-05T10:00:00Z"),
            ];
            sort_events(&mut events);
            let order: Vec<_> = events.iter().map(|e| e.summary.as_str()).collect();
            assert_eq!(order, ["first", "second", "third", "late"]);
        }

        #[test]
        fn all_day_sorts_at_midnight_utc() {
            let mut events = vec![
                event("meeting", "2025-02-05T09:00:00Z"),
                event("holiday", "2025-02-05"),
            ];
            sort_events(&mut events);
            assert_eq!(events[0].summary, "holiday");
        }

        #[test]
        fn all_day_sorts_at_local_midnight_west_of_utc() {
            let pacific = chrono::FixedOffset::west_opt(8 * 3600).unwrap();
            let mut events = vec![
                event("offsite", "2025-02-06"),
                event("dinner", "2025-02-05T19:00:00-08:00"),
                event("breakfast", "2025-02-06T07:30:00-08:00"),
            ];
            sort_events_in(&mut events, &pacific);
            let order: Vec<_> = events.iter().map(|e| e.summary.as_str()).collect();
            assert_eq!(order, ["dinner", "offsite", "breakfast"]);
        }
    }
}
