//! Terminal report formatting for mail and calendar output.
//!
//! Each message or event becomes one [`FormattedBlock`]; [`render`] joins the
//! blocks into the text printed on stdout.
//!
//! # Example
//!
//! ```rust
//! use butler_core::format::{render, ReportFormatter, ReportOptions};
//! use butler_core::Message;
//!
//! let formatter = ReportFormatter::new(ReportOptions { color: false, ..Default::default() });
//! let message = Message::from_headers("m1", vec![], [("Subject", " Hi "), ("From", "bob")]);
//! let text = render(&formatter.format_mail(&[message]), "No messages found.");
//! assert!(text.contains("Subject: Hi"));
//! ```

use std::fmt::Display;

use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};

use crate::event::{Event, Message};
use crate::time::EventTime;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Text printed when there are no messages.
pub const NO_MESSAGES_TEXT: &str = "No messages found.";

/// Text printed when there are no events.
pub const NO_EVENTS_TEXT: &str = "No events found.";

/// How an event is recognised as happening "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodayMatch {
    /// Same local calendar date as now.
    #[default]
    Date,
    /// Same weekday name as now, regardless of the week.
    Weekday,
}

/// Configuration options for report formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Whether to emit ANSI bold sequences.
    pub color: bool,
    /// How "today" is detected for calendar events.
    pub today_match: TodayMatch,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            color: true,
            today_match: TodayMatch::Date,
        }
    }
}

/// One message or event, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedBlock {
    /// The block's lines joined with `\n`, without trailing newline.
    pub text: String,
    /// Whether the block is emphasised as happening today.
    pub highlighted: bool,
}

/// Output formatter for mail and calendar reports.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Creates a new ReportFormatter with the given options.
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Creates a new ReportFormatter with default options.
    pub fn with_defaults() -> Self {
        Self::new(ReportOptions::default())
    }

    /// Formats messages: a bold trimmed subject line followed by the sender.
    pub fn format_mail(&self, messages: &[Message]) -> Vec<FormattedBlock> {
        messages
            .iter()
            .map(|m| FormattedBlock {
                text: format!(
                    "{}\nSender: {}",
                    self.bold(&format!("Subject: {}", m.subject.trim())),
                    m.sender
                ),
                highlighted: false,
            })
            .collect()
    }

    /// Formats events relative to a specific "now".
    ///
    /// Times are shown in the timezone of `now`. This variant is useful for
    /// testing with a fixed time.
    pub fn format_calendar_at<Tz>(&self, events: &[Event], now: &DateTime<Tz>) -> Vec<FormattedBlock>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        events
            .iter()
            .map(|event| self.format_event(event, now))
            .collect()
    }

    fn format_event<Tz>(&self, event: &Event, now: &DateTime<Tz>) -> FormattedBlock
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let tz = now.timezone();
        let today = self.is_today(&event.start, now);
        let day = if today {
            "Today".to_string()
        } else {
            event.start.local_date(&tz).format("%A").to_string()
        };

        let when = match (&event.start, &event.end) {
            (EventTime::DateTime(start), Some(end)) => format!(
                "{} {} - {}",
                day,
                start.with_timezone(&tz).format("%H:%M"),
                end.with_timezone(&tz).format("%H:%M")
            ),
            (EventTime::DateTime(start), None) => {
                format!("{} {}", day, start.with_timezone(&tz).format("%H:%M"))
            }
            (EventTime::AllDay(_), _) => format!("{} all day", day),
        };

        let header = format!("***** {} *****", when);
        let summary = event.summary.trim();
        let text = if today {
            format!("{}\n{}", self.bold(&header), self.bold(summary))
        } else {
            format!("{}\n{}", header, summary)
        };

        FormattedBlock {
            text,
            highlighted: today,
        }
    }

    fn is_today<Tz: TimeZone>(&self, start: &EventTime, now: &DateTime<Tz>) -> bool {
        let tz = now.timezone();
        match self.options.today_match {
            TodayMatch::Date => start.local_date(&tz) == now.date_naive(),
            TodayMatch::Weekday => start.local_weekday(&tz) == now.weekday(),
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.options.color {
            format!("{}{}{}", BOLD, text, RESET)
        } else {
            text.to_string()
        }
    }
}

/// Joins blocks into the final report.
///
/// The report opens with a blank line and every block is followed by one.
/// Without blocks, `empty_text` is printed instead.
pub fn render(blocks: &[FormattedBlock], empty_text: &str) -> String {
    if blocks.is_empty() {
        return format!("{}\n", empty_text);
    }
    let mut out = String::from("\n");
    for block in blocks {
        out.push_str(&block.text);
        out.push_str("\n\n");
    }
    out
}
