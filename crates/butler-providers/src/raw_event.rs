//! Provider-agnostic raw event data.
//!
//! A [`RawEvent`] carries the event fields exactly as the calendar API
//! returned them. Dates stay unparsed until [`crate::normalize`] turns them
//! into [`butler_core::Event`]s.

use serde::{Deserialize, Serialize};

/// An event as returned by a calendar source, before date parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Provider event id, if any.
    pub id: Option<String>,
    /// Event title.
    pub summary: Option<String>,
    /// Start as sent by the API: an RFC 3339 `dateTime` or a bare `date`.
    pub start: Option<String>,
    /// End as sent by the API.
    pub end: Option<String>,
    /// Event status (`confirmed`, `tentative`, `cancelled`).
    pub status: Option<String>,
}

impl RawEvent {
    /// Creates a raw event with a summary and a start string.
    pub fn new(summary: impl Into<String>, start: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            start: Some(start.into()),
            ..Default::default()
        }
    }

    /// Builder method to set the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder method to set the end string.
    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Returns the title, or an empty string when there is none.
    pub fn effective_title(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }

    /// Returns true if this event was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let raw = RawEvent::new("Standup", "2025-02-05T10:00:00Z")
            .with_id("ev1")
            .with_end("2025-02-05T10:30:00Z")
            .with_status("confirmed");

        assert_eq!(raw.id.as_deref(), Some("ev1"));
        assert_eq!(raw.effective_title(), "Standup");
        assert_eq!(raw.end.as_deref(), Some("2025-02-05T10:30:00Z"));
        assert!(!raw.is_cancelled());
    }

    #[test]
    fn missing_title_is_empty() {
        let raw = RawEvent::default();
        assert_eq!(raw.effective_title(), "");
        assert!(raw.start.is_none());
    }

    #[test]
    fn cancelled_status() {
        let raw = RawEvent::new("x", "2025-02-05").with_status("cancelled");
        assert!(raw.is_cancelled());
    }
}
