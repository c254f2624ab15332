//! RawEvent to Event conversion pipeline.
//!
//! Parsing happens here so that every source shares the same policy: events
//! whose start is missing or unparseable are dropped and logged, cancelled
//! events are skipped, and the survivors are sorted by start.

use butler_core::{DateParseError, Event, sort_events};
use thiserror::Error;
use tracing::{debug, warn};

use crate::raw_event::RawEvent;

/// Why a raw event could not become an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The API returned neither `dateTime` nor `date` for the start.
    #[error("event has no start")]
    MissingStart,
    /// The start string is not a recognised date.
    #[error(transparent)]
    InvalidStart(#[from] DateParseError),
}

/// Converts a [`RawEvent`] to an [`Event`].
///
/// # Errors
///
/// Returns [`NormalizeError`] if the start is absent or does not parse.
pub fn normalize_event(raw: &RawEvent) -> Result<Event, NormalizeError> {
    let start = raw.start.as_deref().ok_or(NormalizeError::MissingStart)?;
    let event = Event::new(raw.effective_title(), start)?.with_end_raw(raw.end.as_deref());
    Ok(event)
}

/// Normalizes a batch of raw events into a sorted list.
pub fn normalize_events(raw_events: &[RawEvent]) -> Vec<Event> {
    let mut events: Vec<Event> = raw_events
        .iter()
        .filter(|raw| {
            if raw.is_cancelled() {
                debug!("skipping cancelled event {:?}", raw.id);
            }
            !raw.is_cancelled()
        })
        .filter_map(|raw| match normalize_event(raw) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("dropping event {:?} ({:?}): {}", raw.effective_title(), raw.id, e);
                None
            }
        })
        .collect();

    sort_events(&mut events);
    events
}
