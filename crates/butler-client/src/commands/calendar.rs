//! Calendar report.

use std::fmt::Display;
use std::io::Write;

use butler_core::{NO_EVENTS_TEXT, ReportFormatter, TimeWindow, render, sort_events_in};
use butler_providers::{CalendarSource, normalize_events};
use chrono::{DateTime, TimeZone};
use tracing::debug;

use crate::error::ClientResult;

/// Prints the events between `now` and the end of tomorrow, earliest first.
///
/// All-day events are ordered from local midnight in the timezone of `now`.
/// Events whose start cannot be parsed are dropped. Returns the number of
/// events shown.
pub async fn report<Tz>(
    source: &dyn CalendarSource,
    now: &DateTime<Tz>,
    formatter: &ReportFormatter,
    out: &mut dyn Write,
) -> ClientResult<usize>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let window = TimeWindow::until_end_of_tomorrow(now);
    debug!("listing events from {} to {}", window.start, window.end);

    let raw = source.list_events(window).await?;
    let mut events = normalize_events(&raw);
    sort_events_in(&mut events, &now.timezone());
    debug!("{} of {} events kept", events.len(), raw.len());

    let blocks = formatter.format_calendar_at(&events, now);
    out.write_all(render(&blocks, NO_EVENTS_TEXT).as_bytes())?;
    out.flush()?;
    Ok(events.len())
}
