//! Core types: labels, messages, events, time windows, report formatting

pub mod event;
pub mod format;
pub mod time;
pub mod tracing;

pub use event::{
    Event, Label, Message, parse_label_list, resolve_label_ids, sort_events,
    sort_events_in,
};
pub use format::{
    FormattedBlock, NO_EVENTS_TEXT, NO_MESSAGES_TEXT, ReportFormatter, ReportOptions, TodayMatch,
    render,
};
pub use time::{DateParseError, EventTime, TimeWindow, parse_date};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
