//! Mail and calendar sources for butler.
//!
//! This crate sits between the remote APIs and the reports:
//!
//! - [`MailSource`] / [`CalendarSource`] - The traits the reporters consume
//! - [`RawEvent`] - Calendar events with dates still unparsed
//! - [`normalize_events`] - Pipeline from raw events to sorted [`butler_core::Event`]s
//! - [`ProviderError`] - Error type for every provider operation
//! - [`google`] - OAuth authorization, token storage, Gmail and Calendar clients
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │   Gmail API     │    │  Calendar API   │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌──────────────────────┐
//! │   GmailClient   │    │ GoogleCalendarClient │
//! └────────┬────────┘    └──────────┬───────────┘
//!          │ MailSource             │ CalendarSource
//!          ▼                        ▼
//!   Label / Message             RawEvent
//!                                   │
//!                                   ▼ normalize_events()
//!                             sorted Event list
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod normalize;
pub mod provider;
pub mod raw_event;

#[cfg(all(test, feature = "google"))]
mod test_support;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use normalize::{NormalizeError, normalize_event, normalize_events};
pub use provider::{BoxFuture, CalendarSource, MailSource};
pub use raw_event::RawEvent;
