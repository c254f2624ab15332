//! Source traits for mail and calendar backends.
//!
//! The reporters only see [`MailSource`] and [`CalendarSource`]; the Google
//! clients implement them over HTTP and tests implement them in memory.

use std::future::Future;
use std::pin::Pin;

use butler_core::{Label, Message, TimeWindow};

use crate::error::ProviderResult;
use crate::raw_event::RawEvent;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe so reporters can take
/// `&dyn MailSource` / `&dyn CalendarSource`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A mailbox that can be listed by label.
pub trait MailSource: Send + Sync {
    /// Returns the name of this source (e.g. "gmail").
    fn name(&self) -> &str;

    /// Lists every label of the mailbox.
    fn list_labels(&self) -> BoxFuture<'_, ProviderResult<Vec<Label>>>;

    /// Lists the ids of messages carrying all of `label_ids`, at most
    /// `max_results` of them.
    fn list_messages<'a>(
        &'a self,
        label_ids: &'a [String],
        max_results: u32,
    ) -> BoxFuture<'a, ProviderResult<Vec<String>>>;

    /// Fetches one message's headers.
    fn get_message<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<Message>>;
}

/// A calendar that can be queried over a time window.
pub trait CalendarSource: Send + Sync {
    /// Returns the name of this source (e.g. "calendar").
    fn name(&self) -> &str;

    /// Lists the events that intersect `window`, expanded to single
    /// instances. Dates are returned unparsed.
    fn list_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use chrono::{TimeZone, Utc};

    struct Unavailable;

    impl MailSource for Unavailable {
        fn name(&self) -> &str {
            "unavailable"
        }

        fn list_labels(&self) -> BoxFuture<'_, ProviderResult<Vec<Label>>> {
            Box::pin(async { Err(ProviderError::network("offline")) })
        }

        fn list_messages<'a>(
            &'a self,
            _label_ids: &'a [String],
            _max_results: u32,
        ) -> BoxFuture<'a, ProviderResult<Vec<String>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn get_message<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<Message>> {
            Box::pin(async move { Err(ProviderError::not_found(format!("message {}", id))) })
        }
    }

    impl CalendarSource for Unavailable {
        fn name(&self) -> &str {
            "unavailable"
        }

        fn list_events(&self, _window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
            Box::pin(async { Ok(vec![RawEvent::new("only", "2025-02-05")]) })
        }
    }

    #[tokio::test]
    async fn mail_source_is_object_safe() {
        let source: &dyn MailSource = &Unavailable;
        assert_eq!(source.name(), "unavailable");
        assert!(source.list_labels().await.is_err());
        assert!(source.list_messages(&[], 10).await.unwrap().is_empty());

        let err = source.get_message("m1").await.unwrap_err();
        assert!(err.message().contains("m1"));
    }

    #[tokio::test]
    async fn calendar_source_is_object_safe() {
        let source: &dyn CalendarSource = &Unavailable;
        let window = TimeWindow::until_end_of_tomorrow(
            &Utc.with_ymd_and_hms(2025, 2, 5, 10, 0, 0).unwrap(),
        );
        let events = source.list_events(window).await.unwrap();
        assert_eq!(events.len(), 1);
    }
}
