//! Subcommands and reports.
//!
//! Reports take their source as a trait object and write to any
//! [`std::io::Write`], so tests drive them with in-memory fakes.

use std::future::Future;

use butler_providers::ProviderError;
use butler_providers::google::ShutdownHandle;
use tracing::info;

use crate::error::ClientResult;

pub mod auth;
pub mod calendar;
pub mod mail;

/// Runs `work` until it completes or `shutdown` fires.
///
/// A shutdown drops `work` mid-flight and returns a cancellation error.
pub async fn interruptible<T>(
    shutdown: &ShutdownHandle,
    work: impl Future<Output = ClientResult<T>>,
) -> ClientResult<T> {
    tokio::select! {
        _ = shutdown.wait() => {
            info!("interrupted, abandoning the report");
            Err(ProviderError::cancelled("interrupted").into())
        }
        result = work => result,
    }
}


#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::Mutex;
    use std::time::Duration;

    use butler_core::{Label, Message, TimeWindow};
    use butler_providers::{
        BoxFuture, CalendarSource, MailSource, ProviderError, ProviderResult, RawEvent,
    };

    struct Stored {
        id: &'static str,
        labels: Vec<&'static str>,
        headers: Vec<(&'static str, &'static str)>,
    }

    /// A mailbox with fixed labels and messages.
    pub struct FakeMailbox {
        labels: Vec<Label>,
        messages: Vec<Stored>,
        failing: Option<&'static str>,
        delay: Duration,
        listed: Mutex<Vec<Vec<String>>>,
    }

    impl FakeMailbox {
        /// `m1` is unread mail from Alice; `m2` is a read CI notice under `Work`.
        pub fn two_messages() -> Self {
            Self {
                labels: vec![
                    Label::new("L_UNREAD", "UNREAD"),
                    Label::new("L_INBOX", "INBOX"),
                    Label::new("L_WORK", "Work"),
                ],
                messages: vec![
                    Stored {
                        id: "m1",
                        labels: vec!["L_UNREAD", "L_INBOX"],
                        headers: vec![
                            ("Subject", "  Quarterly numbers  "),
                            ("From", "Alice <alice@example.com>"),
                        ],
                    },
                    Stored {
                        id: "m2",
                        labels: vec!["L_INBOX", "L_WORK"],
                        headers: vec![
                            ("From", "CI <ci@example.com>"),
                            ("Subject", "Deploy finished"),
                            ("Return-Path", "<bounce@ci.example.com>"),
                        ],
                    },
                ],
                failing: None,
                delay: Duration::ZERO,
                listed: Mutex::new(Vec::new()),
            }
        }

        /// Makes `get_message(id)` fail.
        pub fn failing_on(mut self, id: &'static str) -> Self {
            self.failing = Some(id);
            self
        }

        /// Makes every `get_message` take `delay`.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Label id sets passed to `list_messages`, in call order.
        pub fn listed_with(&self) -> Vec<Vec<String>> {
            self.listed.lock().unwrap().clone()
        }
    }

    impl MailSource for FakeMailbox {
        fn name(&self) -> &str {
            "fake-mail"
        }

        fn list_labels(&self) -> BoxFuture<'_, ProviderResult<Vec<Label>>> {
            Box::pin(async move { Ok(self.labels.clone()) })
        }

        fn list_messages<'a>(
            &'a self,
            label_ids: &'a [String],
            max_results: u32,
        ) -> BoxFuture<'a, ProviderResult<Vec<String>>> {
            Box::pin(async move {
                self.listed.lock().unwrap().push(label_ids.to_vec());
                Ok(self
                    .messages
                    .iter()
                    .filter(|m| label_ids.iter().all(|id| m.labels.contains(&id.as_str())))
                    .take(max_results as usize)
                    .map(|m| m.id.to_string())
                    .collect())
            })
        }

        fn get_message<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<Message>> {
            Box::pin(async move {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                if self.failing == Some(id) {
                    return Err(ProviderError::not_found(format!("message {}", id)));
                }
                let stored = self
                    .messages
                    .iter()
                    .find(|m| m.id == id)
                    .ok_or_else(|| ProviderError::not_found(format!("message {}", id)))?;
                Ok(Message::from_headers(
                    stored.id,
                    stored.labels.iter().map(|l| l.to_string()).collect(),
                    stored.headers.iter().copied(),
                ))
            })
        }
    }

    /// A calendar returning fixed raw events.
    pub struct FakeCalendar {
        events: Option<Vec<RawEvent>>,
        windows: Mutex<Vec<TimeWindow>>,
    }

    impl FakeCalendar {
        pub fn new(events: Vec<RawEvent>) -> Self {
            Self {
                events: Some(events),
                windows: Mutex::new(Vec::new()),
            }
        }

        /// A calendar whose listing fails.
        pub fn failing() -> Self {
            Self {
                events: None,
                windows: Mutex::new(Vec::new()),
            }
        }

        /// The window of the most recent query.
        pub fn last_window(&self) -> Option<TimeWindow> {
            self.windows.lock().unwrap().last().cloned()
        }
    }

    impl CalendarSource for FakeCalendar {
        fn name(&self) -> &str {
            "fake-calendar"
        }

        fn list_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
            Box::pin(async move {
                self.windows.lock().unwrap().push(window);
                self.events
                    .clone()
                    .ok_or_else(|| ProviderError::server("calendar unavailable"))
            })
        }
    }
}
