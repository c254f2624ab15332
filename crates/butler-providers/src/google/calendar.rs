//! Google Calendar API client.
//!
//! Lists the single-instance events of one calendar over a time window.
//! Dates come back as the API sent them; parsing happens in
//! [`crate::normalize`].

use std::time::Duration;

use butler_core::TimeWindow;
use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderResult;
use crate::provider::{BoxFuture, CalendarSource};
use crate::raw_event::RawEvent;

use super::api::{http_client, send_json};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Calendar queried when none is configured.
pub const DEFAULT_CALENDAR_ID: &str = "primary";

const PROVIDER: &str = "calendar";

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    /// Creates a new client for the `primary` calendar.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http_client(timeout)?,
            access_token: access_token.into(),
            base_url: CALENDAR_API_BASE.to_string(),
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
        })
    }

    /// Builder method to set the calendar to query.
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    /// Points the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the calendar this client queries.
    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Lists the events intersecting `window`, following pagination.
    pub async fn events(&self, window: &TimeWindow) -> ProviderResult<Vec<RawEvent>> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        );
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("timeMin", window.start.to_rfc3339()),
                    ("timeMax", window.end.to_rfc3339()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                ]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: EventListResponse = send_json(request, PROVIDER, "list events").await?;
            events.extend(page.items.into_iter().map(ApiEvent::into_raw));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "fetched {} events from calendar {}",
            events.len(),
            self.calendar_id
        );
        Ok(events)
    }
}

impl CalendarSource for GoogleCalendarClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn list_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move { self.events(&window).await })
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    status: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
}

/// Either `dateTime` (timed) or `date` (all day) is set.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date_time: Option<String>,
    date: Option<String>,
}

impl ApiEventTime {
    fn into_raw(self) -> Option<String> {
        self.date_time.or(self.date)
    }
}

impl ApiEvent {
    fn into_raw(self) -> RawEvent {
        RawEvent {
            id: self.id,
            summary: self.summary,
            start: self.start.into_raw(),
            end: self.end.into_raw(),
            status: self.status,
        }
    }
}
