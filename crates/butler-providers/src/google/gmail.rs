//! Gmail API client.
//!
//! Only the three calls the mail report needs: list labels, list message
//! ids by label, and fetch one message's headers.

use std::time::Duration;

use butler_core::{Label, Message};
use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderResult;
use crate::provider::{BoxFuture, MailSource};

use super::api::{http_client, send_json};

/// Base URL for Gmail API v1.
const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Largest page the messages.list endpoint returns.
const MAX_PAGE_SIZE: u32 = 500;

/// Headers requested for every message.
const METADATA_HEADERS: [&str; 3] = ["Subject", "From", "Return-Path"];

const PROVIDER: &str = "gmail";

/// Gmail API client.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GmailClient {
    /// Creates a new Gmail client with the given access token.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http_client(timeout)?,
            access_token: access_token.into(),
            base_url: GMAIL_API_BASE.to_string(),
        })
    }

    /// Points the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Lists the mailbox labels.
    pub async fn labels(&self) -> ProviderResult<Vec<Label>> {
        let url = format!("{}/users/me/labels", self.base_url);
        let request = self.http_client.get(&url).bearer_auth(&self.access_token);
        let response: LabelListResponse = send_json(request, PROVIDER, "list labels").await?;

        debug!("fetched {} labels", response.labels.len());
        Ok(response
            .labels
            .into_iter()
            .map(|l| Label::new(l.id, l.name))
            .collect())
    }

    /// Lists up to `max_results` message ids carrying every label in `label_ids`.
    pub async fn message_ids(&self, label_ids: &[String], max_results: u32) -> ProviderResult<Vec<String>> {
        let url = format!("{}/users/me/messages", self.base_url);
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        while (ids.len() as u32) < max_results {
            let page_size = (max_results - ids.len() as u32).min(MAX_PAGE_SIZE);
            let mut query: Vec<(&str, String)> = label_ids
                .iter()
                .map(|id| ("labelIds", id.clone()))
                .collect();
            query.push(("maxResults", page_size.to_string()));
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }

            let request = self
                .http_client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&query);
            let page: MessageListResponse = send_json(request, PROVIDER, "list messages").await?;

            ids.extend(page.messages.into_iter().map(|m| m.id));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        ids.truncate(max_results as usize);
        debug!("listed {} messages", ids.len());
        Ok(ids)
    }

    /// Fetches the headers of one message.
    pub async fn message(&self, id: &str) -> ProviderResult<Message> {
        let url = format!(
            "{}/users/me/messages/{}",
            self.base_url,
            urlencoding::encode(id)
        );
        let mut query = vec![("format", "metadata")];
        query.extend(METADATA_HEADERS.iter().map(|h| ("metadataHeaders", *h)));

        let request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&query);
        let response: MessageResponse = send_json(request, PROVIDER, "get message").await?;

        let headers = response
            .payload
            .map(|p| p.headers)
            .unwrap_or_default();
        Ok(Message::from_headers(
            response.id,
            response.label_ids,
            headers.iter().map(|h| (h.name.as_str(), h.value.as_str())),
        ))
    }
}

impl MailSource for GmailClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn list_labels(&self) -> BoxFuture<'_, ProviderResult<Vec<Label>>> {
        Box::pin(self.labels())
    }

    fn list_messages<'a>(
        &'a self,
        label_ids: &'a [String],
        max_results: u32,
    ) -> BoxFuture<'a, ProviderResult<Vec<String>>> {
        Box::pin(self.message_ids(label_ids, max_results))
    }

    fn get_message<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<Message>> {
        Box::pin(self.message(id))
    }
}

/// Response from the labels.list endpoint.
#[derive(Debug, Deserialize)]
struct LabelListResponse {
    #[serde(default)]
    labels: Vec<ApiLabel>,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    id: String,
    name: String,
}

/// Response from the messages.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<ApiMessageRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessageRef {
    id: String,
}

/// Response from the messages.get endpoint with `format=metadata`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageResponse {
    id: String,
    #[serde(default)]
    label_ids: Vec<String>,
    payload: Option<ApiPayload>,
}

#[derive(Debug, Deserialize)]
struct ApiPayload {
    #[serde(default)]
    headers: Vec<ApiHeader>,
}

#[derive(Debug, Deserialize)]
struct ApiHeader {
    name: String,
    value: String,
}
