//! Shared HTTP plumbing for the Gmail and Calendar clients.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::{ProviderError, ProviderResult};

/// Builds the HTTP client used by the API clients.
pub(crate) fn http_client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(format!("butler/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))
}

/// Sends `request` and decodes a JSON body, mapping HTTP failures to
/// [`ProviderError`] codes.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    provider: &str,
    what: &str,
) -> ProviderResult<T> {
    let response = request.send().await.map_err(|e| {
        let err = if e.is_timeout() {
            ProviderError::network(format!("{}: request timeout", what))
        } else if e.is_connect() {
            ProviderError::network(format!("{}: connection failed", what))
        } else {
            ProviderError::network(format!("{}: request failed", what))
        };
        err.with_provider(provider).with_source(e)
    })?;

    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(ProviderError::rate_limited(format!(
            "{}: rate limit exceeded{}",
            what,
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        ))
        .with_provider(provider));
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(
            ProviderError::authentication(format!("{}: access token expired or invalid", what))
                .with_provider(provider),
        );
    }

    if status == reqwest::StatusCode::FORBIDDEN {
        let body = response.text().await.unwrap_or_default();
        return Err(
            ProviderError::authorization(format!("{}: access denied: {}", what, body))
                .with_provider(provider),
        );
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProviderError::not_found(format!("{}: not found", what)).with_provider(provider));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(
            ProviderError::server(format!("{}: API error ({}): {}", what, status, body))
                .with_provider(provider),
        );
    }

    let body = response.text().await.map_err(|e| {
        ProviderError::network(format!("{}: failed to read response", what))
            .with_provider(provider)
            .with_source(e)
    })?;

    serde_json::from_str(&body).map_err(|e| {
        ProviderError::invalid_response(format!("{}: failed to parse response", what))
            .with_provider(provider)
            .with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorCode;
    use crate::test_support::serve_fixed;

    #[derive(Debug, serde::Deserialize)]
    struct Payload {
        value: u32,
    }

    async fn fetch(status: &'static str, body: &'static str) -> ProviderResult<Payload> {
        let server = serve_fixed(status, body).await;
        let client = http_client(Duration::from_secs(5)).unwrap();
        send_json(client.get(&server.base_url), "test", "fetch").await
    }

    #[tokio::test]
    async fn decodes_success() {
        let payload = fetch("200 OK", r#"{"value":7}"#).await.unwrap();
        assert_eq!(payload.value, 7);
    }

    #[tokio::test]
    async fn maps_status_codes() {
        let cases = [
            ("401 Unauthorized", ProviderErrorCode::AuthenticationFailed),
            ("403 Forbidden", ProviderErrorCode::AuthorizationFailed),
            ("404 Not Found", ProviderErrorCode::NotFound),
            ("429 Too Many Requests", ProviderErrorCode::RateLimited),
            ("500 Internal Server Error", ProviderErrorCode::ServerError),
        ];
        for (status, code) in cases {
            let err = fetch(status, "{}").await.unwrap_err();
            assert_eq!(err.code(), code, "status {}", status);
            assert_eq!(err.provider(), Some("test"));
        }
    }

    #[tokio::test]
    async fn bad_json_is_invalid_response() {
        let err = fetch("200 OK", "not json").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = http_client(Duration::from_secs(5)).unwrap();
        let err = send_json::<Payload>(client.get(format!("http://{}", addr)), "test", "fetch")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
    }
}
