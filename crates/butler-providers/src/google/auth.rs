//! Obtaining an authorized client.
//!
//! [`GoogleAuth`] ties the token store to the authorization flow: a cached
//! token is reused, an expired one is refreshed, and anything else goes
//! through the interactive flow. Every new or refreshed token is persisted
//! before it is handed out.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{ProviderErrorCode, ProviderResult};

use super::calendar::GoogleCalendarClient;
use super::config::AuthConfig;
use super::gmail::GmailClient;
use super::oauth::{AuthorizationFlow, OAuthClient};
use super::shutdown::ShutdownHandle;
use super::tokens::{TokenInfo, TokenStorage};

/// Token lifecycle for one configuration.
#[derive(Debug)]
pub struct GoogleAuth {
    config: AuthConfig,
    oauth: OAuthClient,
    storage: TokenStorage,
    shutdown: ShutdownHandle,
}

impl GoogleAuth {
    /// Creates the authenticator. `shutdown` aborts the interactive flow.
    pub fn new(config: AuthConfig, shutdown: ShutdownHandle) -> ProviderResult<Self> {
        config.validate()?;

        let oauth = OAuthClient::new(
            config.credentials.clone(),
            config.token_url.clone(),
            config.http_timeout,
        )?;
        let storage = TokenStorage::new(&config.token_path);

        Ok(Self {
            config,
            oauth,
            storage,
            shutdown,
        })
    }

    /// Returns the token store.
    pub fn storage(&self) -> &TokenStorage {
        &self.storage
    }

    /// Loads the cached token. An unreadable or corrupt file counts as none.
    pub fn cached_token(&self) -> Option<TokenInfo> {
        match self.storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("ignoring unusable token file: {}", e);
                None
            }
        }
    }

    /// Returns an authorized client, authorizing interactively only when the
    /// cached token cannot be used or refreshed.
    pub async fn authenticate(&self) -> ProviderResult<AuthorizedClient> {
        if let Some(token) = self.cached_token() {
            if !token.has_scopes(&self.config.scopes) {
                info!("cached token lacks required scopes, re-authorizing");
            } else if !token.is_expired() {
                debug!("using cached token");
                return Ok(self.client(token));
            } else {
                match self.oauth.refresh(&token).await {
                    Ok(refreshed) => {
                        self.storage.save(&refreshed)?;
                        return Ok(self.client(refreshed));
                    }
                    Err(e) if e.code() == ProviderErrorCode::AuthenticationFailed => {
                        warn!("token refresh failed, re-authorizing: {}", e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        self.reauthorize().await
    }

    /// Runs the authorization flow regardless of any cached token.
    ///
    /// The stored token is only replaced once the flow succeeds.
    pub async fn reauthorize(&self) -> ProviderResult<AuthorizedClient> {
        let flow = AuthorizationFlow::new(
            self.config.clone(),
            self.oauth.clone(),
            self.shutdown.clone(),
        );
        let token = flow.run().await?;
        self.storage.save(&token)?;
        Ok(self.client(token))
    }

    fn client(&self, token: TokenInfo) -> AuthorizedClient {
        AuthorizedClient {
            token,
            http_timeout: self.config.http_timeout,
        }
    }
}

/// A valid token, ready to build API clients from.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    token: TokenInfo,
    http_timeout: Duration,
}

impl AuthorizedClient {
    /// Returns the token in use.
    pub fn token(&self) -> &TokenInfo {
        &self.token
    }

    /// Builds a Gmail client.
    pub fn gmail(&self) -> ProviderResult<GmailClient> {
        GmailClient::new(&self.token.access_token, self.http_timeout)
    }

    /// Builds a Calendar client for `calendar_id`.
    pub fn calendar(&self, calendar_id: &str) -> ProviderResult<GoogleCalendarClient> {
        Ok(GoogleCalendarClient::new(&self.token.access_token, self.http_timeout)?
            .with_calendar_id(calendar_id))
    }
}

/// Shorthand for [`GoogleAuth::new`] followed by [`GoogleAuth::authenticate`].
pub async fn authenticate(
    config: AuthConfig,
    shutdown: ShutdownHandle,
) -> ProviderResult<AuthorizedClient> {
    GoogleAuth::new(config, shutdown)?.authenticate().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::config::OAuthCredentials;
    use crate::test_support::{FakeServer, serve_fixed};
    use chrono::{Duration as ChronoDuration, Utc};

    fn config(dir: &tempfile::TempDir, token_endpoint: &FakeServer) -> AuthConfig {
        AuthConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_token_path(dir.path().join("token.json"))
        .with_token_url(format!("{}/token", token_endpoint.base_url))
        .with_port(0)
        .with_open_browser(false)
        .with_callback_timeout(Duration::from_secs(5))
    }

    fn cached(expiry_offset_secs: i64) -> TokenInfo {
        TokenInfo {
            access_token: "ya29.cached".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expiry: Some(Utc::now() + ChronoDuration::seconds(expiry_offset_secs)),
            scopes: AuthConfig::default_scopes(),
        }
    }

    #[tokio::test]
    async fn valid_cached_token_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = serve_fixed("500 Internal Server Error", "{}").await;
        let auth = GoogleAuth::new(config(&dir, &endpoint), ShutdownHandle::new()).unwrap();
        auth.storage().save(&cached(3600)).unwrap();

        let client = auth.authenticate().await.unwrap();
        assert_eq!(client.token().access_token, "ya29.cached");
        assert_eq!(endpoint.hit_count(), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = serve_fixed(
            "200 OK",
            r#"{"access_token":"ya29.fresh","expires_in":3600,"token_type":"Bearer"}"#,
        )
        .await;
        let auth = GoogleAuth::new(config(&dir, &endpoint), ShutdownHandle::new()).unwrap();
        auth.storage().save(&cached(-10)).unwrap();

        let client = auth.authenticate().await.unwrap();
        assert_eq!(client.token().access_token, "ya29.fresh");
        assert_eq!(endpoint.hit_count(), 1);

        let stored = auth.storage().load().unwrap().unwrap();
        assert_eq!(stored.access_token, "ya29.fresh");
        assert_eq!(stored.refresh_token.as_deref(), Some("1//refresh"));
        assert!(!stored.is_expired());
    }

    #[tokio::test]
    async fn refresh_bad_response_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = serve_fixed("200 OK", "not json").await;
        let auth = GoogleAuth::new(config(&dir, &endpoint), ShutdownHandle::new()).unwrap();
        auth.storage().save(&cached(-10)).unwrap();

        let err = auth.authenticate().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
        assert_eq!(
            auth.storage().load().unwrap().unwrap().access_token,
            "ya29.cached"
        );
    }

    #[tokio::test]
    async fn cancelled_flow_writes_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = serve_fixed("200 OK", r#"{"access_token":"never"}"#).await;
        let shutdown = ShutdownHandle::new();
        let auth = GoogleAuth::new(config(&dir, &endpoint), shutdown.clone()).unwrap();

        shutdown.trigger();
        let err = auth.authenticate().await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(endpoint.hit_count(), 0);
        assert!(!dir.path().join("token.json").exists());
    }

    #[tokio::test]
    async fn missing_scope_forces_reauthorization() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = serve_fixed("200 OK", r#"{"access_token":"never"}"#).await;
        let shutdown = ShutdownHandle::new();
        let auth = GoogleAuth::new(config(&dir, &endpoint), shutdown.clone()).unwrap();

        let narrow = TokenInfo {
            scopes: vec![AuthConfig::GMAIL_SCOPE.to_string()],
            ..cached(3600)
        };
        auth.storage().save(&narrow).unwrap();

        // The flow starts instead of returning the cached token.
        shutdown.trigger();
        let err = auth.authenticate().await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(auth.storage().load().unwrap(), Some(narrow));
    }

    #[tokio::test]
    async fn corrupt_token_file_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = serve_fixed("200 OK", "{}").await;
        let auth = GoogleAuth::new(config(&dir, &endpoint), ShutdownHandle::new()).unwrap();
        std::fs::write(dir.path().join("token.json"), "{broken").unwrap();

        assert!(auth.cached_token().is_none());
    }

    #[test]
    fn invalid_credentials_are_rejected() {
        let config = AuthConfig::new(OAuthCredentials::new("not-a-client-id", "secret"));
        let err = GoogleAuth::new(config, ShutdownHandle::new()).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn authorized_client_builds_api_clients() {
        let client = AuthorizedClient {
            token: cached(3600),
            http_timeout: Duration::from_secs(5),
        };
        assert_eq!(client.calendar("team").unwrap().calendar_id(), "team");
        assert!(client.gmail().is_ok());
    }
}
