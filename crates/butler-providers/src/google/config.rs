//! Google OAuth credentials and authorization configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 credentials for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level (e.g., from gcloud)
#[derive(Debug, Deserialize)]
struct GoogleCredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}",
                path.display()
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    ///
    /// Supports multiple formats:
    /// 1. Google Cloud Console format: `{"installed": {"client_id": "...", "client_secret": "..."}}`
    /// 2. Flat format: `{"client_id": "...", "client_secret": "..."}`
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: GoogleCredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(ProviderError::configuration(
            "credentials must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Validates that the credentials appear to be correctly formatted.
    ///
    /// This checks that:
    /// - Client ID ends with `.apps.googleusercontent.com`
    /// - Client secret is non-empty
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// How the authorization code reaches the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStrategy {
    /// Capture the redirect on a local HTTP listener.
    #[default]
    Loopback,
    /// Read the code (or the redirected URL) from standard input.
    Manual,
}

/// Configuration for the authorization flow and the token store.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth credentials for API access.
    pub credentials: OAuthCredentials,

    /// Path of the persisted token.
    ///
    /// Defaults to `~/.butler/token.json`.
    pub token_path: PathBuf,

    /// Local port for the loopback listener. `0` picks an ephemeral port.
    pub port: u16,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Anti-forgery `state` value sent with the authorization request.
    pub state: String,

    /// Authorization endpoint.
    pub auth_url: String,

    /// Token endpoint used for code exchange and refresh.
    pub token_url: String,

    /// How long to wait for the redirect.
    pub callback_timeout: Duration,

    /// Upper bound for stopping the loopback listener.
    pub shutdown_timeout: Duration,

    /// Timeout for token endpoint requests.
    pub http_timeout: Duration,

    /// How the authorization code is obtained.
    pub strategy: AuthStrategy,

    /// Whether to try opening the authorization URL in a browser.
    pub open_browser: bool,
}

impl AuthConfig {
    /// Default loopback port.
    pub const DEFAULT_PORT: u16 = 3333;

    /// Default anti-forgery state value.
    pub const DEFAULT_STATE: &'static str = "state-token";

    /// Read-only Gmail scope.
    pub const GMAIL_SCOPE: &'static str = "https://www.googleapis.com/auth/gmail.readonly";

    /// Read-only Calendar scope.
    pub const CALENDAR_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    /// Google's authorization endpoint.
    pub const GOOGLE_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";

    /// Google's token endpoint.
    pub const GOOGLE_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Default time to wait for the redirect, in seconds.
    pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

    /// Default request timeout in seconds.
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

    /// Upper bound for stopping the loopback listener.
    pub const LISTENER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

    /// File name of the persisted token inside the cache directory.
    pub const TOKEN_FILE: &'static str = "token.json";

    /// File name of the client credentials inside the cache directory.
    pub const CREDENTIALS_FILE: &'static str = "credentials.json";

    /// Creates a configuration with defaults for everything but the credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_cache_dir().join(Self::TOKEN_FILE),
            port: Self::DEFAULT_PORT,
            scopes: Self::default_scopes(),
            state: Self::DEFAULT_STATE.to_string(),
            auth_url: Self::GOOGLE_AUTH_URL.to_string(),
            token_url: Self::GOOGLE_TOKEN_URL.to_string(),
            callback_timeout: Duration::from_secs(Self::DEFAULT_CALLBACK_TIMEOUT_SECS),
            shutdown_timeout: Self::LISTENER_SHUTDOWN_TIMEOUT,
            http_timeout: Duration::from_secs(Self::DEFAULT_HTTP_TIMEOUT_SECS),
            strategy: AuthStrategy::default(),
            open_browser: true,
        }
    }

    /// Returns the per-user cache directory, `~/.butler`.
    pub fn default_cache_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".butler")
    }

    /// Returns the scopes requested by default.
    pub fn default_scopes() -> Vec<String> {
        vec![Self::GMAIL_SCOPE.to_string(), Self::CALENDAR_SCOPE.to_string()]
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the loopback port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the anti-forgery state value.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    /// Sets the authorization endpoint.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Sets the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the redirect wait timeout.
    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Sets the authorization strategy.
    pub fn with_strategy(mut self, strategy: AuthStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enables or disables opening the browser.
    pub fn with_open_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials
            .validate()
            .map_err(|e| ProviderError::configuration(format!("invalid credentials: {}", e)))?;

        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        if self.callback_timeout.is_zero() {
            return Err(ProviderError::configuration(
                "callback timeout must be greater than zero",
            ));
        }

        url::Url::parse(&self.auth_url).map_err(|e| {
            ProviderError::configuration(format!("invalid authorization URL: {}", e))
        })?;
        url::Url::parse(&self.token_url)
            .map_err(|e| ProviderError::configuration(format!("invalid token URL: {}", e)))?;

        Ok(())
    }
}
