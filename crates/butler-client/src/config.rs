//! Client configuration.
//!
//! Settings come from three layers, highest first: command-line flags,
//! `config.toml`, built-in defaults. The file lives in the cache directory
//! (`~/.butler/config.toml`) unless `--config` points elsewhere, and every
//! key in it is optional.
//!
//! ```toml
//! [auth]
//! port = 3333
//! strategy = "loopback"      # or "manual"
//! open_browser = true
//! callback_timeout_secs = 300
//!
//! [mail]
//! max_results = 100
//! labels = ["UNREAD"]
//!
//! [calendar]
//! calendar_id = "primary"
//! today_match = "date"       # or "weekday"
//!
//! [display]
//! color = true
//!
//! [google]
//! client_id = "env::BUTLER_CLIENT_ID"
//! client_secret = "pass::google/butler"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use butler_core::{ReportOptions, TodayMatch, parse_label_list};
use butler_providers::google::{AuthConfig, AuthStrategy, DEFAULT_CALENDAR_ID, OAuthCredentials};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::Cli;
use crate::error::ConfigError;

/// File name of the configuration inside the cache directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Authorization flow settings.
    pub auth: AuthSettings,

    /// Mail report settings.
    pub mail: MailSettings,

    /// Calendar report settings.
    pub calendar: CalendarSettings,

    /// Display settings.
    pub display: DisplaySettings,

    /// Inline OAuth client credentials.
    pub google: Option<GoogleSettings>,
}

/// `[auth]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Loopback listener port; `0` picks a free port.
    pub port: u16,

    /// How the authorization code is obtained.
    pub strategy: AuthStrategy,

    /// Whether to open the authorization URL in a browser.
    pub open_browser: bool,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// How long to wait for the redirect.
    pub callback_timeout_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            port: AuthConfig::DEFAULT_PORT,
            strategy: AuthStrategy::default(),
            open_browser: true,
            scopes: AuthConfig::default_scopes(),
            callback_timeout_secs: AuthConfig::DEFAULT_CALLBACK_TIMEOUT_SECS,
        }
    }
}

/// `[mail]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// Maximum number of messages listed.
    pub max_results: u32,

    /// Label names a message must carry.
    pub labels: Vec<String>,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            max_results: 100,
            labels: vec!["UNREAD".to_string()],
        }
    }
}

/// `[calendar]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendar to query.
    pub calendar_id: String,

    /// How "today" is recognised.
    pub today_match: TodayMatch,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            today_match: TodayMatch::default(),
        }
    }
}

/// `[display]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Whether to use ANSI bold for today's items.
    pub color: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { color: true }
    }
}

/// `[google]` section.
///
/// Both values support secret references (`pass::…`, `env::…`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleSettings {
    /// OAuth client ID.
    pub client_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,
}

impl GoogleSettings {
    /// Resolves the inline credentials.
    ///
    /// Returns `Ok(None)` when neither value is set, so the credentials file
    /// is used instead.
    pub fn resolve_credentials(&self) -> Result<Option<OAuthCredentials>, ConfigError> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (None, None) => Ok(None),
            (Some(id), Some(secret)) => {
                let id = crate::secret::resolve("client_id", id)?;
                let secret = crate::secret::resolve("client_secret", secret)?;
                Ok(Some(OAuthCredentials::new(id, secret)))
            }
            (Some(_), None) => Err(ConfigError::Invalid(
                "client_secret is missing from the [google] section".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::Invalid(
                "client_id is missing from the [google] section".to_string(),
            )),
        }
    }
}

impl ClientConfig {
    /// Loads `path`, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `config.toml` from `cache_dir`, or the defaults if it is absent.
    pub fn load_or_default(cache_dir: &Path) -> Result<Self, ConfigError> {
        let path = cache_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!("no config file at {}", path.display());
            Ok(Self::default())
        }
    }
}

/// Effective settings after layering flags over the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding credentials, token and config.
    pub cache_dir: PathBuf,

    /// Maximum number of messages listed.
    pub max_results: u32,

    /// Label names a message must carry.
    pub labels: Vec<String>,

    /// Calendar to query.
    pub calendar_id: String,

    /// Report rendering options.
    pub report: ReportOptions,

    /// Authorization flow settings.
    pub auth: AuthSettings,

    /// Inline credentials, if configured.
    pub google: Option<GoogleSettings>,
}

impl Settings {
    /// Loads the config file named by `cli` and layers the flags over it.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let cache_dir = cli
            .cache_dir
            .clone()
            .unwrap_or_else(AuthConfig::default_cache_dir);
        let config = match cli.config {
            Some(ref path) => ClientConfig::load_from(path)?,
            None => ClientConfig::load_or_default(&cache_dir)?,
        };
        Ok(Self::merge(cli, config, cache_dir, no_color_requested()))
    }

    /// Layers `cli` over `config`. `no_color` reflects the `NO_COLOR`
    /// environment variable.
    pub fn merge(cli: &Cli, config: ClientConfig, cache_dir: PathBuf, no_color: bool) -> Self {
        let mut auth = config.auth;
        if let Some(port) = cli.port {
            auth.port = port;
        }
        if cli.manual {
            auth.strategy = AuthStrategy::Manual;
        }
        if cli.no_browser {
            auth.open_browser = false;
        }

        let labels = match cli.labels {
            Some(ref list) => parse_label_list(list),
            None => config.mail.labels,
        };

        Self {
            cache_dir,
            max_results: cli.max_results.unwrap_or(config.mail.max_results),
            labels,
            calendar_id: config.calendar.calendar_id,
            report: ReportOptions {
                color: config.display.color && !cli.no_color && !no_color,
                today_match: config.calendar.today_match,
            },
            auth,
            google: config.google,
        }
    }

    /// Path of `credentials.json`.
    pub fn credentials_path(&self) -> PathBuf {
        self.cache_dir.join(AuthConfig::CREDENTIALS_FILE)
    }

    /// Path of `token.json`.
    pub fn token_path(&self) -> PathBuf {
        self.cache_dir.join(AuthConfig::TOKEN_FILE)
    }

    /// Builds the authorization configuration for `credentials`.
    pub fn auth_config(&self, credentials: OAuthCredentials) -> AuthConfig {
        AuthConfig::new(credentials)
            .with_token_path(self.token_path())
            .with_port(self.auth.port)
            .with_scopes(self.auth.scopes.clone())
            .with_strategy(self.auth.strategy)
            .with_open_browser(self.auth.open_browser)
            .with_callback_timeout(Duration::from_secs(self.auth.callback_timeout_secs))
    }
}

/// `NO_COLOR` set to anything non-empty disables styling.
fn no_color_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty())
}
