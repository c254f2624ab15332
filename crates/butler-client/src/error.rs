//! Client error types.

use std::path::PathBuf;

use butler_core::TracingError;
use butler_providers::ProviderError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors loading `config.toml` or resolving its values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`crate::config::ClientConfig`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A `pass::` or `env::` reference could not be resolved.
    #[error("failed to resolve {field}: {message}")]
    Secret { field: &'static str, message: String },

    /// A value is present but unusable.
    #[error("{0}")]
    Invalid(String),
}

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Provider error.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// Credentials are missing or malformed.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Logging could not be initialised.
    #[error(transparent)]
    Tracing(#[from] TracingError),
}

impl ClientError {
    /// Returns true if the user aborted the authorization flow.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_cancelled())
    }
}
