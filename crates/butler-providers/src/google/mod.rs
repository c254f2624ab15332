//! Google provider implementation.
//!
//! # Authentication Flow
//!
//! 1. The user provides their own OAuth client ID/secret (`credentials.json`)
//! 2. A cached token is reused, or refreshed when it has expired
//! 3. Otherwise a loopback listener is bound (or the manual strategy is used)
//! 4. The browser is sent to Google's consent page with a PKCE challenge
//! 5. The redirect carries the authorization code back to the listener
//! 6. The code is exchanged for tokens, which are persisted owner-only
//!
//! # Example
//!
//! ```ignore
//! use butler_providers::google::{AuthConfig, OAuthCredentials, ShutdownHandle, authenticate};
//!
//! let credentials = OAuthCredentials::from_file("~/.butler/credentials.json")?;
//! let client = authenticate(AuthConfig::new(credentials), ShutdownHandle::new()).await?;
//! let gmail = client.gmail()?;
//! ```

mod api;
mod auth;
mod calendar;
mod config;
mod gmail;
mod oauth;
mod shutdown;
mod tokens;

pub use auth::{AuthorizedClient, GoogleAuth, authenticate};
pub use calendar::{DEFAULT_CALENDAR_ID, GoogleCalendarClient};
pub use config::{AuthConfig, AuthStrategy, OAuthCredentials};
pub use gmail::GmailClient;
pub use oauth::{
    AuthorizationFlow, Callback, OAuthClient, PendingAuthorization, PkceFlow, parse_callback,
    parse_pasted_code,
};
pub use shutdown::ShutdownHandle;
pub use tokens::{TokenInfo, TokenStorage};
