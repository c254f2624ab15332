//! `butler auth`: authorize ahead of time.

use std::io::Write;

use butler_providers::google::GoogleAuth;
use tracing::info;

use crate::error::ClientResult;

/// Ensures a usable token is stored.
///
/// Without `force` a cached token is reused (refreshed if expired); with it
/// the authorization flow always runs and the new token replaces the old.
pub async fn run(auth: &GoogleAuth, force: bool, out: &mut dyn Write) -> ClientResult<()> {
    let client = if force {
        info!("forcing re-authorization");
        auth.reauthorize().await?
    } else {
        auth.authenticate().await?
    };

    writeln!(out, "Authorized. Token stored in {}", auth.storage().path().display())?;
    if let Some(expiry) = client.token().expiry {
        writeln!(
            out,
            "Access token valid until {}",
            expiry.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
    }
    if client.token().refresh_token.is_none() {
        writeln!(
            out,
            "No refresh token was issued; run `butler auth --force` when it expires."
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use butler_providers::google::{AuthConfig, OAuthCredentials, ShutdownHandle, TokenInfo};
    use chrono::{TimeZone, Utc};

    fn auth(dir: &tempfile::TempDir, shutdown: ShutdownHandle) -> GoogleAuth {
        let config = AuthConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_token_path(dir.path().join("token.json"))
        .with_port(0)
        .with_open_browser(false);
        GoogleAuth::new(config, shutdown).unwrap()
    }

    #[tokio::test]
    async fn cached_token_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let auth = auth(&dir, ShutdownHandle::new());
        auth.storage()
            .save(&TokenInfo {
                access_token: "ya29.cached".to_string(),
                token_type: "Bearer".to_string(),
                refresh_token: Some("1//refresh".to_string()),
                expiry: Some(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()),
                scopes: AuthConfig::default_scopes(),
            })
            .unwrap();

        let mut out = Vec::new();
        run(&auth, false, &mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Authorized. Token stored in"));
        assert!(out.contains("valid until 2099-01-01 00:00:00 UTC"));
        assert!(!out.contains("No refresh token"));
    }

    #[tokio::test]
    async fn force_ignores_cached_token() {
        let dir = tempfile::tempdir().unwrap();
        let shutdown = ShutdownHandle::new();
        let auth = auth(&dir, shutdown.clone());
        let cached = TokenInfo::new("ya29.cached", None, None, AuthConfig::default_scopes());
        auth.storage().save(&cached).unwrap();

        shutdown.trigger();
        let mut out = Vec::new();
        let err = run(&auth, true, &mut out).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(out.is_empty());
        assert_eq!(auth.storage().load().unwrap(), Some(cached));
    }
}
