//! OAuth client credentials.
//!
//! Credentials come from the `[google]` section of `config.toml` when it is
//! filled in, otherwise from `credentials.json` in the cache directory. When
//! neither exists the user is asked to paste the JSON downloaded from the
//! Google Cloud Console into `$EDITOR`; the result is validated and kept as
//! `credentials.json`.

use std::io::{BufRead, Write};
use std::path::Path;
use std::process::Command;

use butler_providers::google::OAuthCredentials;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{ClientError, ClientResult};

/// Editor used when `$EDITOR` is unset.
pub const DEFAULT_EDITOR: &str = "vim";

const BOOTSTRAP_PROMPT: &str = "\
No OAuth client credentials found.

Create an OAuth client ID of type \"Desktop app\" in the Google Cloud Console
(APIs & Services > Credentials), download its JSON, and paste it into the
editor that opens next. Save and quit when done.

Press Enter to open the editor...";

/// Returns the configured credentials, running the bootstrap if none exist.
pub fn load(settings: &Settings) -> ClientResult<OAuthCredentials> {
    if let Some(google) = &settings.google
        && let Some(credentials) = google.resolve_credentials()?
    {
        debug!("using credentials from config.toml");
        return checked(credentials);
    }

    let path = settings.credentials_path();
    if path.exists() {
        debug!("using credentials from {}", path.display());
        return checked(OAuthCredentials::from_file(&path)?);
    }

    let stdin = std::io::stdin();
    bootstrap(&path, &editor(), &mut stdin.lock(), &mut std::io::stderr())
}

/// Asks for credentials through `editor` and writes them to `path`.
///
/// `input` is read once to wait for the user; the prompt goes to `prompt`.
pub fn bootstrap(
    path: &Path,
    editor: &str,
    input: &mut impl BufRead,
    prompt: &mut impl Write,
) -> ClientResult<OAuthCredentials> {
    writeln!(prompt, "{}", BOOTSTRAP_PROMPT)?;
    prompt.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;

    let draft = tempfile::Builder::new()
        .prefix("butler-credentials-")
        .suffix(".json")
        .tempfile()?;

    let mut words = editor.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| ClientError::Credentials("the editor command is empty".to_string()))?;
    let status = Command::new(program)
        .args(words)
        .arg(draft.path())
        .status()
        .map_err(|e| ClientError::Credentials(format!("failed to run editor `{}`: {}", editor, e)))?;
    if !status.success() {
        return Err(ClientError::Credentials(format!(
            "editor `{}` exited with {}",
            editor, status
        )));
    }

    let content = std::fs::read_to_string(draft.path())?;
    if content.trim().is_empty() {
        return Err(ClientError::Credentials(
            "no credentials were entered".to_string(),
        ));
    }
    let credentials = checked(OAuthCredentials::from_json(&content)?)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    info!("saved credentials to {}", path.display());

    Ok(credentials)
}

/// `$EDITOR`, or [`DEFAULT_EDITOR`] when unset or blank.
fn editor() -> String {
    std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
}

fn checked(credentials: OAuthCredentials) -> ClientResult<OAuthCredentials> {
    credentials
        .validate()
        .map_err(|e| ClientError::Credentials(format!("invalid credentials: {}", e)))?;
    Ok(credentials)
}
