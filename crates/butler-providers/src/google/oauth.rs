//! OAuth 2.0 authorization code flow for Google APIs.
//!
//! This module implements the Authorization Code flow with PKCE (Proof Key for
//! Code Exchange) for desktop applications. The code reaches the program in
//! one of two ways:
//!
//! - **Loopback**: a local HTTP listener receives Google's redirect.
//! - **Manual**: the user pastes the code, or the whole redirected URL.
//!
//! # Flow Overview
//!
//! 1. Generate a code verifier and its SHA-256 challenge
//! 2. Bind the loopback listener (the redirect URI uses the bound port)
//! 3. Build the authorization URL and show it, opening a browser if asked
//! 4. Wait for the redirect, a shutdown request, or the callback timeout
//! 5. Stop the listener, bounded by the shutdown timeout
//! 6. Exchange the code (with verifier) for tokens
//!
//! A shutdown before the redirect arrives ends the flow with a `Cancelled`
//! error and no exchange.

use std::io::BufRead;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::api::http_client;
use super::config::{AuthConfig, AuthStrategy, OAuthCredentials};
use super::shutdown::ShutdownHandle;
use super::tokens::TokenInfo;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long a single browser connection may take to send its request.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on header lines read from one callback request.
const MAX_HEADER_LINES: usize = 100;

const SUCCESS_BODY: &str = "Authorization received. You can close this window and return to the terminal.\n";
const FAILURE_BODY: &str = "Authorization failed. You can close this window.\n";
const MISSING_CODE_BODY: &str = "No authorization code in this request.\n";
const NOT_FOUND_BODY: &str = "Not found.\n";

/// OAuth client for Google's token endpoint.
///
/// Handles code exchange and access token refresh.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    token_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client posting to `token_url`.
    pub fn new(
        credentials: OAuthCredentials,
        token_url: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            credentials,
            token_url: token_url.into(),
            http_client: http_client(timeout)?,
        })
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.post_form(&params, "token exchange").await?;
        info!("successfully obtained tokens");

        let granted = response.granted_scopes().unwrap_or_else(|| scopes.to_vec());
        let mut token = TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            granted,
        );
        if let Some(token_type) = response.token_type {
            token = token.with_token_type(token_type);
        }
        Ok(token)
    }

    /// Refreshes an expired access token using its refresh token.
    ///
    /// Returns the updated token; scopes are kept from `token`.
    pub async fn refresh(&self, token: &TokenInfo) -> ProviderResult<TokenInfo> {
        let refresh_token = token.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::authentication("no refresh token - re-authorization required")
        })?;

        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_form(&params, "token refresh").await?;
        info!("successfully refreshed access token");

        let mut refreshed = token.clone();
        refreshed.update_access_token(
            response.access_token,
            response.expires_in,
            response.refresh_token,
        );
        Ok(refreshed)
    }

    async fn post_form(&self, params: &[(&str, &str)], what: &str) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("{} request failed", what)).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network("failed to read token response").with_source(e)
        })?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response("invalid token response").with_source(e)
        })
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(String::from).collect::<Vec<_>>())
            .filter(|scopes| !scopes.is_empty())
    }
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Anti-forgery state sent with the request and expected back.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with a random verifier and the given state.
    pub fn new(state: impl Into<String>) -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);

        Self {
            verifier,
            challenge,
            state: state.into(),
        }
    }

    /// Generates a cryptographically random code verifier.
    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Computes the SHA-256 challenge for a code verifier.
    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Builds the authorization URL, requesting offline access.
    pub fn build_auth_url(
        &self,
        auth_url: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            auth_url,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

/// What a request to the loopback listener carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// The redirect with an authorization code.
    Code {
        /// The authorization code.
        code: String,
        /// The returned state, if any.
        state: Option<String>,
    },
    /// The redirect reporting a denial (`error=`).
    Denied(String),
    /// A request to the root path without code or error.
    MissingCode,
    /// A request to any other path, or not a GET.
    NotFound,
}

/// Parses the request line of a callback request (`GET /?code=... HTTP/1.1`).
pub fn parse_callback(request_line: &str) -> Callback {
    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return Callback::NotFound;
    };

    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != "/" {
        return Callback::NotFound;
    }

    parse_query(query)
}

/// Extracts the code from what the user pasted in manual mode.
///
/// Accepts either the bare code or the full redirected URL.
pub fn parse_pasted_code(input: &str) -> Callback {
    let input = input.trim();
    if input.is_empty() {
        return Callback::MissingCode;
    }

    match url::Url::parse(input) {
        Ok(url) => parse_query(url.query().unwrap_or_default()),
        Err(_) => Callback::Code {
            code: input.to_string(),
            state: None,
        },
    }
}

fn parse_query(query: &str) -> Callback {
    let mut code = None;
    let mut state = None;
    let mut error = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    match (error, code) {
        (Some(error), _) => Callback::Denied(error),
        (None, Some(code)) if !code.is_empty() => Callback::Code { code, state },
        _ => Callback::MissingCode,
    }
}

/// Validates a parsed callback against the expected state.
fn accept_callback(callback: Callback, expected_state: &str) -> Option<ProviderResult<String>> {
    match callback {
        Callback::Code { code, state } => match state {
            Some(state) if state != expected_state => Some(Err(ProviderError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            ))),
            _ => Some(Ok(code)),
        },
        Callback::Denied(error) => Some(Err(ProviderError::authorization(format!(
            "authorization denied: {}",
            error
        )))),
        Callback::MissingCode | Callback::NotFound => None,
    }
}

/// Drives the interactive part of the authorization.
#[derive(Debug)]
pub struct AuthorizationFlow {
    config: AuthConfig,
    oauth: OAuthClient,
    shutdown: ShutdownHandle,
}

impl AuthorizationFlow {
    /// Creates a flow for `config`; `shutdown` aborts it.
    pub fn new(
        config: AuthConfig,
        oauth: OAuthClient,
        shutdown: ShutdownHandle,
    ) -> Self {
        Self {
            config,
            oauth,
            shutdown,
        }
    }

    /// Runs the configured strategy and exchanges the code for a token.
    ///
    /// The token is not persisted here.
    pub async fn run(&self) -> ProviderResult<TokenInfo> {
        match self.config.strategy {
            AuthStrategy::Loopback => self.start_loopback().await?.finish().await,
            AuthStrategy::Manual => {
                let stdin = std::io::stdin();
                self.run_manual(move || stdin.lock()).await
            }
        }
    }

    /// Binds the listener, shows the URL and starts serving the redirect.
    pub async fn start_loopback(&self) -> ProviderResult<PendingAuthorization<'_>> {
        let listener = TcpListener::bind(("127.0.0.1", self.config.port))
            .await
            .map_err(|e| {
                ProviderError::configuration(format!(
                    "failed to bind loopback listener on port {}",
                    self.config.port
                ))
                .with_source(e)
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| ProviderError::internal("failed to read listener address").with_source(e))?
            .port();
        debug!("bound loopback listener on port {}", port);

        let redirect_uri = format!("http://127.0.0.1:{}/", port);
        let pkce = PkceFlow::new(&self.config.state);
        let auth_url = self.auth_url(&pkce, &redirect_uri);

        eprintln!(
            "\nOpen this URL in your browser to authorize butler:\n\n{}\n",
            auth_url
        );
        if self.config.open_browser {
            info!("opening browser for authorization");
            if let Err(e) = open::that(&auth_url) {
                warn!("failed to open browser: {}", e);
            }
        }

        let (code_tx, code_rx) = oneshot::channel();
        let stop = ShutdownHandle::new();
        let task = tokio::spawn(serve_callback(
            listener,
            self.config.state.clone(),
            code_tx,
            stop.clone(),
        ));

        Ok(PendingAuthorization {
            flow: self,
            pkce,
            redirect_uri,
            auth_url,
            code_rx,
            stop,
            task,
        })
    }

    /// Prints the URL and reads the code from `open_input`.
    ///
    /// `open_input` runs on its own thread. A cancelled flow leaves that
    /// thread blocked in its read instead of waiting for it, so the process
    /// can exit without another line of input.
    pub async fn run_manual<F, R>(&self, open_input: F) -> ProviderResult<TokenInfo>
    where
        F: FnOnce() -> R + Send + 'static,
        R: BufRead,
    {
        let redirect_uri = format!("http://127.0.0.1:{}/", self.config.port);
        let pkce = PkceFlow::new(&self.config.state);
        let auth_url = self.auth_url(&pkce, &redirect_uri);

        eprintln!(
            "\nOpen this URL in your browser to authorize butler:\n\n{}\n",
            auth_url
        );
        eprintln!("Then paste the authorization code, or the full URL you were redirected to:");

        let (line_tx, line_rx) = oneshot::channel();
        std::thread::Builder::new()
            .name("butler-code-input".to_string())
            .spawn(move || {
                let mut line = String::new();
                let read = open_input().read_line(&mut line).map(|_| line);
                let _ = line_tx.send(read);
            })
            .map_err(|e| ProviderError::internal("failed to start input reader").with_source(e))?;

        let line = tokio::select! {
            _ = self.shutdown.wait() => {
                info!("authorization aborted while waiting for the code");
                return Err(ProviderError::cancelled("authorization aborted"));
            }
            read = line_rx => read
                .map_err(|_| ProviderError::internal("input reader stopped unexpectedly"))?
                .map_err(|e| ProviderError::configuration("failed to read authorization code").with_source(e))?,
        };

        let code = match accept_callback(parse_pasted_code(&line), &self.config.state) {
            Some(result) => result?,
            None => {
                return Err(ProviderError::authentication(
                    "no authorization code was entered",
                ));
            }
        };

        self.oauth
            .exchange_code(&code, &pkce.verifier, &redirect_uri, &self.config.scopes)
            .await
    }

    fn auth_url(&self, pkce: &PkceFlow, redirect_uri: &str) -> String {
        pkce.build_auth_url(
            &self.config.auth_url,
            &self.config.credentials.client_id,
            redirect_uri,
            &self.config.scopes,
        )
    }
}

/// A loopback authorization waiting for its redirect.
#[derive(Debug)]
pub struct PendingAuthorization<'a> {
    flow: &'a AuthorizationFlow,
    pkce: PkceFlow,
    redirect_uri: String,
    auth_url: String,
    code_rx: oneshot::Receiver<ProviderResult<String>>,
    stop: ShutdownHandle,
    task: JoinHandle<()>,
}

enum WaitOutcome {
    Received(ProviderResult<String>),
    Cancelled,
    TimedOut,
}

impl PendingAuthorization<'_> {
    /// The redirect URI, carrying the bound port.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// The authorization URL shown to the user.
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// Waits for the redirect, stops the listener, and exchanges the code.
    pub async fn finish(self) -> ProviderResult<TokenInfo> {
        let Self {
            flow,
            pkce,
            redirect_uri,
            code_rx,
            stop,
            mut task,
            ..
        } = self;

        let outcome = tokio::select! {
            received = code_rx => match received {
                Ok(result) => WaitOutcome::Received(result),
                Err(_) => WaitOutcome::Received(Err(ProviderError::internal(
                    "loopback listener stopped unexpectedly",
                ))),
            },
            _ = flow.shutdown.wait() => WaitOutcome::Cancelled,
            _ = tokio::time::sleep(flow.config.callback_timeout) => WaitOutcome::TimedOut,
        };

        stop.trigger();
        if tokio::time::timeout(flow.config.shutdown_timeout, &mut task)
            .await
            .is_err()
        {
            warn!("loopback listener did not stop in time, aborting it");
            task.abort();
        }
        debug!("loopback listener stopped");

        let code = match outcome {
            WaitOutcome::Received(result) => result?,
            WaitOutcome::Cancelled => {
                info!("authorization aborted before the redirect arrived");
                return Err(ProviderError::cancelled("authorization aborted"));
            }
            WaitOutcome::TimedOut => {
                return Err(ProviderError::authentication(format!(
                    "no redirect received within {}s",
                    flow.config.callback_timeout.as_secs()
                )));
            }
        };

        info!("received authorization code, exchanging for tokens");
        flow.oauth
            .exchange_code(&code, &pkce.verifier, &redirect_uri, &flow.config.scopes)
            .await
    }
}

/// Accepts connections until a callback completes the flow or `stop` fires.
async fn serve_callback(
    listener: TcpListener,
    expected_state: String,
    code_tx: oneshot::Sender<ProviderResult<String>>,
    stop: ShutdownHandle,
) {
    loop {
        let accepted = tokio::select! {
            _ = stop.wait() => return,
            accepted = listener.accept() => accepted,
        };

        let stream = match accepted {
            Ok((stream, addr)) => {
                debug!("callback connection from {}", addr);
                stream
            }
            Err(e) => {
                warn!("failed to accept connection: {}", e);
                continue;
            }
        };

        let handled = tokio::select! {
            _ = stop.wait() => return,
            handled = tokio::time::timeout(
                REQUEST_READ_TIMEOUT,
                handle_connection(stream, &expected_state),
            ) => handled,
        };

        match handled {
            Ok(Some(result)) => {
                let _ = code_tx.send(result);
                return;
            }
            Ok(None) => {}
            Err(_) => debug!("callback connection timed out"),
        }
    }
}

/// Answers one request. Returns the flow result if the request completes it.
async fn handle_connection(
    stream: TcpStream,
    expected_state: &str,
) -> Option<ProviderResult<String>> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if let Err(e) = reader.read_line(&mut request_line).await {
        debug!("failed to read callback request: {}", e);
        return None;
    }

    // Drain headers so the browser sees a clean response.
    for _ in 0..MAX_HEADER_LINES {
        let mut header = String::new();
        match reader.read_line(&mut header).await {
            Ok(0) => break,
            Ok(_) if header.trim().is_empty() => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }

    let callback = parse_callback(&request_line);
    let result = accept_callback(callback.clone(), expected_state);
    let (status, body) = match (&callback, &result) {
        (_, Some(Ok(_))) => ("200 OK", SUCCESS_BODY),
        (_, Some(Err(_))) => ("400 Bad Request", FAILURE_BODY),
        (Callback::NotFound, None) => ("404 Not Found", NOT_FOUND_BODY),
        (_, None) => ("400 Bad Request", MISSING_CODE_BODY),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let mut stream = reader.into_inner();
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("failed to write callback response: {}", e);
    }
    let _ = stream.shutdown().await;

    result
}
