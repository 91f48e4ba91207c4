//! Identity provider client and session state.
//!
//! Sign-in runs the OAuth authorization-code flow with PKCE. The
//! interactive flow opens the system browser and collects the callback on
//! a loopback listener. When the browser cannot be opened or the user
//! abandons the challenge, callers fall back to the deferred redirect
//! flow: the PKCE state is persisted and the result is collected by the
//! pending-result check on a later launch.
//!
//! Session-change notifications go out on a watch channel. The client is
//! the sole authority on session state; consumers toggle UI off the watch
//! and never infer state from their own actions.

pub mod oauth;

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::AuthConfig;

/// Display name used in the welcome message when the provider returns none.
pub const FALLBACK_DISPLAY_NAME: &str = "User";

/// The interactive challenge window could not be opened.
pub const CODE_POPUP_BLOCKED: &str = "popup-blocked";

/// The interactive challenge was dismissed before completing.
pub const CODE_POPUP_CLOSED: &str = "popup-closed-by-user";

/// How long the loopback listener waits for the browser callback.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(180);

/// An authenticated identity. Absent entirely when anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub display_name: Option<String>,
}

impl Session {
    /// The name to greet the user with; falls back to a generic label.
    pub fn display_name_or_default(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_DISPLAY_NAME)
    }
}

/// A failed sign-in, carrying the provider (or flow) error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    pub code: String,
    pub message: String,
}

impl AuthError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// True for the two failures that escalate to the redirect fallback
    /// instead of surfacing an error.
    pub fn is_recoverable(&self) -> bool {
        self.code == CODE_POPUP_BLOCKED || self.code == CODE_POPUP_CLOSED
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Code: {})", self.message, self.code)
    }
}

impl std::error::Error for AuthError {}

/// Query parameters extracted from the loopback callback request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Client for the identity provider.
///
/// Constructed once at startup; session-change consumers subscribe to the
/// watch channel.
pub struct AuthClient {
    config: AuthConfig,
    sessions: watch::Sender<Option<Session>>,
}

impl AuthClient {
    /// Creates the client, seeding the session from unexpired cached
    /// credentials.
    pub fn new(config: AuthConfig) -> Self {
        let initial = oauth::load_credentials()
            .unwrap_or_else(|err| {
                tracing::warn!("Ignoring unreadable credential cache: {err}");
                None
            })
            .filter(|creds| !creds.is_expired())
            .map(|creds| Session {
                display_name: creds.display_name,
            });

        let (sessions, _) = watch::channel(initial);
        Self { config, sessions }
    }

    /// Subscribes to session-change notifications.
    ///
    /// The receiver observes every transition, regardless of cause.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }

    /// The current session, if any.
    pub fn current(&self) -> Option<Session> {
        self.sessions.borrow().clone()
    }

    /// Runs the interactive browser challenge.
    ///
    /// Opens the system browser on the provider's account chooser and
    /// collects the authorization code on a loopback listener. The
    /// challenge is modal from the client's perspective: callers must not
    /// start a second one while this is in flight.
    ///
    /// # Errors
    /// `popup-blocked` when the browser or listener cannot open,
    /// `popup-closed-by-user` when the challenge is abandoned, the
    /// provider's own code otherwise.
    pub async fn sign_in_interactive(&self) -> Result<Session, AuthError> {
        let pkce = oauth::generate_pkce();
        let state = uuid::Uuid::new_v4().to_string();
        let port = oauth::random_local_port();
        let redirect_uri = oauth::build_redirect_uri(port);

        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|err| {
            AuthError::new(
                CODE_POPUP_BLOCKED,
                format!("Could not open the sign-in callback listener: {err}"),
            )
        })?;

        let url = oauth::build_auth_url(&self.config, &pkce, &state, &redirect_uri);
        open::that(&url).map_err(|err| {
            AuthError::new(
                CODE_POPUP_BLOCKED,
                format!("Could not open the browser for sign-in: {err}"),
            )
        })?;

        let params = wait_for_callback(listener).await?;

        if let Some(error) = params.error {
            let message = params
                .error_description
                .unwrap_or_else(|| "The provider rejected the sign-in".to_string());
            return Err(AuthError::new(error, message));
        }

        let Some(code) = params.code else {
            return Err(AuthError::new(
                CODE_POPUP_CLOSED,
                "The sign-in window was closed before completing",
            ));
        };

        if params.state.as_deref() != Some(state.as_str()) {
            return Err(AuthError::new(
                "state-mismatch",
                "Sign-in state did not match; refusing the callback",
            ));
        }

        self.finish_sign_in(&code, &pkce.verifier, &redirect_uri)
            .await
    }

    /// Starts the deferred redirect flow.
    ///
    /// Persists the PKCE state and opens the authorization URL; the result
    /// is collected by [`Self::pending_redirect_result`] on a later
    /// launch. Returns the authorization URL so the caller can show it if
    /// the browser did not open.
    ///
    /// # Errors
    /// Returns an error if the flow state cannot be persisted.
    pub fn sign_in_via_redirect(&self) -> Result<String, AuthError> {
        let pkce = oauth::generate_pkce();
        let state = uuid::Uuid::new_v4().to_string();
        let redirect_uri = oauth::build_redirect_uri(oauth::random_local_port());

        let pending = oauth::PendingAuth {
            verifier: pkce.verifier.clone(),
            state: state.clone(),
            redirect_uri: redirect_uri.clone(),
            created: oauth::now_millis_u64(),
        };
        oauth::save_pending(&pending).map_err(|err| {
            AuthError::new("pending-save", format!("Could not start redirect sign-in: {err}"))
        })?;

        let url = oauth::build_auth_url(&self.config, &pkce, &state, &redirect_uri);
        if let Err(err) = open::that(&url) {
            tracing::warn!("Browser did not open for redirect sign-in: {err}");
        }
        Ok(url)
    }

    /// Checks for a completed redirect flow.
    ///
    /// Called on every startup. No pending flow, or a pending flow whose
    /// callback has not arrived yet, is a normal no-op (`Ok(None)`).
    ///
    /// # Errors
    /// Returns an error if a recorded callback fails verification or
    /// exchange.
    pub async fn pending_redirect_result(&self) -> Result<Option<Session>, AuthError> {
        let pending = oauth::load_pending().map_err(|err| {
            AuthError::new("pending-read", format!("Could not read redirect state: {err}"))
        })?;
        let Some(pending) = pending else {
            return Ok(None);
        };

        let Some(input) = oauth::take_redirect_callback() else {
            return Ok(None);
        };

        // One shot per recorded callback: clear the pending state whether
        // or not the exchange succeeds, so a bad callback cannot loop.
        oauth::clear_pending();

        let (code, state) = oauth::parse_authorization_input(&input);
        let Some(code) = code else {
            return Err(AuthError::new(
                "callback-invalid",
                "The recorded callback carried no authorization code",
            ));
        };
        if state.as_deref() != Some(pending.state.as_str()) {
            return Err(AuthError::new(
                "state-mismatch",
                "Redirect sign-in state did not match; refusing the callback",
            ));
        }

        self.finish_sign_in(&code, &pending.verifier, &pending.redirect_uri)
            .await
            .map(Some)
    }

    /// Terminates the session. No confirmation, effective immediately.
    pub fn sign_out(&self) {
        match oauth::clear_credentials() {
            Ok(true) => tracing::info!("Signed out"),
            Ok(false) => {}
            Err(err) => tracing::warn!("Could not clear cached credentials: {err}"),
        }
        self.sessions.send_replace(None);
    }

    async fn finish_sign_in(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<Session, AuthError> {
        let mut creds = oauth::exchange_code(&self.config, code, verifier, redirect_uri)
            .await
            .map_err(|err| AuthError::new("token-exchange", format!("{err:#}")))?;

        match oauth::fetch_display_name(&self.config, &creds.access).await {
            Ok(name) => creds.display_name = name,
            Err(err) => tracing::warn!("Could not fetch profile: {err}"),
        }

        if let Err(err) = oauth::save_credentials(&creds) {
            tracing::warn!("Could not cache credentials: {err}");
        }

        let session = Session {
            display_name: creds.display_name,
        };
        self.sessions.send_replace(Some(session.clone()));
        Ok(session)
    }
}

/// Waits for the single browser callback on the loopback listener.
async fn wait_for_callback(listener: TcpListener) -> Result<CallbackParams, AuthError> {
    let accepted = tokio::time::timeout(CALLBACK_TIMEOUT, listener.accept()).await;

    let (mut stream, _addr) = match accepted {
        Ok(Ok(conn)) => conn,
        Ok(Err(err)) => {
            return Err(AuthError::new(
                CODE_POPUP_CLOSED,
                format!("The sign-in callback failed: {err}"),
            ));
        }
        Err(_) => {
            return Err(AuthError::new(
                CODE_POPUP_CLOSED,
                "The sign-in window was closed before completing",
            ));
        }
    };

    let mut buf = vec![0u8; 8192];
    let read = stream.read(&mut buf).await.map_err(|err| {
        AuthError::new(
            CODE_POPUP_CLOSED,
            format!("The sign-in callback failed: {err}"),
        )
    })?;
    let request = String::from_utf8_lossy(&buf[..read]);

    let params = parse_callback_request(&request);

    let body = "<html><body>Sign-in received. You can close this window.</body></html>";
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;

    Ok(params)
}

/// Extracts the callback query parameters from a raw HTTP request.
fn parse_callback_request(request: &str) -> CallbackParams {
    let mut params = CallbackParams::default();

    let Some(request_line) = request.lines().next() else {
        return params;
    };
    let Some(target) = request_line.split_whitespace().nth(1) else {
        return params;
    };
    let Some((_, query)) = target.split_once('?') else {
        return params;
    };

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            "error_description" => params.error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exactly the two popup codes escalate to the redirect fallback.
    #[test]
    fn test_recoverable_classification() {
        assert!(AuthError::new(CODE_POPUP_BLOCKED, "blocked").is_recoverable());
        assert!(AuthError::new(CODE_POPUP_CLOSED, "closed").is_recoverable());
        assert!(!AuthError::new("access_denied", "denied").is_recoverable());
        assert!(!AuthError::new("token-exchange", "failed").is_recoverable());
    }

    /// Error display carries both message and code.
    #[test]
    fn test_error_display() {
        let err = AuthError::new("access_denied", "The user said no");
        assert_eq!(err.to_string(), "The user said no (Code: access_denied)");
    }

    /// Welcome name falls back to the generic label.
    #[test]
    fn test_display_name_fallback() {
        let named = Session {
            display_name: Some("Ana".to_string()),
        };
        assert_eq!(named.display_name_or_default(), "Ana");

        let unnamed = Session { display_name: None };
        assert_eq!(unnamed.display_name_or_default(), "User");

        let empty = Session {
            display_name: Some(String::new()),
        };
        assert_eq!(empty.display_name_or_default(), "User");
    }

    /// Callback request parsing: code + state.
    #[test]
    fn test_parse_callback_request_success() {
        let request = "GET /callback?code=abc&state=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let params = parse_callback_request(request);
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
        assert_eq!(params.error, None);
    }

    /// Callback request parsing: provider error.
    #[test]
    fn test_parse_callback_request_error() {
        let request = "GET /callback?error=access_denied&error_description=User%20denied HTTP/1.1\r\n\r\n";
        let params = parse_callback_request(request);
        assert_eq!(params.code, None);
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.error_description.as_deref(), Some("User denied"));
    }

    /// Callback request parsing: no query is an empty result, not a panic.
    #[test]
    fn test_parse_callback_request_no_query() {
        let params = parse_callback_request("GET /favicon.ico HTTP/1.1\r\n\r\n");
        assert_eq!(params, CallbackParams::default());
    }

    /// Session watch: subscribers observe every transition.
    #[tokio::test]
    async fn test_session_watch_notifications() {
        let client = AuthClient {
            config: crate::config::AuthConfig::default(),
            sessions: watch::channel(None).0,
        };

        let mut rx = client.subscribe();
        assert!(rx.borrow().is_none());

        client.sessions.send_replace(Some(Session {
            display_name: Some("Ana".to_string()),
        }));
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow().as_ref().unwrap().display_name.as_deref(),
            Some("Ana")
        );

        client.sessions.send_replace(None);
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }
}
