//! OAuth plumbing: PKCE, authorization URLs, token exchange, and the
//! credential cache.
//!
//! Credentials live in `${REVU_HOME}/oauth.json` with restricted
//! permissions (0600). Tokens are never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{AuthConfig, paths};

/// OAuth token cache filename.
const OAUTH_CACHE_FILE: &str = "oauth.json";

/// Deferred-flow state filename.
const PENDING_AUTH_FILE: &str = "pending_auth.json";

/// File the user (or `revu login --paste`) drops the redirected callback
/// URL into for deferred-flow completion.
const REDIRECT_CALLBACK_FILE: &str = "redirect_callback";

/// Local OAuth callback path (port is dynamic).
pub const LOCAL_CALLBACK_PATH: &str = "/callback";

pub(crate) fn now_millis_u64() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or(u64::MAX)
}

/// Cached OAuth credentials plus the profile captured at exchange time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthCredentials {
    /// Credential type (always "oauth")
    #[serde(rename = "type")]
    pub cred_type: String,
    /// The refresh token (long-lived, may be empty)
    pub refresh: String,
    /// The access token (short-lived)
    pub access: String,
    /// Expiry timestamp in milliseconds since epoch
    pub expires: u64,
    /// Display name from the provider's userinfo endpoint, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl OAuthCredentials {
    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        now_millis_u64() >= self.expires
    }
}

fn cache_path() -> PathBuf {
    paths::revu_home().join(OAUTH_CACHE_FILE)
}

fn pending_path() -> PathBuf {
    paths::revu_home().join(PENDING_AUTH_FILE)
}

fn callback_path() -> PathBuf {
    paths::revu_home().join(REDIRECT_CALLBACK_FILE)
}

/// Loads cached credentials, if any.
///
/// # Errors
/// Returns an error if the operation fails.
pub fn load_credentials() -> Result<Option<OAuthCredentials>> {
    let path = cache_path();
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read OAuth cache from {}", path.display()))?;
    let creds = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse OAuth cache from {}", path.display()))?;
    Ok(Some(creds))
}

/// Saves credentials to disk with restricted permissions (0600).
///
/// # Errors
/// Returns an error if the operation fails.
pub fn save_credentials(creds: &OAuthCredentials) -> Result<()> {
    let path = cache_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let contents = serde_json::to_string_pretty(creds).context("Failed to serialize OAuth cache")?;
    write_restricted(&path, &contents)
}

/// Removes cached credentials. Returns whether any were present.
///
/// # Errors
/// Returns an error if the operation fails.
pub fn clear_credentials() -> Result<bool> {
    let path = cache_path();
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path)
        .with_context(|| format!("Failed to remove OAuth cache at {}", path.display()))?;
    Ok(true)
}

fn write_restricted(path: &PathBuf, contents: &str) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("Failed to open {} for writing", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    Ok(())
}

/// PKCE code verifier and challenge
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

/// Generate PKCE code verifier and challenge
pub fn generate_pkce() -> Pkce {
    // Use two UUIDs (16 bytes each) to get 32 random bytes
    let uuid1 = uuid::Uuid::new_v4();
    let uuid2 = uuid::Uuid::new_v4();
    let mut verifier_bytes = [0u8; 32];
    verifier_bytes[..16].copy_from_slice(uuid1.as_bytes());
    verifier_bytes[16..].copy_from_slice(uuid2.as_bytes());
    let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());

    Pkce {
        verifier,
        challenge,
    }
}

/// Builds the authorization URL.
///
/// Always forces the provider's account chooser; a cached account choice
/// is never reused silently.
pub fn build_auth_url(auth: &AuthConfig, pkce: &Pkce, state: &str, redirect_uri: &str) -> String {
    let params = [
        ("response_type", "code"),
        ("client_id", auth.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", auth.scopes.as_str()),
        ("code_challenge", pkce.challenge.as_str()),
        ("code_challenge_method", "S256"),
        ("state", state),
        ("prompt", "select_account"),
    ];

    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    format!("{}?{query}", auth.authorize_url)
}

/// Builds the redirect URI for a given localhost port.
pub fn build_redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}{LOCAL_CALLBACK_PATH}")
}

/// Generates a random high localhost port for OAuth callbacks.
pub fn random_local_port() -> u16 {
    let id = uuid::Uuid::new_v4();
    let bytes = id.as_bytes();
    let raw = u16::from_le_bytes([bytes[0], bytes[1]]);
    49152 + (raw % 16384)
}

/// Parses a pasted authorization input into code + optional state.
///
/// Accepts a full callback URL, a `code#state` pair, a raw query string,
/// or a bare code.
pub fn parse_authorization_input(input: &str) -> (Option<String>, Option<String>) {
    let value = input.trim();
    if value.is_empty() {
        return (None, None);
    }

    if let Ok(url) = url::Url::parse(value) {
        let code = url.query_pairs().find(|(k, _)| k == "code").map(|(_, v)| v);
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v);
        return (code.map(|v| v.to_string()), state.map(|v| v.to_string()));
    }

    if let Some((code, state)) = value.split_once('#') {
        return (Some(code.to_string()), Some(state.to_string()));
    }

    if value.contains("code=") {
        let params = url::form_urlencoded::parse(value.as_bytes()).collect::<Vec<_>>();
        let code = params.iter().find(|(k, _)| k == "code").map(|(_, v)| v);
        let state = params.iter().find(|(k, _)| k == "state").map(|(_, v)| v);
        return (
            code.map(std::string::ToString::to_string),
            state.map(std::string::ToString::to_string),
        );
    }

    (Some(value.to_string()), None)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: u64,
}

fn compute_expires_at(expires_in_secs: u64) -> u64 {
    let now = now_millis_u64();
    now + (expires_in_secs * 1000).saturating_sub(5 * 60 * 1000)
}

/// Exchanges an authorization code for tokens.
///
/// # Errors
/// Returns an error if the operation fails.
pub async fn exchange_code(
    auth: &AuthConfig,
    code: &str,
    verifier: &str,
    redirect_uri: &str,
) -> Result<OAuthCredentials> {
    let client = reqwest::Client::new();
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "authorization_code")
        .append_pair("client_id", &auth.client_id)
        .append_pair("code", code)
        .append_pair("code_verifier", verifier)
        .append_pair("redirect_uri", redirect_uri)
        .finish();

    let response = client
        .post(&auth.token_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await
        .context("Failed to send token exchange request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Token exchange failed (HTTP {status}): {body}");
    }

    let token_data: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    Ok(OAuthCredentials {
        cred_type: "oauth".to_string(),
        refresh: token_data.refresh_token.unwrap_or_default(),
        access: token_data.access_token,
        expires: compute_expires_at(token_data.expires_in),
        display_name: None,
    })
}

/// Refreshes an expired access token.
///
/// # Errors
/// Returns an error if the operation fails.
pub async fn refresh_token(auth: &AuthConfig, refresh: &str) -> Result<OAuthCredentials> {
    let client = reqwest::Client::new();
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "refresh_token")
        .append_pair("client_id", &auth.client_id)
        .append_pair("refresh_token", refresh)
        .finish();

    let response = client
        .post(&auth.token_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await
        .context("Failed to send token refresh request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Token refresh failed (HTTP {status}): {body}");
    }

    let token_data: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    Ok(OAuthCredentials {
        cred_type: "oauth".to_string(),
        refresh: token_data
            .refresh_token
            .unwrap_or_else(|| refresh.to_string()),
        access: token_data.access_token,
        expires: compute_expires_at(token_data.expires_in),
        display_name: None,
    })
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    name: Option<String>,
}

/// Fetches the display name from the userinfo endpoint.
///
/// # Errors
/// Returns an error if the operation fails.
pub async fn fetch_display_name(auth: &AuthConfig, access_token: &str) -> Result<Option<String>> {
    let client = reqwest::Client::new();
    let response = client
        .get(&auth.userinfo_url)
        .header("Authorization", format!("Bearer {access_token}"))
        .send()
        .await
        .context("Failed to request userinfo")?;

    if !response.status().is_success() {
        let status = response.status();
        anyhow::bail!("Userinfo request failed (HTTP {status})");
    }

    let info: UserInfo = response.json().await.context("Failed to parse userinfo")?;
    Ok(info.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()))
}

/// State persisted for the deferred redirect flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuth {
    pub verifier: String,
    pub state: String,
    pub redirect_uri: String,
    /// Millis since epoch when the flow started.
    pub created: u64,
}

/// Persists deferred-flow state for completion on a later launch.
///
/// # Errors
/// Returns an error if the operation fails.
pub fn save_pending(pending: &PendingAuth) -> Result<()> {
    let path = pending_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let contents =
        serde_json::to_string_pretty(pending).context("Failed to serialize pending auth")?;
    write_restricted(&path, &contents)
}

/// Loads deferred-flow state, if a redirect sign-in is pending.
///
/// # Errors
/// Returns an error if the operation fails.
pub fn load_pending() -> Result<Option<PendingAuth>> {
    let path = pending_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read pending auth from {}", path.display()))?;
    let pending = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse pending auth from {}", path.display()))?;
    Ok(Some(pending))
}

/// Removes deferred-flow state.
pub fn clear_pending() {
    let _ = fs::remove_file(pending_path());
}

/// Records the redirected callback URL for deferred-flow completion.
///
/// # Errors
/// Returns an error if the operation fails.
pub fn write_redirect_callback(input: &str) -> Result<()> {
    let path = callback_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(&path, input.trim())
        .with_context(|| format!("Failed to write callback to {}", path.display()))
}

/// Takes (reads and removes) the recorded callback URL, if present.
pub fn take_redirect_callback() -> Option<String> {
    let path = callback_path();
    let contents = fs::read_to_string(&path).ok()?;
    let _ = fs::remove_file(&path);
    let trimmed = contents.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}
