//! Bot-verification client.
//!
//! Talks to a hosted challenge service: fetch a challenge, submit the
//! user's answer, receive a response token. The token is held locally by
//! [`CaptchaWidget`] until the submission pipeline consumes it; resetting
//! the widget forces a fresh pass for the next submission.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::CaptchaConfig;

/// A challenge issued by the verification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    /// Human-readable prompt shown to the user.
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    token: String,
}

/// HTTP client for the challenge service.
#[derive(Clone)]
pub struct CaptchaClient {
    http: reqwest::Client,
    base_url: String,
}

impl CaptchaClient {
    pub fn new(config: &CaptchaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetches a fresh challenge.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub async fn challenge(&self) -> Result<Challenge> {
        let url = format!("{}/challenge", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to request challenge")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Challenge request failed (HTTP {status}): {body}");
        }

        response.json().await.context("Failed to parse challenge")
    }

    /// Submits an answer; a correct answer yields a response token.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub async fn verify(&self, challenge_id: &str, answer: &str) -> Result<String> {
        let url = format!("{}/verify", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "id": challenge_id,
                "answer": answer.trim(),
            }))
            .send()
            .await
            .context("Failed to submit challenge answer")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Verification failed (HTTP {status}): {body}");
        }

        let verified: VerifyResponse = response
            .json()
            .await
            .context("Failed to parse verification response")?;
        Ok(verified.token)
    }
}

/// Local state of the verification widget.
///
/// Mirrors the narrow surface the submission pipeline reads: the current
/// response token (empty while unverified) and a reset that discards it.
#[derive(Debug, Default)]
pub struct CaptchaWidget {
    token: Option<String>,
}

impl CaptchaWidget {
    /// Current response token, or the empty string while unverified.
    pub fn response_token(&self) -> &str {
        self.token.as_deref().unwrap_or("")
    }

    pub fn is_verified(&self) -> bool {
        self.token.is_some()
    }

    /// Stores a token issued by the service.
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Returns the widget to its unverified state.
    pub fn reset(&mut self) {
        self.token = None;
    }
}
