use crate::domain::PlayerId;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Identity returned by the auth service for a verified credential token.
// Only the numeric id matters to the arena; it keys the player entity and
// stays stable across reconnects.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedIdentity {
    pub user_id: PlayerId,
    pub expires_at: u64,
}

#[derive(Debug, Serialize)]
struct VerifyTokenRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    message: String,
}

#[derive(Debug)]
pub enum VerifyTokenError {
    /// The token was rejected; the client should re-login.
    Rejected,
    /// The auth service could not be reached or answered garbage.
    UpstreamUnavailable,
}

// Thin reqwest client for credential verification. Authentication itself is
// an external collaborator; this is its only contact point with the core.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, VerifyTokenError> {
        let url = format!("{}/auth/verify-token", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&VerifyTokenRequest { token })
            .send()
            .await
            .map_err(|_| VerifyTokenError::UpstreamUnavailable)?;

        if response.status().is_success() {
            return response
                .json::<VerifiedIdentity>()
                .await
                .map_err(|_| VerifyTokenError::UpstreamUnavailable);
        }

        if response.status() == StatusCode::UNAUTHORIZED {
            // The body distinguishes expired from invalid; both end the same
            // way for the arena, so just log the reason.
            if let Ok(body) = response.json::<AuthErrorBody>().await {
                tracing::debug!(reason = %body.message, "token rejected by auth");
            }
            return Err(VerifyTokenError::Rejected);
        }

        Err(VerifyTokenError::UpstreamUnavailable)
    }
}
