use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::VerifyTokenError;
use crate::domain::ports::{IdentityVerifier, VerifiedIdentity};

// Auth verification response consumed by the join path.
#[derive(Debug, Clone, Deserialize)]
struct VerifyTokenResponse {
    user_id: u64,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct VerifyTokenRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

// Thin reqwest client for auth token verification.
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
            let body = response
                .json::<VerifyTokenResponse>()
                .await
                .map_err(|_| VerifyTokenError::UpstreamUnavailable)?;
            return Ok(VerifiedIdentity {
                user_id: body.user_id.to_string(),
                display_name: body.display_name,
            });
        }

        if response.status() == StatusCode::UNAUTHORIZED {
            let error = response
                .json::<ErrorResponse>()
                .await
                .map_err(|_| VerifyTokenError::UpstreamUnavailable)?;

            // TODO: switch to stable machine-readable error codes from auth.
            if error.message == "session expired" {
                return Err(VerifyTokenError::SessionExpired);
            }
            return Err(VerifyTokenError::InvalidToken);
        }

        Err(VerifyTokenError::UpstreamUnavailable)
    }
}

#[async_trait]
impl IdentityVerifier for AuthClient {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, VerifyTokenError> {
        self.verify_token(credential).await
    }
}
