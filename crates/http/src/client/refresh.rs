//! Token refresh endpoint client

use super::error::RefreshFailure;
use super::token::TokenRefresher;
use crate::types::{TokenRefreshRequest, TokenRefreshResponse};
use async_trait::async_trait;
use tracing::debug;

/// Exchanges a refresh token at `POST <refresh_url> {refresh} -> {access}`.
///
/// Uses a plain `reqwest::Client`: the refresh call carries no bearer token
/// and never goes through the 401 handling of [`super::DevTrackClient`].
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    http: reqwest::Client,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshFailure> {
        debug!(url = %self.url, "Requesting new access token");
        let response = self
            .http
            .post(&self.url)
            .json(&TokenRefreshRequest {
                refresh: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(RefreshFailure::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenRefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshFailure::InvalidResponse(e.to_string()))?;
        if body.access.is_empty() {
            return Err(RefreshFailure::InvalidResponse(
                "empty access token".to_string(),
            ));
        }
        Ok(body.access)
    }
}
