//! Google OAuth token refresh.
//!
//! The authorization-code dance happens in the frontend; this side only
//! exchanges a stored refresh token for a fresh access token when the old
//! one expires.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GoogleConfig;
use crate::error::GmailError;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Google occasionally rotates the refresh token on refresh.
    pub new_refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

/// Google OAuth client. Holds app credentials, never user tokens.
pub struct GoogleOAuth {
    client_id: String,
    client_secret: SecretString,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<AccessToken, GmailError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| GmailError::TokenRefresh(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token refresh rejected");
            return Err(GmailError::TokenRefresh(format!(
                "Status {}: {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GmailError::TokenRefresh(format!("Bad token response: {e}")))?;

        debug!(expires_in = token.expires_in, "Access token refreshed");
        Ok(AccessToken {
            token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
            new_refresh_token: token.refresh_token,
        })
    }
}
