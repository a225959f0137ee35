//! Gmail REST client.
//!
//! Thin wrapper over `users.messages.list` / `users.messages.get` for the
//! authenticated user. Message parsing failures are logged and skipped so a
//! single malformed message never sinks a fetch batch.

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::GmailError;
use crate::gmail::parse::{self, MessageResource};
use crate::pipeline::types::RawEmail;

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

#[derive(Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

pub struct GmailClient {
    http: reqwest::Client,
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// List recent message ids, optionally restricted by a Gmail search
    /// query such as `is:starred`.
    pub async fn list_message_ids(
        &self,
        access_token: &str,
        query: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<String>, GmailError> {
        let mut request = self
            .http
            .get(format!("{API_BASE}/messages"))
            .bearer_auth(access_token)
            .query(&[("maxResults", max_results.to_string())]);
        if let Some(q) = query {
            request = request.query(&[("q", q)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GmailError::Request(format!("List request failed: {e}")))?;
        let response = check_status(response).await?;

        let list: MessageListResponse = response
            .json()
            .await
            .map_err(|e| GmailError::Request(format!("Bad list response: {e}")))?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    /// Fetch one full message resource and parse it.
    pub async fn get_message(
        &self,
        access_token: &str,
        message_id: &str,
    ) -> Result<RawEmail, GmailError> {
        let response = self
            .http
            .get(format!("{API_BASE}/messages/{message_id}"))
            .bearer_auth(access_token)
            .query(&[("format", "full")])
            .send()
            .await
            .map_err(|e| GmailError::Request(format!("Get request failed: {e}")))?;
        let response = check_status(response).await?;

        let resource: MessageResource = response
            .json()
            .await
            .map_err(|e| GmailError::Request(format!("Bad message response: {e}")))?;
        parse::parse_message(&resource, Utc::now())
    }

    /// Fetch the newest `max_results` messages. Messages that fail to parse
    /// are skipped with a warning, not returned as errors.
    pub async fn fetch_recent(
        &self,
        access_token: &str,
        max_results: usize,
    ) -> Result<Vec<RawEmail>, GmailError> {
        let ids = self.list_message_ids(access_token, None, max_results).await?;
        debug!(count = ids.len(), "Listed recent messages");

        let mut emails = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.get_message(access_token, id).await {
                Ok(email) => emails.push(email),
                Err(GmailError::MalformedMessage(reason)) => {
                    warn!(message_id = %id, %reason, "Skipping malformed message");
                }
                Err(other) => return Err(other),
            }
        }
        Ok(emails)
    }
}

/// Map non-success responses to errors; a 401 means the token is stale.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GmailError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GmailError::TokenExpired);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GmailError::Status {
        status: status.as_u16(),
        body,
    })
}
