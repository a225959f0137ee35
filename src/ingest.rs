//! Fetch-and-annotate ingestion.
//!
//! One `Ingestor` per process: refreshes the user's access token when stale,
//! pulls the newest messages, runs the annotation pipeline, and persists the
//! results. A failure on one email is logged and counted, never allowed to
//! stop the rest of the batch.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{Error, GmailError};
use crate::gmail::{GmailClient, GoogleOAuth};
use crate::pipeline::annotator::Annotator;
use crate::store::{Database, StoredUser};

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub fetched: usize,
    pub saved_new: usize,
    pub updated: usize,
    pub failed: usize,
}

pub struct Ingestor {
    db: Arc<dyn Database>,
    gmail: GmailClient,
    oauth: Option<GoogleOAuth>,
    annotator: Annotator,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(db: Arc<dyn Database>, oauth: Option<GoogleOAuth>, batch_size: usize) -> Self {
        Self {
            db,
            gmail: GmailClient::new(),
            oauth,
            annotator: Annotator::new(),
            batch_size,
        }
    }

    /// Fetch the user's newest messages, annotate them, and persist.
    ///
    /// Already-stored messages are re-annotated in place so flag changes and
    /// pipeline improvements propagate on re-fetch.
    pub async fn fetch_and_process(&self, user_id: &str) -> Result<IngestReport, Error> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| crate::error::DatabaseError::NotFound {
                entity: "user".into(),
                id: user_id.into(),
            })?;

        let access_token = self.ensure_fresh_token(&user).await?;

        let emails = self
            .gmail
            .fetch_recent(&access_token, self.batch_size)
            .await
            .map_err(Error::Gmail)?;

        let now = Utc::now();
        let mut report = IngestReport {
            fetched: emails.len(),
            ..Default::default()
        };

        for email in &emails {
            let existed = match self.db.email_exists(user_id, &email.gmail_id).await {
                Ok(existed) => existed,
                Err(e) => {
                    error!(gmail_id = %email.gmail_id, error = %e, "Dedup check failed");
                    report.failed += 1;
                    continue;
                }
            };

            let annotated = self.annotator.annotate(email, now);
            match self.db.save_annotated_email(user_id, &annotated).await {
                Ok(_) => {
                    if existed {
                        report.updated += 1;
                    } else {
                        report.saved_new += 1;
                    }
                }
                Err(e) => {
                    error!(gmail_id = %email.gmail_id, error = %e, "Failed to save email");
                    report.failed += 1;
                }
            }
        }

        info!(
            user_id = %user_id,
            fetched = report.fetched,
            saved_new = report.saved_new,
            updated = report.updated,
            failed = report.failed,
            "Ingestion run complete"
        );
        Ok(report)
    }

    /// Return a usable access token, refreshing it first if it has expired.
    async fn ensure_fresh_token(&self, user: &StoredUser) -> Result<String, Error> {
        let access_token = user
            .access_token
            .clone()
            .ok_or_else(|| GmailError::NotConnected(user.id.clone()))?;

        let expired = user
            .token_expiry
            .map(|expiry| expiry <= Utc::now())
            .unwrap_or(false);
        if !expired {
            return Ok(access_token);
        }

        let Some(oauth) = &self.oauth else {
            warn!(user_id = %user.id, "Token expired and OAuth is not configured");
            return Err(GmailError::TokenExpired.into());
        };
        let refresh_token = user
            .refresh_token
            .as_deref()
            .ok_or(GmailError::TokenExpired)?;

        let fresh = oauth.refresh_access_token(refresh_token).await?;
        self.db
            .update_user_tokens(
                &user.id,
                &fresh.token,
                fresh.new_refresh_token.as_deref(),
                fresh.expires_at,
            )
            .await?;
        info!(user_id = %user.id, "Refreshed access token");
        Ok(fresh.token)
    }
}
