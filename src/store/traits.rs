//! Backend-agnostic `Database` trait and the row types it speaks.
//!
//! The API layer and the ingestor only ever see this trait; the libSQL
//! backend is the one implementation. Fragment rows carry their own ids so
//! the API can address them (completing an action item) without exposing
//! backend rowids.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::DatabaseError;
use crate::pipeline::types::{AnnotatedEmail, Category, EntityKind, Sentiment};

/// A registered mailbox owner with Gmail OAuth state.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A persisted annotated email, without its fragment lists.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEmail {
    pub id: String,
    pub gmail_id: String,
    pub subject: String,
    pub sender: String,
    pub sender_email: String,
    pub received_at: DateTime<Utc>,
    pub summary: String,
    pub category: Category,
    pub sentiment: Sentiment,
    pub sentiment_score: f64,
    pub priority_score: f64,
    pub is_important: bool,
    pub is_starred: bool,
    pub needs_followup: bool,
    pub followup_date: Option<NaiveDate>,
}

/// A stored email plus everything extracted from it.
#[derive(Debug, Clone, Serialize)]
pub struct EmailDetail {
    #[serde(flatten)]
    pub email: StoredEmail,
    pub body: String,
    pub entities: Vec<StoredEntity>,
    pub keywords: Vec<StoredKeyword>,
    pub action_items: Vec<StoredActionItem>,
    pub contacts: Vec<StoredContact>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredEntity {
    pub id: String,
    pub email_id: String,
    pub text: String,
    pub kind: EntityKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredKeyword {
    pub id: String,
    pub email_id: String,
    pub word: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredActionItem {
    pub id: String,
    pub email_id: String,
    pub text: String,
    pub deadline: Option<DateTime<Utc>>,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredContact {
    pub id: String,
    pub email_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
}

/// Listing filters for the inbox view. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EmailFilter {
    pub starred: Option<bool>,
    pub important: Option<bool>,
    pub category: Option<Category>,
    pub sentiment: Option<Sentiment>,
    pub needs_followup: Option<bool>,
    pub limit: Option<usize>,
}

/// Aggregate counts for the dashboard header.
#[derive(Debug, Clone, Serialize)]
pub struct EmailStats {
    pub total: i64,
    pub important: i64,
    pub needs_followup: i64,
    pub open_action_items: i64,
    pub avg_priority: f64,
    pub by_category: Vec<(String, i64)>,
    pub by_sentiment: Vec<(String, i64)>,
}

/// Persistence interface for users, emails, and extracted fragments.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    /// Insert a user, or return the existing record for the address.
    async fn upsert_user(&self, email: &str, name: Option<&str>)
        -> Result<StoredUser, DatabaseError>;

    /// Get a user by id.
    async fn get_user(&self, user_id: &str) -> Result<Option<StoredUser>, DatabaseError>;

    /// Replace a user's OAuth tokens after connect or refresh.
    async fn update_user_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        token_expiry: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    // ── Emails ──────────────────────────────────────────────────────

    /// Persist one annotated email with all its fragments. Re-annotating a
    /// gmail_id the user already has replaces the stored annotation and
    /// fragments. Returns the email row id.
    async fn save_annotated_email(
        &self,
        user_id: &str,
        annotated: &AnnotatedEmail,
    ) -> Result<String, DatabaseError>;

    /// True if the user already has this provider message.
    async fn email_exists(&self, user_id: &str, gmail_id: &str) -> Result<bool, DatabaseError>;

    /// List a user's emails, newest first, honoring the filter.
    async fn list_emails(
        &self,
        user_id: &str,
        filter: &EmailFilter,
    ) -> Result<Vec<StoredEmail>, DatabaseError>;

    /// One email with its fragments.
    async fn get_email(
        &self,
        user_id: &str,
        email_id: &str,
    ) -> Result<Option<EmailDetail>, DatabaseError>;

    // ── Fragments ───────────────────────────────────────────────────

    async fn list_entities(&self, user_id: &str) -> Result<Vec<StoredEntity>, DatabaseError>;

    async fn list_keywords(&self, user_id: &str) -> Result<Vec<StoredKeyword>, DatabaseError>;

    async fn list_contacts(&self, user_id: &str) -> Result<Vec<StoredContact>, DatabaseError>;

    async fn list_action_items(
        &self,
        user_id: &str,
        include_completed: bool,
    ) -> Result<Vec<StoredActionItem>, DatabaseError>;

    /// Mark an action item complete (or not). `NotFound` when the item does
    /// not exist or belongs to another user.
    async fn set_action_item_completed(
        &self,
        user_id: &str,
        item_id: &str,
        completed: bool,
    ) -> Result<StoredActionItem, DatabaseError>;

    // ── Stats ───────────────────────────────────────────────────────

    async fn email_stats(&self, user_id: &str) -> Result<EmailStats, DatabaseError>;
}
