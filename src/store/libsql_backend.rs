//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. Dates are stored as RFC 3339
//! text; enums as their stable string forms.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, Value, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::pipeline::types::{AnnotatedEmail, Category, EntityKind, Sentiment};
use crate::store::migrations;
use crate::store::traits::{
    Database, EmailDetail, EmailFilter, EmailStats, StoredActionItem, StoredContact, StoredEmail,
    StoredEntity, StoredKeyword, StoredUser,
};

/// libSQL database backend.
///
/// Stores a single connection reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn delete_fragments(&self, email_id: &str) -> Result<(), DatabaseError> {
        for table in ["entities", "keywords", "action_items", "contacts"] {
            self.conn()
                .execute(
                    &format!("DELETE FROM {table} WHERE email_id = ?1"),
                    params![email_id],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("Failed to clear {table}: {e}")))?;
        }
        Ok(())
    }

    async fn insert_fragments(
        &self,
        user_id: &str,
        email_id: &str,
        annotated: &AnnotatedEmail,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();

        for entity in &annotated.entities {
            conn.execute(
                "INSERT INTO entities (id, email_id, user_id, text, kind) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    email_id,
                    user_id,
                    entity.text.as_str(),
                    entity.kind.as_str()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to insert entity: {e}")))?;
        }

        for keyword in &annotated.keywords {
            conn.execute(
                "INSERT INTO keywords (id, email_id, user_id, word, score) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    email_id,
                    user_id,
                    keyword.word.as_str(),
                    keyword.score
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to insert keyword: {e}")))?;
        }

        for item in &annotated.action_items {
            conn.execute(
                "INSERT INTO action_items (id, email_id, user_id, text, deadline, completed) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    email_id,
                    user_id,
                    item.text.as_str(),
                    item.deadline.map(|d| d.to_rfc3339()),
                    item.completed as i64
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to insert action item: {e}")))?;
        }

        for contact in &annotated.contacts {
            conn.execute(
                "INSERT INTO contacts (id, email_id, user_id, name, email, phone, company, position) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    Uuid::new_v4().to_string(),
                    email_id,
                    user_id,
                    contact.name.as_str(),
                    contact.email.as_str(),
                    contact.phone.clone(),
                    contact.company.clone(),
                    contact.position.clone()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to insert contact: {e}")))?;
        }

        Ok(())
    }

    async fn email_id_for_gmail_id(
        &self,
        user_id: &str,
        gmail_id: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id FROM emails WHERE user_id = ?1 AND gmail_id = ?2",
                params![user_id, gmail_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to look up email: {e}")))?;
        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read email row: {e}")))?
        {
            Some(row) => Ok(Some(row.get::<String>(0).map_err(row_err)?)),
            None => Ok(None),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

fn row_err(e: libsql::Error) -> DatabaseError {
    DatabaseError::Query(format!("Failed to read column: {e}"))
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Read a nullable TEXT column. NULL (or any non-text value) reads as None.
fn opt_text(row: &libsql::Row, idx: i32) -> Option<String> {
    row.get::<String>(idx).ok()
}

const EMAIL_COLUMNS: &str = "id, gmail_id, subject, sender, sender_email, received_at, summary, \
     category, sentiment, sentiment_score, priority_score, is_important, is_starred, \
     needs_followup, followup_date";

fn row_to_email(row: &libsql::Row) -> Result<StoredEmail, DatabaseError> {
    let received: String = row.get(5).map_err(row_err)?;
    let category: String = row.get(7).map_err(row_err)?;
    let sentiment: String = row.get(8).map_err(row_err)?;
    Ok(StoredEmail {
        id: row.get(0).map_err(row_err)?,
        gmail_id: row.get(1).map_err(row_err)?,
        subject: row.get(2).map_err(row_err)?,
        sender: row.get(3).map_err(row_err)?,
        sender_email: row.get(4).map_err(row_err)?,
        received_at: parse_datetime(&received),
        summary: row.get(6).map_err(row_err)?,
        category: Category::parse(&category).unwrap_or(Category::Other),
        sentiment: Sentiment::parse(&sentiment).unwrap_or(Sentiment::Neutral),
        sentiment_score: row.get(9).map_err(row_err)?,
        priority_score: row.get(10).map_err(row_err)?,
        is_important: row.get::<i64>(11).map_err(row_err)? != 0,
        is_starred: row.get::<i64>(12).map_err(row_err)? != 0,
        needs_followup: row.get::<i64>(13).map_err(row_err)? != 0,
        followup_date: opt_text(row, 14).and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
    })
}

fn row_to_user(row: &libsql::Row) -> Result<StoredUser, DatabaseError> {
    let created: String = row.get(6).map_err(row_err)?;
    Ok(StoredUser {
        id: row.get(0).map_err(row_err)?,
        email: row.get(1).map_err(row_err)?,
        name: opt_text(row, 2),
        access_token: opt_text(row, 3),
        refresh_token: opt_text(row, 4),
        token_expiry: opt_text(row, 5).map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&created),
    })
}

fn row_to_entity(row: &libsql::Row) -> Result<StoredEntity, DatabaseError> {
    let kind: String = row.get(3).map_err(row_err)?;
    Ok(StoredEntity {
        id: row.get(0).map_err(row_err)?,
        email_id: row.get(1).map_err(row_err)?,
        text: row.get(2).map_err(row_err)?,
        kind: EntityKind::parse(&kind).unwrap_or(EntityKind::Person),
    })
}

fn row_to_keyword(row: &libsql::Row) -> Result<StoredKeyword, DatabaseError> {
    Ok(StoredKeyword {
        id: row.get(0).map_err(row_err)?,
        email_id: row.get(1).map_err(row_err)?,
        word: row.get(2).map_err(row_err)?,
        score: row.get(3).map_err(row_err)?,
    })
}

fn row_to_action_item(row: &libsql::Row) -> Result<StoredActionItem, DatabaseError> {
    Ok(StoredActionItem {
        id: row.get(0).map_err(row_err)?,
        email_id: row.get(1).map_err(row_err)?,
        text: row.get(2).map_err(row_err)?,
        deadline: opt_text(row, 3).map(|s| parse_datetime(&s)),
        completed: row.get::<i64>(4).map_err(row_err)? != 0,
    })
}

fn row_to_contact(row: &libsql::Row) -> Result<StoredContact, DatabaseError> {
    Ok(StoredContact {
        id: row.get(0).map_err(row_err)?,
        email_id: row.get(1).map_err(row_err)?,
        name: row.get(2).map_err(row_err)?,
        email: row.get(3).map_err(row_err)?,
        phone: opt_text(row, 4),
        company: opt_text(row, 5),
        position: opt_text(row, 6),
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn upsert_user(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<StoredUser, DatabaseError> {
        let conn = self.conn();
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO users (id, email, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(email) DO UPDATE SET
                 name = COALESCE(excluded.name, users.name),
                 updated_at = datetime('now')",
            params![id.as_str(), email, name],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to upsert user: {e}")))?;

        let mut rows = conn
            .query(
                "SELECT id, email, name, access_token, refresh_token, token_expiry, created_at \
                 FROM users WHERE email = ?1",
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read user: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read user row: {e}")))?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "user".into(),
                id: email.into(),
            })?;
        row_to_user(&row)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<StoredUser>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, email, name, access_token, refresh_token, token_expiry, created_at \
                 FROM users WHERE id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read user: {e}")))?;
        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read user row: {e}")))?
        {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_user_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        token_expiry: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE users SET access_token = ?2,
                     refresh_token = COALESCE(?3, refresh_token),
                     token_expiry = ?4,
                     updated_at = datetime('now')
                 WHERE id = ?1",
                params![
                    user_id,
                    access_token,
                    refresh_token,
                    token_expiry.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to update tokens: {e}")))?;
        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "user".into(),
                id: user_id.into(),
            });
        }
        Ok(())
    }

    // ── Emails ──────────────────────────────────────────────────────

    async fn save_annotated_email(
        &self,
        user_id: &str,
        annotated: &AnnotatedEmail,
    ) -> Result<String, DatabaseError> {
        let conn = self.conn();
        let existing = self
            .email_id_for_gmail_id(user_id, &annotated.raw.gmail_id)
            .await?;

        let email_id = match existing {
            Some(id) => {
                // Re-fetch: overwrite the annotation, replace the fragments.
                conn.execute(
                    "UPDATE emails SET subject = ?2, sender = ?3, sender_email = ?4,
                         received_at = ?5, body = ?6, summary = ?7, category = ?8,
                         sentiment = ?9, sentiment_score = ?10, priority_score = ?11,
                         is_important = ?12, is_starred = ?13, needs_followup = ?14,
                         followup_date = ?15, updated_at = datetime('now')
                     WHERE id = ?1",
                    params![
                        id.as_str(),
                        annotated.raw.subject.as_str(),
                        annotated.raw.sender.as_str(),
                        annotated.raw.sender_email.as_str(),
                        annotated.raw.received_at.to_rfc3339(),
                        annotated.normalized_body.as_str(),
                        annotated.summary.as_str(),
                        annotated.category.as_str(),
                        annotated.sentiment.label.as_str(),
                        annotated.sentiment.score,
                        annotated.priority_score,
                        annotated.is_important as i64,
                        annotated.raw.is_starred as i64,
                        annotated.needs_followup as i64,
                        annotated.followup_date.map(|d| d.to_string())
                    ],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("Failed to update email: {e}")))?;
                self.delete_fragments(&id).await?;
                id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                conn.execute(
                    "INSERT INTO emails (id, user_id, gmail_id, subject, sender, sender_email,
                         received_at, body, summary, category, sentiment, sentiment_score,
                         priority_score, is_important, is_starred, needs_followup, followup_date)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                    params![
                        id.as_str(),
                        user_id,
                        annotated.raw.gmail_id.as_str(),
                        annotated.raw.subject.as_str(),
                        annotated.raw.sender.as_str(),
                        annotated.raw.sender_email.as_str(),
                        annotated.raw.received_at.to_rfc3339(),
                        annotated.normalized_body.as_str(),
                        annotated.summary.as_str(),
                        annotated.category.as_str(),
                        annotated.sentiment.label.as_str(),
                        annotated.sentiment.score,
                        annotated.priority_score,
                        annotated.is_important as i64,
                        annotated.raw.is_starred as i64,
                        annotated.needs_followup as i64,
                        annotated.followup_date.map(|d| d.to_string())
                    ],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("Failed to insert email: {e}")))?;
                id
            }
        };

        self.insert_fragments(user_id, &email_id, annotated).await?;
        debug!(email_id = %email_id, gmail_id = %annotated.raw.gmail_id, "Saved annotated email");
        Ok(email_id)
    }

    async fn email_exists(&self, user_id: &str, gmail_id: &str) -> Result<bool, DatabaseError> {
        Ok(self.email_id_for_gmail_id(user_id, gmail_id).await?.is_some())
    }

    async fn list_emails(
        &self,
        user_id: &str,
        filter: &EmailFilter,
    ) -> Result<Vec<StoredEmail>, DatabaseError> {
        let mut sql = format!("SELECT {EMAIL_COLUMNS} FROM emails WHERE user_id = ?1");
        let mut args: Vec<Value> = vec![user_id.into()];

        if let Some(starred) = filter.starred {
            args.push((starred as i64).into());
            sql.push_str(&format!(" AND is_starred = ?{}", args.len()));
        }
        if let Some(important) = filter.important {
            args.push((important as i64).into());
            sql.push_str(&format!(" AND is_important = ?{}", args.len()));
        }
        if let Some(category) = filter.category {
            args.push(category.as_str().into());
            sql.push_str(&format!(" AND category = ?{}", args.len()));
        }
        if let Some(sentiment) = filter.sentiment {
            args.push(sentiment.as_str().into());
            sql.push_str(&format!(" AND sentiment = ?{}", args.len()));
        }
        if let Some(followup) = filter.needs_followup {
            args.push((followup as i64).into());
            sql.push_str(&format!(" AND needs_followup = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY received_at DESC");
        if let Some(limit) = filter.limit {
            args.push((limit as i64).into());
            sql.push_str(&format!(" LIMIT ?{}", args.len()));
        }

        let mut rows = self
            .conn()
            .query(&sql, args)
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to list emails: {e}")))?;

        let mut emails = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read email row: {e}")))?
        {
            emails.push(row_to_email(&row)?);
        }
        Ok(emails)
    }

    async fn get_email(
        &self,
        user_id: &str,
        email_id: &str,
    ) -> Result<Option<EmailDetail>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {EMAIL_COLUMNS}, body FROM emails WHERE user_id = ?1 AND id = ?2"
                ),
                params![user_id, email_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read email: {e}")))?;
        let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read email row: {e}")))?
        else {
            return Ok(None);
        };

        let email = row_to_email(&row)?;
        let body: String = row.get(15).map_err(row_err)?;

        let mut entities = Vec::new();
        let mut rows = conn
            .query(
                "SELECT id, email_id, text, kind FROM entities WHERE email_id = ?1",
                params![email_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read entities: {e}")))?;
        while let Some(row) = rows.next().await.map_err(|e| row_iter_err("entities", e))? {
            entities.push(row_to_entity(&row)?);
        }

        let mut keywords = Vec::new();
        let mut rows = conn
            .query(
                "SELECT id, email_id, word, score FROM keywords WHERE email_id = ?1 ORDER BY score DESC",
                params![email_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read keywords: {e}")))?;
        while let Some(row) = rows.next().await.map_err(|e| row_iter_err("keywords", e))? {
            keywords.push(row_to_keyword(&row)?);
        }

        let mut action_items = Vec::new();
        let mut rows = conn
            .query(
                "SELECT id, email_id, text, deadline, completed FROM action_items WHERE email_id = ?1",
                params![email_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read action items: {e}")))?;
        while let Some(row) = rows.next().await.map_err(|e| row_iter_err("action_items", e))? {
            action_items.push(row_to_action_item(&row)?);
        }

        let mut contacts = Vec::new();
        let mut rows = conn
            .query(
                "SELECT id, email_id, name, email, phone, company, position FROM contacts WHERE email_id = ?1",
                params![email_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read contacts: {e}")))?;
        while let Some(row) = rows.next().await.map_err(|e| row_iter_err("contacts", e))? {
            contacts.push(row_to_contact(&row)?);
        }

        Ok(Some(EmailDetail {
            email,
            body,
            entities,
            keywords,
            action_items,
            contacts,
        }))
    }

    // ── Fragments ───────────────────────────────────────────────────

    async fn list_entities(&self, user_id: &str) -> Result<Vec<StoredEntity>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, email_id, text, kind FROM entities WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to list entities: {e}")))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| row_iter_err("entities", e))? {
            out.push(row_to_entity(&row)?);
        }
        Ok(out)
    }

    async fn list_keywords(&self, user_id: &str) -> Result<Vec<StoredKeyword>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, email_id, word, score FROM keywords WHERE user_id = ?1 ORDER BY score DESC",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to list keywords: {e}")))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| row_iter_err("keywords", e))? {
            out.push(row_to_keyword(&row)?);
        }
        Ok(out)
    }

    async fn list_contacts(&self, user_id: &str) -> Result<Vec<StoredContact>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, email_id, name, email, phone, company, position \
                 FROM contacts WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to list contacts: {e}")))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| row_iter_err("contacts", e))? {
            out.push(row_to_contact(&row)?);
        }
        Ok(out)
    }

    async fn list_action_items(
        &self,
        user_id: &str,
        include_completed: bool,
    ) -> Result<Vec<StoredActionItem>, DatabaseError> {
        let sql = if include_completed {
            "SELECT id, email_id, text, deadline, completed FROM action_items \
             WHERE user_id = ?1 ORDER BY deadline IS NULL, deadline"
        } else {
            "SELECT id, email_id, text, deadline, completed FROM action_items \
             WHERE user_id = ?1 AND completed = 0 ORDER BY deadline IS NULL, deadline"
        };
        let mut rows = self
            .conn()
            .query(sql, params![user_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to list action items: {e}")))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| row_iter_err("action_items", e))? {
            out.push(row_to_action_item(&row)?);
        }
        Ok(out)
    }

    async fn set_action_item_completed(
        &self,
        user_id: &str,
        item_id: &str,
        completed: bool,
    ) -> Result<StoredActionItem, DatabaseError> {
        let conn = self.conn();
        let affected = conn
            .execute(
                "UPDATE action_items SET completed = ?3 WHERE id = ?1 AND user_id = ?2",
                params![item_id, user_id, completed as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to update action item: {e}")))?;
        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "action_item".into(),
                id: item_id.into(),
            });
        }

        let mut rows = conn
            .query(
                "SELECT id, email_id, text, deadline, completed FROM action_items WHERE id = ?1",
                params![item_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read action item: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| row_iter_err("action_items", e))?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "action_item".into(),
                id: item_id.into(),
            })?;
        row_to_action_item(&row)
    }

    // ── Stats ───────────────────────────────────────────────────────

    async fn email_stats(&self, user_id: &str) -> Result<EmailStats, DatabaseError> {
        let conn = self.conn();

        let mut rows = conn
            .query(
                "SELECT COUNT(*),
                        COALESCE(SUM(is_important), 0),
                        COALESCE(SUM(needs_followup), 0),
                        COALESCE(AVG(priority_score), 0)
                 FROM emails WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read stats: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| row_iter_err("emails", e))?
            .ok_or_else(|| DatabaseError::Query("Empty stats result".into()))?;
        let total: i64 = row.get(0).map_err(row_err)?;
        let important: i64 = row.get(1).map_err(row_err)?;
        let needs_followup: i64 = row.get(2).map_err(row_err)?;
        let avg_priority: f64 = row.get(3).map_err(row_err)?;

        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM action_items WHERE user_id = ?1 AND completed = 0",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to count action items: {e}")))?;
        let open_action_items: i64 = rows
            .next()
            .await
            .map_err(|e| row_iter_err("action_items", e))?
            .ok_or_else(|| DatabaseError::Query("Empty count result".into()))?
            .get(0)
            .map_err(row_err)?;

        let mut by_category = Vec::new();
        let mut rows = conn
            .query(
                "SELECT category, COUNT(*) FROM emails WHERE user_id = ?1 \
                 GROUP BY category ORDER BY COUNT(*) DESC",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to group by category: {e}")))?;
        while let Some(row) = rows.next().await.map_err(|e| row_iter_err("emails", e))? {
            by_category.push((row.get::<String>(0).map_err(row_err)?, row.get::<i64>(1).map_err(row_err)?));
        }

        let mut by_sentiment = Vec::new();
        let mut rows = conn
            .query(
                "SELECT sentiment, COUNT(*) FROM emails WHERE user_id = ?1 \
                 GROUP BY sentiment ORDER BY COUNT(*) DESC",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to group by sentiment: {e}")))?;
        while let Some(row) = rows.next().await.map_err(|e| row_iter_err("emails", e))? {
            by_sentiment.push((row.get::<String>(0).map_err(row_err)?, row.get::<i64>(1).map_err(row_err)?));
        }

        Ok(EmailStats {
            total,
            important,
            needs_followup,
            open_action_items,
            avg_priority,
            by_category,
            by_sentiment,
        })
    }
}

fn row_iter_err(table: &str, e: libsql::Error) -> DatabaseError {
    DatabaseError::Query(format!("Failed to iterate {table} rows: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::annotator::Annotator;
    use crate::pipeline::types::{MimeHint, RawEmail};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap()
    }

    fn raw_email(gmail_id: &str, body: &str) -> RawEmail {
        RawEmail {
            gmail_id: gmail_id.into(),
            subject: "Quarterly budget review".into(),
            sender: "Jane Doe".into(),
            sender_email: "jane@acme.com".into(),
            received_at: now(),
            body: body.into(),
            mime_hint: MimeHint::Plain,
            is_starred: true,
            is_important_flag: false,
        }
    }

    fn annotated(gmail_id: &str) -> AnnotatedEmail {
        let body = "Please review the budget report by Friday and let me know.\n\
                    Jane Doe\nAcme Labs\njane@acme.com";
        Annotator::new().annotate(&raw_email(gmail_id, body), now())
    }

    async fn backend_with_user() -> (LibSqlBackend, String) {
        let backend = LibSqlBackend::new_memory().await.unwrap();
        let user = backend.upsert_user("owner@example.com", Some("Owner")).await.unwrap();
        (backend, user.id)
    }

    #[tokio::test]
    async fn new_local_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("dir").join("test.db");
        let backend = LibSqlBackend::new_local(&db_path).await.unwrap();
        assert!(db_path.exists());
        drop(backend);
    }

    #[tokio::test]
    async fn upsert_user_is_stable_across_calls() {
        let backend = LibSqlBackend::new_memory().await.unwrap();
        let first = backend.upsert_user("a@b.c", None).await.unwrap();
        let second = backend.upsert_user("a@b.c", Some("Named")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name.as_deref(), Some("Named"));
    }

    #[tokio::test]
    async fn save_and_read_back_annotated_email() {
        let (backend, user_id) = backend_with_user().await;
        let annotated = annotated("g1");
        let email_id = backend.save_annotated_email(&user_id, &annotated).await.unwrap();

        let detail = backend.get_email(&user_id, &email_id).await.unwrap().unwrap();
        assert_eq!(detail.email.gmail_id, "g1");
        assert_eq!(detail.email.summary, annotated.summary);
        assert!(detail.email.is_starred);
        assert!(!detail.action_items.is_empty());
        assert_eq!(detail.contacts.len(), annotated.contacts.len());
        assert_eq!(detail.body, annotated.normalized_body);
    }

    #[tokio::test]
    async fn resave_replaces_fragments_not_duplicates() {
        let (backend, user_id) = backend_with_user().await;
        let record = annotated("g1");
        let id1 = backend.save_annotated_email(&user_id, &record).await.unwrap();
        let id2 = backend.save_annotated_email(&user_id, &record).await.unwrap();
        assert_eq!(id1, id2);

        let detail = backend.get_email(&user_id, &id1).await.unwrap().unwrap();
        assert_eq!(detail.action_items.len(), record.action_items.len());
        assert_eq!(detail.keywords.len(), record.keywords.len());
    }

    #[tokio::test]
    async fn email_exists_tracks_saves() {
        let (backend, user_id) = backend_with_user().await;
        assert!(!backend.email_exists(&user_id, "g1").await.unwrap());
        backend.save_annotated_email(&user_id, &annotated("g1")).await.unwrap();
        assert!(backend.email_exists(&user_id, "g1").await.unwrap());
    }

    #[tokio::test]
    async fn list_emails_honors_filters() {
        let (backend, user_id) = backend_with_user().await;
        backend.save_annotated_email(&user_id, &annotated("g1")).await.unwrap();
        backend.save_annotated_email(&user_id, &annotated("g2")).await.unwrap();

        let all = backend.list_emails(&user_id, &EmailFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let starred = backend
            .list_emails(
                &user_id,
                &EmailFilter {
                    starred: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(starred.len(), 2);

        let none = backend
            .list_emails(
                &user_id,
                &EmailFilter {
                    starred: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(none.is_empty());

        let limited = backend
            .list_emails(
                &user_id,
                &EmailFilter {
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn complete_action_item_round_trip() {
        let (backend, user_id) = backend_with_user().await;
        backend.save_annotated_email(&user_id, &annotated("g1")).await.unwrap();

        let open = backend.list_action_items(&user_id, false).await.unwrap();
        assert!(!open.is_empty());

        let done = backend
            .set_action_item_completed(&user_id, &open[0].id, true)
            .await
            .unwrap();
        assert!(done.completed);

        let still_open = backend.list_action_items(&user_id, false).await.unwrap();
        assert_eq!(still_open.len(), open.len() - 1);
    }

    #[tokio::test]
    async fn completing_unknown_item_is_not_found() {
        let (backend, user_id) = backend_with_user().await;
        let err = backend
            .set_action_item_completed(&user_id, "missing", true)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn other_users_items_are_invisible() {
        let (backend, user_id) = backend_with_user().await;
        backend.save_annotated_email(&user_id, &annotated("g1")).await.unwrap();
        let other = backend.upsert_user("other@example.com", None).await.unwrap();

        let items = backend.list_action_items(&user_id, true).await.unwrap();
        let err = backend
            .set_action_item_completed(&other.id, &items[0].id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn stats_aggregate_counts() {
        let (backend, user_id) = backend_with_user().await;
        backend.save_annotated_email(&user_id, &annotated("g1")).await.unwrap();
        backend.save_annotated_email(&user_id, &annotated("g2")).await.unwrap();

        let stats = backend.email_stats(&user_id).await.unwrap();
        assert_eq!(stats.total, 2);
        assert!(stats.avg_priority >= 1.0 && stats.avg_priority <= 10.0);
        assert!(!stats.by_category.is_empty());
        assert!(!stats.by_sentiment.is_empty());
    }

    #[tokio::test]
    async fn token_update_round_trip() {
        let (backend, user_id) = backend_with_user().await;
        let expiry = now() + chrono::Duration::hours(1);
        backend
            .update_user_tokens(&user_id, "access-1", Some("refresh-1"), expiry)
            .await
            .unwrap();

        let user = backend.get_user(&user_id).await.unwrap().unwrap();
        assert_eq!(user.access_token.as_deref(), Some("access-1"));
        assert_eq!(user.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(user.token_expiry.unwrap(), expiry);

        // Refresh without a new refresh token keeps the old one.
        backend
            .update_user_tokens(&user_id, "access-2", None, expiry)
            .await
            .unwrap();
        let user = backend.get_user(&user_id).await.unwrap().unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("refresh-1"));
    }
}
