//! REST endpoints for the annotated inbox.
//!
//! All data routes are scoped by user id; listing endpoints only ever return
//! rows owned by that user. Database misses map to 404, everything else to
//! 500 with a terse error body.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::error::{DatabaseError, Error};
use crate::ingest::Ingestor;
use crate::pipeline::types::{Category, Sentiment};
use crate::store::{Database, EmailFilter};

/// Shared state for all API routes.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub ingestor: Arc<Ingestor>,
}

/// Build the full API router.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/emails/fetch/{user_id}", post(fetch_emails))
        .route("/api/emails/{user_id}", get(list_emails))
        .route("/api/emails/{user_id}/{email_id}", get(get_email))
        .route("/api/entities/{user_id}", get(list_entities))
        .route("/api/keywords/{user_id}", get(list_keywords))
        .route("/api/contacts/{user_id}", get(list_contacts))
        .route("/api/action-items/{user_id}", get(list_action_items))
        .route(
            "/api/action-items/{user_id}/{item_id}/complete",
            put(complete_action_item),
        )
        .route("/api/stats/{user_id}", get(stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// POST /api/emails/fetch/{user_id}
///
/// Fetch the newest messages from Gmail, annotate, and persist. Returns the
/// ingestion report.
async fn fetch_emails(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.ingestor.fetch_and_process(&user_id).await {
        Ok(report) => Json(serde_json::to_value(report).unwrap_or_default()).into_response(),
        Err(e) => error_response(e),
    }
}

/// Listing filters, all optional.
#[derive(Debug, Deserialize)]
struct ListEmailsQuery {
    starred: Option<bool>,
    important: Option<bool>,
    category: Option<String>,
    sentiment: Option<String>,
    followup: Option<bool>,
    limit: Option<usize>,
}

/// GET /api/emails/{user_id}
async fn list_emails(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ListEmailsQuery>,
) -> impl IntoResponse {
    let category = match query.category.as_deref().map(parse_category).transpose() {
        Ok(c) => c,
        Err(response) => return response,
    };
    let sentiment = match query.sentiment.as_deref().map(parse_sentiment).transpose() {
        Ok(s) => s,
        Err(response) => return response,
    };

    let filter = EmailFilter {
        starred: query.starred,
        important: query.important,
        category,
        sentiment,
        needs_followup: query.followup,
        limit: query.limit,
    };

    match state.db.list_emails(&user_id, &filter).await {
        Ok(emails) => Json(emails).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// GET /api/emails/{user_id}/{email_id}
async fn get_email(
    State(state): State<AppState>,
    Path((user_id, email_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.db.get_email(&user_id, &email_id).await {
        Ok(Some(detail)) => Json(detail).into_response(),
        Ok(None) => not_found("email", &email_id),
        Err(e) => error_response(e.into()),
    }
}

/// GET /api/entities/{user_id}
async fn list_entities(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.db.list_entities(&user_id).await {
        Ok(entities) => Json(entities).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// GET /api/keywords/{user_id}
async fn list_keywords(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.db.list_keywords(&user_id).await {
        Ok(keywords) => Json(keywords).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// GET /api/contacts/{user_id}
async fn list_contacts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.db.list_contacts(&user_id).await {
        Ok(contacts) => Json(contacts).into_response(),
        Err(e) => error_response(e.into()),
    }
}

#[derive(Debug, Deserialize)]
struct ActionItemsQuery {
    #[serde(default)]
    include_completed: bool,
}

/// GET /api/action-items/{user_id}
async fn list_action_items(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ActionItemsQuery>,
) -> impl IntoResponse {
    match state
        .db
        .list_action_items(&user_id, query.include_completed)
        .await
    {
        Ok(items) => Json(items).into_response(),
        Err(e) => error_response(e.into()),
    }
}

#[derive(Debug, Deserialize)]
struct CompleteBody {
    #[serde(default = "default_completed")]
    completed: bool,
}

fn default_completed() -> bool {
    true
}

/// PUT /api/action-items/{user_id}/{item_id}/complete
///
/// Marks the item complete; body `{"completed": false}` reopens it. An empty
/// body means complete.
async fn complete_action_item(
    State(state): State<AppState>,
    Path((user_id, item_id)): Path<(String, String)>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let completed = if body.is_empty() {
        true
    } else {
        match serde_json::from_slice::<CompleteBody>(&body) {
            Ok(parsed) => parsed.completed,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": format!("Bad request body: {e}")})),
                )
                    .into_response();
            }
        }
    };
    match state
        .db
        .set_action_item_completed(&user_id, &item_id, completed)
        .await
    {
        Ok(item) => Json(item).into_response(),
        Err(DatabaseError::NotFound { entity, id }) => not_found(&entity, &id),
        Err(e) => error_response(e.into()),
    }
}

/// GET /api/stats/{user_id}
async fn stats(State(state): State<AppState>, Path(user_id): Path<String>) -> impl IntoResponse {
    match state.db.email_stats(&user_id).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => error_response(e.into()),
    }
}

// ── Response helpers ────────────────────────────────────────────────

fn parse_category(s: &str) -> Result<Category, axum::response::Response> {
    Category::parse(s).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": format!("Unknown category: {s}")})),
        )
            .into_response()
    })
}

fn parse_sentiment(s: &str) -> Result<Sentiment, axum::response::Response> {
    Sentiment::parse(s).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": format!("Unknown sentiment: {s}")})),
        )
            .into_response()
    })
}

fn not_found(entity: &str, id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": format!("{entity} {id} not found")})),
    )
        .into_response()
}

fn error_response(err: Error) -> axum::response::Response {
    if let Error::Database(DatabaseError::NotFound { ref entity, ref id }) = err {
        return not_found(entity, id);
    }
    error!(error = %err, "Request failed");
    let status = match err {
        Error::Gmail(crate::error::GmailError::NotConnected(_)) => StatusCode::PRECONDITION_FAILED,
        Error::Gmail(crate::error::GmailError::TokenExpired) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({"error": err.to_string()})),
    )
        .into_response()
}
