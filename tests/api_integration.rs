//! Integration tests for the REST API.
//!
//! Each test spins up an Axum server on a random port against an in-memory
//! database, seeds it through the real annotation pipeline, and exercises
//! the HTTP contract with a plain reqwest client.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::Value;

use inbox_insight::api::{AppState, api_router};
use inbox_insight::ingest::Ingestor;
use inbox_insight::pipeline::annotator::Annotator;
use inbox_insight::pipeline::types::{MimeHint, RawEmail};
use inbox_insight::store::{Database, LibSqlBackend};

struct TestServer {
    base_url: String,
    db: Arc<dyn Database>,
    user_id: String,
}

async fn start_server() -> TestServer {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let user = db.upsert_user("owner@example.com", Some("Owner")).await.unwrap();

    let ingestor = Arc::new(Ingestor::new(Arc::clone(&db), None, 25));
    let app = api_router(AppState {
        db: Arc::clone(&db),
        ingestor,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        db,
        user_id: user.id,
    }
}

fn raw_email(gmail_id: &str, subject: &str, body: &str) -> RawEmail {
    RawEmail {
        gmail_id: gmail_id.into(),
        subject: subject.into(),
        sender: "Jane Doe".into(),
        sender_email: "jane@acme.com".into(),
        received_at: Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap(),
        body: body.into(),
        mime_hint: MimeHint::Plain,
        is_starred: false,
        is_important_flag: false,
    }
}

/// Annotate and store one email, returning its row id.
async fn seed_email(server: &TestServer, gmail_id: &str, subject: &str, body: &str) -> String {
    let now = Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap();
    let annotated = Annotator::new().annotate(&raw_email(gmail_id, subject, body), now);
    server
        .db
        .save_annotated_email(&server.user_id, &annotated)
        .await
        .unwrap()
}

const TASK_BODY: &str = "Please review the budget report by Friday and let me know.\n\
                         Jane Doe\nAcme Labs\njane@acme.com";

#[tokio::test]
async fn health_endpoint_responds() {
    let server = start_server().await;
    let body: Value = reqwest::get(format!("{}/api/health", server.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn list_emails_returns_seeded_rows() {
    let server = start_server().await;
    seed_email(&server, "g1", "Budget review", TASK_BODY).await;
    seed_email(&server, "g2", "Lunch", "See you at noon tomorrow, nothing else.").await;

    let emails: Vec<Value> =
        reqwest::get(format!("{}/api/emails/{}", server.base_url, server.user_id))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    assert_eq!(emails.len(), 2);
    assert!(emails[0]["summary"].is_string());
}

#[tokio::test]
async fn email_detail_includes_fragments() {
    let server = start_server().await;
    let email_id = seed_email(&server, "g1", "Budget review", TASK_BODY).await;

    let detail: Value = reqwest::get(format!(
        "{}/api/emails/{}/{}",
        server.base_url, server.user_id, email_id
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    assert_eq!(detail["gmail_id"], "g1");
    assert!(!detail["action_items"].as_array().unwrap().is_empty());
    assert!(!detail["contacts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_email_is_404() {
    let server = start_server().await;
    let response = reqwest::get(format!(
        "{}/api/emails/{}/no-such-id",
        server.base_url, server.user_id
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_filter_by_followup() {
    let server = start_server().await;
    seed_email(&server, "g1", "Budget review", TASK_BODY).await;
    seed_email(&server, "g2", "Notice", "The office is closed on Monday.").await;

    let followups: Vec<Value> = reqwest::get(format!(
        "{}/api/emails/{}?followup=true",
        server.base_url, server.user_id
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(followups.len(), 1);
    assert_eq!(followups[0]["gmail_id"], "g1");
}

#[tokio::test]
async fn bad_category_filter_is_400() {
    let server = start_server().await;
    let response = reqwest::get(format!(
        "{}/api/emails/{}?category=Nonsense",
        server.base_url, server.user_id
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn complete_action_item_via_put() {
    let server = start_server().await;
    seed_email(&server, "g1", "Budget review", TASK_BODY).await;

    let items: Vec<Value> = reqwest::get(format!(
        "{}/api/action-items/{}",
        server.base_url, server.user_id
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert!(!items.is_empty());
    let item_id = items[0]["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let done: Value = client
        .put(format!(
            "{}/api/action-items/{}/{}/complete",
            server.base_url, server.user_id, item_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(done["completed"], true);

    // Completed items drop out of the default listing.
    let open: Vec<Value> = reqwest::get(format!(
        "{}/api/action-items/{}",
        server.base_url, server.user_id
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert!(open.iter().all(|i| i["id"] != item_id));
}

#[tokio::test]
async fn completing_missing_item_is_404() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let response = client
        .put(format!(
            "{}/api/action-items/{}/missing/complete",
            server.base_url, server.user_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_reflect_seeded_data() {
    let server = start_server().await;
    seed_email(&server, "g1", "Budget review", TASK_BODY).await;
    seed_email(&server, "g2", "Lunch", "See you at noon tomorrow, nothing else.").await;

    let stats: Value = reqwest::get(format!(
        "{}/api/stats/{}",
        server.base_url, server.user_id
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(stats["total"], 2);
    assert!(stats["avg_priority"].as_f64().unwrap() >= 1.0);
}

#[tokio::test]
async fn fetch_without_gmail_connection_fails_cleanly() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let response = client
        .post(format!(
            "{}/api/emails/fetch/{}",
            server.base_url, server.user_id
        ))
        .send()
        .await
        .unwrap();
    // The seeded user has no stored tokens.
    assert_eq!(response.status(), reqwest::StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn other_users_data_is_invisible() {
    let server = start_server().await;
    seed_email(&server, "g1", "Budget review", TASK_BODY).await;
    let other = server.db.upsert_user("other@example.com", None).await.unwrap();

    let emails: Vec<Value> =
        reqwest::get(format!("{}/api/emails/{}", server.base_url, other.id))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    assert!(emails.is_empty());
}
