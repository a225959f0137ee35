use std::sync::Arc;

use inbox_insight::api::{AppState, api_router};
use inbox_insight::config::AppConfig;
use inbox_insight::gmail::GoogleOAuth;
use inbox_insight::ingest::Ingestor;
use inbox_insight::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    let db_path = std::path::Path::new(&config.db_path);
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(db_path).await?);

    let oauth = config.google.as_ref().map(GoogleOAuth::new);
    if oauth.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID/SECRET not set; token refresh is disabled");
    }

    let ingestor = Arc::new(Ingestor::new(
        Arc::clone(&db),
        oauth,
        config.fetch_batch_size,
    ));

    let app = api_router(AppState { db, ingestor });

    tracing::info!(addr = %config.bind_addr, "inbox-insight listening");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
