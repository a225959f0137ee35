//! Error types for Inbox Insight.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Gmail error: {0}")]
    Gmail(#[from] GmailError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Gmail API and OAuth errors.
#[derive(Debug, thiserror::Error)]
pub enum GmailError {
    #[error("Gmail API request failed: {0}")]
    Request(String),

    #[error("Gmail API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Access token expired and no refresh token available")]
    TokenExpired,

    #[error("Malformed message resource: {0}")]
    MalformedMessage(String),

    #[error("User {0} is not connected to Gmail")]
    NotConnected(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
