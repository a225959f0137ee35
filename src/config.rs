//! Environment-driven configuration.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Top-level service configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the REST API binds to.
    pub bind_addr: String,
    /// Path to the libSQL database file.
    pub db_path: String,
    /// How many messages to pull per fetch request.
    pub fetch_batch_size: usize,
    /// Google OAuth credentials. `None` disables the fetch endpoint
    /// (annotation and read endpoints still work).
    pub google: Option<GoogleConfig>,
}

/// Google OAuth2 client credentials for the Gmail API.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl AppConfig {
    /// Build config from environment variables.
    ///
    /// `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` are optional as a pair;
    /// setting only one of them is a configuration error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = std::env::var("INBOX_INSIGHT_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "INBOX_INSIGHT_PORT".into(),
                message: format!("{e}"),
            })?;

        let db_path = std::env::var("INBOX_INSIGHT_DB_PATH")
            .unwrap_or_else(|_| "./data/inbox-insight.db".to_string());

        let fetch_batch_size: usize = std::env::var("INBOX_INSIGHT_FETCH_BATCH")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(25);

        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok();
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok();

        let google = match (client_id, client_secret) {
            (Some(id), Some(secret)) => Some(GoogleConfig {
                client_id: id,
                client_secret: SecretString::from(secret),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingEnvVar("GOOGLE_CLIENT_SECRET".into()));
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingEnvVar("GOOGLE_CLIENT_ID".into()));
            }
        };

        Ok(Self {
            bind_addr: format!("0.0.0.0:{port}"),
            db_path,
            fetch_batch_size,
            google,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            db_path: "./data/inbox-insight.db".to_string(),
            fetch_batch_size: 25,
            google: None,
        }
    }
}
