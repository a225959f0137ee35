//! REST API — axum router and handlers.

pub mod routes;

pub use routes::{AppState, api_router};
