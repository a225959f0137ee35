//! inbox-insight — Gmail-connected inbox annotator.

pub mod api;
pub mod config;
pub mod error;
pub mod gmail;
pub mod ingest;
pub mod pipeline;
pub mod store;
