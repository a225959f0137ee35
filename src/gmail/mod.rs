//! Gmail integration — OAuth token refresh, REST client, message parsing.

pub mod client;
pub mod oauth;
pub mod parse;

pub use client::GmailClient;
pub use oauth::{AccessToken, GoogleOAuth};
