//! Persistence layer — libSQL-backed storage for users, emails, and
//! extracted fragments.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{
    Database, EmailDetail, EmailFilter, EmailStats, StoredActionItem, StoredContact, StoredEmail,
    StoredEntity, StoredKeyword, StoredUser,
};
