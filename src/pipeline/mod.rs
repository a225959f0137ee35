//! Email annotation pipeline.
//!
//! Every fetched email flows through:
//! 1. `Normalizer` — raw body to clean plain text
//! 2. extractors — summary, entities, keywords, action items, contacts
//! 3. classifiers — category, sentiment, importance
//! 4. `PriorityScorer` — rule-table urgency estimate
//! 5. `Annotator` — assembles the record the store persists
//!
//! All stages are pure functions of the email and the reference time; the
//! only mutable state lives in the store.

pub mod actions;
pub mod annotator;
pub mod classify;
pub mod contacts;
pub mod entities;
pub mod keywords;
pub mod normalize;
pub mod priority;
pub mod sentiment;
pub mod summarize;
pub mod types;
