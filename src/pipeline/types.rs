//! Shared types for the email annotation pipeline.
//!
//! The pipeline consumes a [`RawEmail`] from the Gmail integration layer and
//! produces an [`AnnotatedEmail`] for persistence. Every fragment type here is
//! an immutable value struct with fixed fields — nothing downstream mutates a
//! fragment after extraction (the one exception is `ActionItem::completed`,
//! which the user toggles through the API after persistence).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ── Inbound email ───────────────────────────────────────────────────

/// Body format hint from the Gmail payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeHint {
    Html,
    Plain,
}

/// A single fetched message, as handed over by the Gmail integration layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEmail {
    /// Gmail's provider message ID — the dedup key for upserts.
    pub gmail_id: String,
    pub subject: String,
    /// Display name from the From header (may equal the address).
    pub sender: String,
    pub sender_email: String,
    pub received_at: DateTime<Utc>,
    /// Raw body as decoded from the payload (HTML or plain text).
    pub body: String,
    pub mime_hint: MimeHint,
    /// Gmail's starred flag.
    pub is_starred: bool,
    /// Gmail's important flag. Forces `is_important` on the annotated record.
    pub is_important_flag: bool,
}

// ── Extractor fragments ─────────────────────────────────────────────

/// Kind tag for a named entity mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Organization,
    Location,
    Date,
    Time,
    Money,
}

impl EntityKind {
    /// Stable string form used in the database and API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Location => "location",
            Self::Date => "date",
            Self::Time => "time",
            Self::Money => "money",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "person" => Some(Self::Person),
            "organization" => Some(Self::Organization),
            "location" => Some(Self::Location),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "money" => Some(Self::Money),
            _ => None,
        }
    }
}

/// A named mention found in one email's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub kind: EntityKind,
}

/// A scored term representative of an email's topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    /// Relevance in (0, 1], highest-frequency term = 1.0.
    pub score: f64,
}

/// A detected task phrase, with an optional parsed deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub text: String,
    pub deadline: Option<DateTime<Utc>>,
    /// Only field mutable after creation, via explicit user action.
    pub completed: bool,
}

/// Contact details extracted from an email body (typically a signature).
///
/// Not reconciled with `Entity` mentions — the same person may appear in
/// both lists. That duplication is intentional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
}

// ── Classifier judgments ────────────────────────────────────────────

/// Sentiment label. Urgency terms override the polarity thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Urgent,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
            Self::Urgent => "Urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Positive" => Some(Self::Positive),
            "Negative" => Some(Self::Negative),
            "Neutral" => Some(Self::Neutral),
            "Urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Sentiment label plus the numeric score it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: Sentiment,
    /// Normalized valence in [-1.0, 1.0].
    pub score: f64,
}

impl SentimentResult {
    pub fn neutral() -> Self {
        Self {
            label: Sentiment::Neutral,
            score: 0.0,
        }
    }
}

/// Topical category assigned by the keyword-vote classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Meeting,
    Sales,
    Update,
    Personal,
    Finance,
    Technical,
    Promotional,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meeting => "Meeting",
            Self::Sales => "Sales",
            Self::Update => "Update",
            Self::Personal => "Personal",
            Self::Finance => "Finance",
            Self::Technical => "Technical",
            Self::Promotional => "Promotional",
            Self::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Meeting" => Some(Self::Meeting),
            "Sales" => Some(Self::Sales),
            "Update" => Some(Self::Update),
            "Personal" => Some(Self::Personal),
            "Finance" => Some(Self::Finance),
            "Technical" => Some(Self::Technical),
            "Promotional" => Some(Self::Promotional),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Follow-up judgment: does this email need a future response, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    pub needed: bool,
    pub date: Option<NaiveDate>,
}

impl FollowUp {
    pub fn none() -> Self {
        Self {
            needed: false,
            date: None,
        }
    }
}

// ── Annotated record ────────────────────────────────────────────────

/// The fully annotated email record handed to the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedEmail {
    pub raw: RawEmail,
    /// Body with markup, quoted replies, and signatures removed.
    pub normalized_body: String,
    pub summary: String,
    pub category: Category,
    pub sentiment: SentimentResult,
    /// Weighted urgency estimate in [1.0, 10.0].
    pub priority_score: f64,
    /// True if the Gmail flag is set or the heuristic score crossed its
    /// threshold. Never false while the Gmail flag is true.
    pub is_important: bool,
    pub needs_followup: bool,
    pub followup_date: Option<NaiveDate>,
    pub entities: Vec<Entity>,
    pub keywords: Vec<Keyword>,
    pub action_items: Vec<ActionItem>,
    pub contacts: Vec<Contact>,
}
