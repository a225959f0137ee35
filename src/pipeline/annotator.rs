//! Pipeline aggregator.
//!
//! Runs normalization, the extractors, and the classifiers over one fetched
//! email and assembles the annotated record the store persists. Stateless:
//! every stage is a pure function of the email and the reference time, so
//! annotating the same input twice gives the same record.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::pipeline::actions::{ActionExtractor, FollowUpDetector};
use crate::pipeline::classify::Classifier;
use crate::pipeline::contacts::ContactExtractor;
use crate::pipeline::entities::EntityExtractor;
use crate::pipeline::keywords::KeywordExtractor;
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::priority::{PriorityInput, PriorityScorer};
use crate::pipeline::sentiment::SentimentAnalyzer;
use crate::pipeline::summarize::Summarizer;
use crate::pipeline::types::{AnnotatedEmail, RawEmail};

/// The full annotation pipeline, with every stage built once up front.
/// Construct one and share it across a fetch batch.
pub struct Annotator {
    normalizer: Normalizer,
    summarizer: Summarizer,
    entities: EntityExtractor,
    keywords: KeywordExtractor,
    sentiment: SentimentAnalyzer,
    actions: ActionExtractor,
    followup: FollowUpDetector,
    contacts: ContactExtractor,
    classifier: Classifier,
    priority: PriorityScorer,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator {
    pub fn new() -> Self {
        Self {
            normalizer: Normalizer::new(),
            summarizer: Summarizer::new(),
            entities: EntityExtractor::new(),
            keywords: KeywordExtractor::new(),
            sentiment: SentimentAnalyzer::new(),
            actions: ActionExtractor::new(),
            followup: FollowUpDetector::new(),
            contacts: ContactExtractor::new(),
            classifier: Classifier::new(),
            priority: PriorityScorer::new(),
        }
    }

    /// Annotate one email. `now` anchors every relative date (deadlines,
    /// follow-up suggestions). Never fails: garbage input degrades to a
    /// minimal record with empty fragments, not an error.
    pub fn annotate(&self, email: &RawEmail, now: DateTime<Utc>) -> AnnotatedEmail {
        let normalized_body = self.normalizer.normalize(&email.body, email.mime_hint);

        let summary = self.summarizer.summarize(&normalized_body);
        let entities = self.entities.extract(&normalized_body);
        let keywords = self.keywords.extract(&normalized_body);
        let sentiment = self.sentiment.analyze(&normalized_body);
        let action_items = self.actions.extract(&normalized_body, now);
        let followup = self.followup.detect(&normalized_body, &email.subject, now);
        let contacts = self.contacts.extract(&normalized_body);

        let category = self
            .classifier
            .categorize(&email.subject, &normalized_body, &entities);
        // Gmail's own important flag always wins.
        let is_important = email.is_important_flag
            || self
                .classifier
                .is_important(&email.subject, &normalized_body, &entities, &keywords);

        let priority_input = PriorityInput {
            subject: &email.subject,
            sentiment: sentiment.label,
            is_important,
            needs_followup: followup.needed,
            entities: &entities,
            action_item_count: action_items.len(),
        };
        let priority_score = self.priority.score(&priority_input);

        debug!(
            gmail_id = %email.gmail_id,
            category = category.as_str(),
            sentiment = sentiment.label.as_str(),
            priority = priority_score,
            signals = ?self.priority.explain(&priority_input),
            entities = entities.len(),
            action_items = action_items.len(),
            "annotated email"
        );

        AnnotatedEmail {
            raw: email.clone(),
            normalized_body,
            summary,
            category,
            sentiment,
            priority_score,
            is_important,
            needs_followup: followup.needed,
            followup_date: followup.date,
            entities,
            keywords,
            action_items,
            contacts,
        }
    }

    /// Annotate a batch in order. Infallible per email, so the output always
    /// has one record per input.
    pub fn annotate_batch(&self, emails: &[RawEmail], now: DateTime<Utc>) -> Vec<AnnotatedEmail> {
        emails.iter().map(|email| self.annotate(email, now)).collect()
    }
}
