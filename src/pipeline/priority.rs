//! Priority scoring as an explicit rule table.
//!
//! Every signal is one named rule with a fixed weight and a predicate over
//! the scoring input. The score starts at a neutral 5.0, each matching rule
//! adds its weight, and the result is clamped to [1, 10]. The table is data,
//! so the weighting is auditable in one place.

use crate::pipeline::types::{Entity, EntityKind, Sentiment};

const BASE_SCORE: f64 = 5.0;
const MIN_SCORE: f64 = 1.0;
const MAX_SCORE: f64 = 10.0;

/// Subject terms that bump priority on their own.
static URGENT_SUBJECT_TERMS: &[&str] = &[
    "urgent", "asap", "immediately", "deadline", "critical", "emergency",
];

/// Everything the rules are allowed to look at.
pub struct PriorityInput<'a> {
    pub subject: &'a str,
    pub sentiment: Sentiment,
    pub is_important: bool,
    pub needs_followup: bool,
    pub entities: &'a [Entity],
    pub action_item_count: usize,
}

struct PriorityRule {
    name: &'static str,
    weight: f64,
    applies: fn(&PriorityInput) -> bool,
}

static RULES: &[PriorityRule] = &[
    PriorityRule {
        name: "flagged important",
        weight: 2.0,
        applies: |input| input.is_important,
    },
    PriorityRule {
        name: "urgent sentiment",
        weight: 1.5,
        applies: |input| input.sentiment == Sentiment::Urgent,
    },
    PriorityRule {
        name: "negative sentiment",
        weight: 1.0,
        applies: |input| input.sentiment == Sentiment::Negative,
    },
    PriorityRule {
        name: "positive sentiment",
        weight: -0.5,
        applies: |input| input.sentiment == Sentiment::Positive,
    },
    PriorityRule {
        name: "urgent subject term",
        weight: 0.5,
        applies: |input| {
            let subject = input.subject.to_lowercase();
            URGENT_SUBJECT_TERMS.iter().any(|t| subject.contains(t))
        },
    },
    PriorityRule {
        name: "several people involved",
        weight: 0.5,
        applies: |input| count_kind(input.entities, EntityKind::Person) > 2,
    },
    PriorityRule {
        name: "organization mentioned",
        weight: 0.3,
        applies: |input| count_kind(input.entities, EntityKind::Organization) > 0,
    },
    PriorityRule {
        name: "follow-up needed",
        weight: 0.7,
        applies: |input| input.needs_followup,
    },
    PriorityRule {
        name: "has action items",
        weight: 0.5,
        applies: |input| input.action_item_count > 0,
    },
];

fn count_kind(entities: &[Entity], kind: EntityKind) -> usize {
    entities.iter().filter(|e| e.kind == kind).count()
}

pub struct PriorityScorer;

impl PriorityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score in [1, 10]; 5.0 means no rule fired.
    pub fn score(&self, input: &PriorityInput) -> f64 {
        let raw = RULES
            .iter()
            .filter(|rule| (rule.applies)(input))
            .fold(BASE_SCORE, |acc, rule| acc + rule.weight);
        raw.clamp(MIN_SCORE, MAX_SCORE)
    }

    /// Names of the rules that fired, in table order. Surfaced in logs so a
    /// score can be traced to its signals.
    pub fn explain(&self, input: &PriorityInput) -> Vec<&'static str> {
        RULES
            .iter()
            .filter(|rule| (rule.applies)(input))
            .map(|rule| rule.name)
            .collect()
    }
}

impl Default for PriorityScorer {
    fn default() -> Self {
        Self::new()
    }
}
