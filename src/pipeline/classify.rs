//! Category and importance classification.
//!
//! Both are keyword heuristics over the subject and normalized body. The
//! category picks the vocabulary with the most whole-word hits; importance
//! is a weighted score over urgency vocabulary, entity counts, and keyword
//! strength compared against a fixed threshold.

use regex::Regex;

use crate::pipeline::types::{Category, Entity, EntityKind, Keyword};

/// Score a category must reach before it beats Other.
const MIN_CATEGORY_SCORE: f64 = 2.0;

/// Importance score above which an email is flagged important.
const IMPORTANCE_THRESHOLD: f64 = 3.0;

/// Subject words worth two importance points each.
static URGENT_SUBJECT_WORDS: &[&str] = &[
    "urgent", "important", "critical", "deadline", "asap", "attention", "immediately",
    "required", "action",
];

/// Body phrases worth one importance point each.
static URGENT_BODY_PHRASES: &[&str] = &[
    "as soon as possible",
    "urgent matter",
    "immediate attention",
    "please respond",
    "need your input",
    "action required",
    "deadline",
    "by tomorrow",
    "high priority",
];

static CATEGORY_VOCAB: &[(Category, &[&str])] = &[
    (
        Category::Meeting,
        &[
            "meeting", "appointment", "schedule", "calendar", "discussion", "call", "zoom",
            "teams", "meet", "conference",
        ],
    ),
    (
        Category::Sales,
        &[
            "sales", "deal", "offer", "discount", "purchase", "buy", "price", "demo", "product",
            "subscription", "trial",
        ],
    ),
    (
        Category::Update,
        &[
            "update", "status", "progress", "report", "news", "change", "release",
            "announcement", "newsletter",
        ],
    ),
    (
        Category::Personal,
        &[
            "friend", "family", "personal", "vacation", "holiday", "birthday",
            "congratulations", "invitation",
        ],
    ),
    (
        Category::Finance,
        &[
            "invoice", "payment", "bill", "receipt", "financial", "transaction", "expense",
            "budget", "tax", "money",
        ],
    ),
    (
        Category::Technical,
        &[
            "bug", "error", "issue", "technical", "support", "fix", "code", "development",
            "feature", "server", "api", "deploy",
        ],
    ),
    (
        Category::Promotional,
        &[
            "promotional", "marketing", "newsletter", "offer", "free", "discount", "limited",
            "exclusive", "promotion",
        ],
    ),
];

pub struct Classifier {
    word_boundary: Regex,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            // Rebuilt per vocabulary word below would be wasteful; instead
            // hits are checked with a single tokenizing pass.
            word_boundary: Regex::new(r"[a-z0-9]+").unwrap(),
        }
    }

    /// Pick the category whose vocabulary has the most whole-word hits in
    /// the subject plus body. Date/time entities nudge Meeting. A top score
    /// under two means no clear signal, so Other.
    pub fn categorize(
        &self,
        subject: &str,
        content: &str,
        entities: &[Entity],
    ) -> Category {
        let combined = format!("{subject} {content}").to_lowercase();
        let tokens: Vec<&str> = self
            .word_boundary
            .find_iter(&combined)
            .map(|m| m.as_str())
            .collect();

        let mut best = Category::Other;
        let mut best_score = 0.0;
        for (category, vocab) in CATEGORY_VOCAB {
            let mut score = vocab
                .iter()
                .filter(|word| tokens.contains(&**word))
                .count() as f64;
            if *category == Category::Meeting {
                let datetime_mentions = entities
                    .iter()
                    .filter(|e| matches!(e.kind, EntityKind::Date | EntityKind::Time))
                    .count();
                score += datetime_mentions as f64 * 0.5;
            }
            if score > best_score {
                best_score = score;
                best = *category;
            }
        }

        if best_score < MIN_CATEGORY_SCORE {
            Category::Other
        } else {
            best
        }
    }

    /// Weighted importance heuristic. Urgent subject words count double,
    /// body phrases single, people and organizations half, and the top
    /// three keyword scores half their weight.
    pub fn is_important(
        &self,
        subject: &str,
        content: &str,
        entities: &[Entity],
        keywords: &[Keyword],
    ) -> bool {
        let mut score = 0.0;

        let subject_lower = subject.to_lowercase();
        for word in URGENT_SUBJECT_WORDS {
            if subject_lower.contains(word) {
                score += 2.0;
            }
        }

        let content_lower = content.to_lowercase();
        for phrase in URGENT_BODY_PHRASES {
            if content_lower.contains(phrase) {
                score += 1.0;
            }
        }

        for entity in entities {
            if matches!(entity.kind, EntityKind::Person | EntityKind::Organization) {
                score += 0.5;
            }
        }

        // Keywords arrive sorted by score descending.
        for keyword in keywords.iter().take(3) {
            score += keyword.score * 0.5;
        }

        score > IMPORTANCE_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new()
    }

    fn kw(word: &str, score: f64) -> Keyword {
        Keyword {
            word: word.to_string(),
            score,
        }
    }

    fn person(name: &str) -> Entity {
        Entity {
            text: name.to_string(),
            kind: EntityKind::Person,
        }
    }

    #[test]
    fn meeting_vocabulary_wins() {
        let c = classifier().categorize(
            "Schedule a call",
            "Can we meet on zoom to discuss the calendar?",
            &[],
        );
        assert_eq!(c, Category::Meeting);
    }

    #[test]
    fn finance_vocabulary_wins() {
        let c = classifier().categorize(
            "Invoice attached",
            "The payment for this bill is due, receipt follows.",
            &[],
        );
        assert_eq!(c, Category::Finance);
    }

    #[test]
    fn weak_signal_falls_back_to_other() {
        let c = classifier().categorize("Hello", "Just one meeting mention here.", &[]);
        assert_eq!(c, Category::Other);
    }

    #[test]
    fn no_signal_is_other() {
        let c = classifier().categorize("Hi", "Nothing classifiable at all.", &[]);
        assert_eq!(c, Category::Other);
    }

    #[test]
    fn date_entities_nudge_meeting() {
        let entities = vec![
            Entity {
                text: "Friday".into(),
                kind: EntityKind::Date,
            },
            Entity {
                text: "3:00 pm".into(),
                kind: EntityKind::Time,
            },
        ];
        // One vocab hit plus two half-point entity nudges crosses the bar.
        let c = classifier().categorize("Conference", "See you there.", &entities);
        assert_eq!(c, Category::Meeting);
    }

    #[test]
    fn substring_hits_do_not_count_for_categories() {
        // "newsletter" must not match inside "newsletters2you" tokens etc.;
        // "supporting" must not count as "support".
        let c = classifier().categorize("Hi", "supporting materials for the discussional", &[]);
        assert_eq!(c, Category::Other);
    }

    #[test]
    fn urgent_subject_alone_can_cross_importance_threshold() {
        // "urgent" and "deadline" in the subject: 2 + 2 = 4 > 3.
        let important =
            classifier().is_important("Urgent: deadline today", "Short note.", &[], &[]);
        assert!(important);
    }

    #[test]
    fn calm_email_is_not_important() {
        let important = classifier().is_important("Lunch", "See you at noon.", &[], &[]);
        assert!(!important);
    }

    #[test]
    fn entities_and_keywords_accumulate() {
        let entities = vec![person("Jane Doe"), person("Bob Reed"), person("Ann Lee")];
        let keywords = vec![kw("launch", 1.0), kw("budget", 0.8), kw("review", 0.6)];
        // phrases: "please respond" + "action required" = 2.0
        // entities: 3 * 0.5 = 1.5; keywords: (1.0 + 0.8 + 0.6) * 0.5 = 1.2
        let important = classifier().is_important(
            "Weekly sync",
            "Please respond, action required before the board call.",
            &entities,
            &keywords,
        );
        assert!(important);
    }

    #[test]
    fn importance_threshold_is_strict() {
        // Exactly 3.0 (six person entities) does not cross.
        let entities: Vec<Entity> = (0..6).map(|i| person(&format!("P{i} Q{i}"))).collect();
        let important = classifier().is_important("Hi", "Plain text.", &entities, &[]);
        assert!(!important);
    }
}
