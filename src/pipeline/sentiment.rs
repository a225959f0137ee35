//! Lexicon-based sentiment scoring.
//!
//! Token valences are summed and squashed into [-1, 1]; the label comes from
//! fixed thresholds, with urgency vocabulary overriding polarity entirely.
//! Scores sitting exactly on a threshold stay Neutral.

use std::collections::HashMap;

use crate::pipeline::types::{Sentiment, SentimentResult};

/// Threshold for Positive/Negative labels. Exactly at the threshold is
/// still Neutral.
const POLARITY_THRESHOLD: f64 = 0.05;

/// Whole words that mark an email as urgent regardless of polarity.
static URGENCY_TERMS: &[&str] = &[
    "urgent", "asap", "immediately", "deadline", "critical", "emergency",
];

/// Tokens that flip the valence of the word right after them.
static NEGATORS: &[&str] = &["not", "no", "never", "dont", "cant", "wont", "isnt", "wasnt"];

/// (word, valence) seed lexicon, VADER-style scale of roughly -4..4.
static LEXICON: &[(&str, f64)] = &[
    ("amazing", 2.8),
    ("angry", -2.3),
    ("annoyed", -1.8),
    ("annoying", -1.9),
    ("appreciate", 1.9),
    ("awesome", 3.1),
    ("awful", -2.9),
    ("bad", -2.5),
    ("best", 3.2),
    ("blocked", -1.6),
    ("broken", -2.2),
    ("bug", -1.5),
    ("complaint", -2.0),
    ("concern", -1.2),
    ("concerned", -1.4),
    ("congratulations", 2.9),
    ("crash", -2.4),
    ("delay", -1.5),
    ("delayed", -1.6),
    ("delighted", 2.7),
    ("disappointed", -2.4),
    ("disappointing", -2.3),
    ("dispute", -1.8),
    ("error", -1.7),
    ("excellent", 3.0),
    ("excited", 2.4),
    ("fail", -2.4),
    ("failed", -2.4),
    ("failure", -2.5),
    ("fantastic", 2.9),
    ("fine", 0.8),
    ("glad", 2.0),
    ("good", 1.9),
    ("great", 2.5),
    ("happy", 2.6),
    ("hate", -2.9),
    ("helpful", 1.8),
    ("impressed", 2.2),
    ("issue", -1.3),
    ("love", 3.0),
    ("lost", -1.8),
    ("mistake", -1.8),
    ("nice", 1.8),
    ("perfect", 2.9),
    ("pleased", 2.1),
    ("problem", -1.7),
    ("refund", -1.0),
    ("reject", -2.0),
    ("rejected", -2.1),
    ("sad", -2.1),
    ("sorry", -1.0),
    ("success", 2.2),
    ("terrible", -2.9),
    ("thank", 1.7),
    ("thanks", 1.9),
    ("thrilled", 2.9),
    ("unacceptable", -2.6),
    ("unhappy", -2.2),
    ("upset", -2.1),
    ("welcome", 1.6),
    ("well", 1.1),
    ("wonderful", 2.8),
    ("worried", -1.9),
    ("worst", -3.1),
    ("wrong", -1.9),
];

/// Sentiment analyzer with a compiled lexicon. Build once, inject where
/// needed.
pub struct SentimentAnalyzer {
    lexicon: HashMap<&'static str, f64>,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
        }
    }

    /// Score clean text. Empty input is Neutral at 0.0; every non-empty
    /// input yields a label from the fixed set and a score in [-1, 1].
    pub fn analyze(&self, text: &str) -> SentimentResult {
        if text.trim().is_empty() {
            return SentimentResult::neutral();
        }

        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase().replace('\'', ""))
            .collect();

        let mut sum = 0.0;
        for (i, token) in tokens.iter().enumerate() {
            if let Some(&valence) = self.lexicon.get(token.as_str()) {
                let negated = i > 0 && NEGATORS.contains(&tokens[i - 1].as_str());
                sum += if negated { -valence } else { valence };
            }
        }

        // Squash the raw sum into [-1, 1].
        let score = sum / (sum * sum + 15.0).sqrt();

        let urgent = tokens.iter().any(|t| URGENCY_TERMS.contains(&t.as_str()));
        let label = if urgent {
            Sentiment::Urgent
        } else if score > POLARITY_THRESHOLD {
            Sentiment::Positive
        } else if score < -POLARITY_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        };

        SentimentResult { label, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> SentimentResult {
        SentimentAnalyzer::new().analyze(text)
    }

    #[test]
    fn empty_text_is_neutral_zero() {
        let r = analyze("");
        assert_eq!(r.label, Sentiment::Neutral);
        assert_eq!(r.score, 0.0);
    }

    #[test]
    fn positive_text_scores_positive() {
        let r = analyze("Great work, the launch was excellent and everyone is happy.");
        assert_eq!(r.label, Sentiment::Positive);
        assert!(r.score > POLARITY_THRESHOLD);
    }

    #[test]
    fn negative_text_scores_negative() {
        let r = analyze("The deploy failed again, this is a terrible problem.");
        assert_eq!(r.label, Sentiment::Negative);
        assert!(r.score < -POLARITY_THRESHOLD);
    }

    #[test]
    fn neutral_text_stays_neutral() {
        let r = analyze("The meeting is scheduled for Tuesday in room four.");
        assert_eq!(r.label, Sentiment::Neutral);
    }

    #[test]
    fn urgency_term_overrides_polarity() {
        let r = analyze("Great news but this is urgent, respond today.");
        assert_eq!(r.label, Sentiment::Urgent);
    }

    #[test]
    fn deadline_is_an_urgency_term() {
        let r = analyze("Reminder: the deadline is approaching.");
        assert_eq!(r.label, Sentiment::Urgent);
    }

    #[test]
    fn negation_flips_valence() {
        let plain = analyze("The release is good.");
        let negated = analyze("The release is not good.");
        assert!(negated.score < plain.score);
    }

    #[test]
    fn score_is_bounded() {
        let gush = "awesome ".repeat(200);
        let r = analyze(&gush);
        assert!(r.score <= 1.0 && r.score >= -1.0);
        assert_eq!(r.label, Sentiment::Positive);
    }

    #[test]
    fn non_empty_input_always_yields_a_value() {
        for text in ["x", "???", "12345", "zzz qqq vvv"] {
            let r = analyze(text);
            assert!(r.score >= -1.0 && r.score <= 1.0);
        }
    }

    #[test]
    fn analysis_is_deterministic() {
        let text = "Thanks for the update, no problems so far.";
        assert_eq!(analyze(text), analyze(text));
    }
}
