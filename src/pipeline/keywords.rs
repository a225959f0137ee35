//! Keyword extractor — term-frequency scoring over stopword-filtered tokens.

use std::collections::HashMap;

use crate::pipeline::types::Keyword;

/// Default number of keywords returned per email.
const DEFAULT_TOP_N: usize = 10;

/// Minimum number of candidate tokens before extraction is attempted.
/// Very short texts produce noise, not topics.
const MIN_TOKENS: usize = 5;

/// Common English stopwords. Tokens in this list never become keywords
/// and never contribute to sentence scores in the summarizer.
static STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "get", "got", "had", "has", "have", "having", "he", "her", "here",
    "hers", "him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "let", "may",
    "me", "more", "most", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or",
    "other", "our", "ours", "out", "over", "own", "same", "she", "should", "so", "some", "such",
    "than", "that", "the", "their", "theirs", "them", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    "your", "yours",
];

/// True if the lowercase token is a stopword.
pub(crate) fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

/// Lowercase alphanumeric tokens longer than two characters, stopwords
/// removed. Shared with the summarizer's frequency model.
pub(crate) fn content_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_lowercase())
        .filter(|t| !is_stopword(t))
        .collect()
}

/// Term-frequency keyword extractor.
pub struct KeywordExtractor {
    top_n: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordExtractor {
    pub fn new() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }

    /// Extract the top scored terms from clean text.
    ///
    /// Scores are term frequency normalized by the most frequent term, so the
    /// strongest keyword always scores 1.0. Fewer than five candidate tokens
    /// yields an empty list rather than unreliable scores.
    pub fn extract(&self, text: &str) -> Vec<Keyword> {
        let tokens = content_tokens(text);
        if tokens.len() < MIN_TOKENS {
            return Vec::new();
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in &tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }
        let max_count = counts.values().copied().max().unwrap_or(1) as f64;

        let mut scored: Vec<Keyword> = counts
            .into_iter()
            .map(|(word, count)| Keyword {
                word: word.to_string(),
                score: count as f64 / max_count,
            })
            .collect();

        // Deterministic order: score descending, then alphabetical.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.word.cmp(&b.word))
        });
        scored.truncate(self.top_n);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopword_list_is_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn empty_text_yields_no_keywords() {
        assert!(KeywordExtractor::new().extract("").is_empty());
    }

    #[test]
    fn short_text_yields_no_keywords() {
        assert!(KeywordExtractor::new().extract("please review this").is_empty());
    }

    #[test]
    fn most_frequent_term_scores_one() {
        let text = "budget review budget planning budget forecast quarterly planning session";
        let keywords = KeywordExtractor::new().extract(text);
        assert_eq!(keywords[0].word, "budget");
        assert!((keywords[0].score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stopwords_never_appear() {
        let text = "the project and the team should review the deadline for the launch window";
        let keywords = KeywordExtractor::new().extract(text);
        assert!(keywords.iter().all(|k| !is_stopword(&k.word)));
        assert!(keywords.iter().any(|k| k.word == "project"));
    }

    #[test]
    fn scores_are_in_unit_range() {
        let text = "server deploy rollout server monitoring alerts deploy pipeline server checks";
        for k in KeywordExtractor::new().extract(text) {
            assert!(k.score > 0.0 && k.score <= 1.0);
        }
    }

    #[test]
    fn at_most_ten_keywords() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda navigation \
                    mission orbit station module payload thruster telemetry sensor";
        assert!(KeywordExtractor::new().extract(text).len() <= 10);
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "release notes draft release candidate testing notes final release build";
        let a = KeywordExtractor::new().extract(text);
        let b = KeywordExtractor::new().extract(text);
        assert_eq!(a, b);
    }
}
