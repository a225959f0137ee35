//! Summarizer — bounded extractive summaries with content-type dispatch.
//!
//! Three strategies, picked by sniffing the clean text:
//! - receipts/transactional mail → template key-fact extraction
//! - list-like bodies → title plus leading items
//! - general prose → frequency-ranked sentence selection
//!
//! Total: empty input returns a fixed placeholder, short input is returned
//! as-is, and every path respects the hard length cap.

use std::collections::HashMap;

use regex::Regex;

use crate::pipeline::keywords::content_tokens;

/// Returned for empty or whitespace-only input.
pub const SUMMARY_PLACEHOLDER: &str = "(no content)";

/// Sentences kept by the extractive strategy.
const MAX_SENTENCES: usize = 3;

/// Hard cap on summary length, applied to every strategy.
pub const MAX_SUMMARY_CHARS: usize = 400;

/// Inputs shorter than this are returned verbatim instead of summarized.
const MIN_SUMMARIZE_CHARS: usize = 10;

/// Detected content shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    Receipt,
    List,
    Prose,
}

pub struct Summarizer {
    receipt_marker: Regex,
    list_marker: Regex,
    merchant_patterns: Vec<Regex>,
    date_pattern: Regex,
    order_number: Regex,
    total_amount: Regex,
    line_amount: Regex,
    quantity_prefix: Regex,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Summarizer {
    pub fn new() -> Self {
        Self {
            receipt_marker: Regex::new(
                r"(?i)\b(order\s+number|subtotal|paid\s+with|receipt|invoice|confirmation)\b|\$\d+\.\d{2}",
            )
            .unwrap(),
            list_marker: Regex::new(r"(?m)^\s*([*\-•]|\d+\.|[a-z]\))\s+\S").unwrap(),
            merchant_patterns: vec![
                Regex::new(r"(?i)receipt\s+from\s+([A-Za-z][\w &']{1,40})").unwrap(),
                Regex::new(r"(?i)thank\s+you\s+for\s+shopping\s+at\s+([A-Za-z][\w &']{1,40})").unwrap(),
                Regex::new(r"(?i)^([A-Za-z][\w &']{1,40}?)\s+order\s+confirmation").unwrap(),
            ],
            date_pattern: Regex::new(
                r"(?i)\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b|\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+\d{1,2},?\s+\d{2,4}\b",
            )
            .unwrap(),
            order_number: Regex::new(r"(?i)order\s+(?:number|#)?\s*:?\s*#?([A-Za-z0-9\-]{3,})").unwrap(),
            total_amount: Regex::new(r"(?i)\btotal\s*:?\s*\$?(\d+\.\d{2})").unwrap(),
            line_amount: Regex::new(r"^(.*?)\s*\$(\d+\.\d{2})\s*$").unwrap(),
            quantity_prefix: Regex::new(r"^(\d+)\s*[x*]\s*(.+)$").unwrap(),
        }
    }

    /// Classify the text shape for strategy dispatch.
    pub fn detect_shape(&self, text: &str) -> ContentShape {
        if self.receipt_marker.is_match(text) {
            ContentShape::Receipt
        } else if self.list_marker.is_match(text) {
            ContentShape::List
        } else {
            ContentShape::Prose
        }
    }

    /// Produce a bounded summary of clean text.
    pub fn summarize(&self, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return SUMMARY_PLACEHOLDER.to_string();
        }
        if text.chars().count() < MIN_SUMMARIZE_CHARS {
            return text.to_string();
        }

        let summary = match self.detect_shape(text) {
            ContentShape::Receipt => self.summarize_receipt(text),
            ContentShape::List => self.summarize_list(text),
            ContentShape::Prose => summarize_prose(text, MAX_SENTENCES),
        };

        truncate_chars(&summary, MAX_SUMMARY_CHARS)
    }

    /// Key-fact extraction for receipts and order confirmations.
    fn summarize_receipt(&self, text: &str) -> String {
        let merchant = self
            .merchant_patterns
            .iter()
            .find_map(|p| p.captures(text))
            .map(|c| c[1].trim().to_string());

        let date = self.date_pattern.find(text).map(|m| m.as_str().to_string());
        let order = self.order_number.captures(text).map(|c| c[1].to_string());
        let total = self.total_amount.captures(text).map(|c| c[1].to_string());

        let mut items: Vec<String> = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            let lower = line.to_lowercase();
            if ["subtotal", "tax", "total", "tip", "donation"]
                .iter()
                .any(|x| lower.contains(x))
            {
                continue;
            }
            if let Some(cap) = self.line_amount.captures(line) {
                let name = cap[1].trim().trim_end_matches(['.', ':']).to_string();
                if name.len() > 2 && !name.chars().all(|c| c.is_ascii_digit()) {
                    if let Some(q) = self.quantity_prefix.captures(&name) {
                        items.push(format!("{}x {}", &q[1], q[2].trim()));
                    } else {
                        items.push(name);
                    }
                }
            }
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(m) = merchant {
            parts.push(m);
        }
        if let Some(o) = order {
            parts.push(format!("Order #{o}"));
        }
        if let Some(d) = date {
            parts.push(format!("on {d}"));
        }
        if !items.is_empty() {
            if items.len() <= 3 {
                parts.push(format!("Items: {}", items.join(", ")));
            } else {
                parts.push(format!("{} items", items.len()));
            }
        }
        if let Some(t) = total {
            parts.push(format!("Total: ${t}"));
        }

        if parts.is_empty() {
            // Template extraction found nothing — fall back to leading lines.
            return text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .take(3)
                .collect::<Vec<_>>()
                .join(" ");
        }
        parts.join(" - ")
    }

    /// Title plus leading items for bullet/numbered lists.
    fn summarize_list(&self, text: &str) -> String {
        let mut items: Vec<String> = Vec::new();
        let mut title = String::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if self.list_marker.is_match(line) {
                let item = trimmed
                    .trim_start_matches(['*', '-', '•'])
                    .trim_start_matches(|c: char| c.is_ascii_digit())
                    .trim_start_matches(['.', ')'])
                    .trim();
                if !item.is_empty() {
                    items.push(item.to_string());
                }
            } else if title.is_empty() {
                title = trimmed.to_string();
            }
        }

        if items.is_empty() {
            return summarize_prose(text, MAX_SENTENCES);
        }

        let body = if items.len() <= MAX_SENTENCES {
            items.join(", ")
        } else {
            format!(
                "{} and {} more items",
                items[..MAX_SENTENCES - 1].join(", "),
                items.len() - (MAX_SENTENCES - 1)
            )
        };

        if title.is_empty() {
            body
        } else {
            format!("{title}: {body}")
        }
    }
}

/// Frequency-based extractive summarization for prose.
///
/// Sentences are scored by the mean frequency of their content tokens, with
/// a position bonus for the first and last sentence and a penalty for very
/// short or very long sentences. The top `k` are returned in original order.
fn summarize_prose(text: &str, k: usize) -> String {
    let sentences = split_sentences(text);
    if sentences.len() <= k {
        return sentences.join(" ");
    }

    let mut freq: HashMap<String, usize> = HashMap::new();
    for token in content_tokens(text) {
        *freq.entry(token).or_insert(0) += 1;
    }

    let mut scored: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            let tokens = content_tokens(sentence);
            let position_weight = if i == 0 || i == sentences.len() - 1 {
                1.5
            } else {
                1.0
            };
            let length_weight = match tokens.len() {
                0..=2 => 0.5,
                26.. => 0.7,
                _ => 1.0,
            };
            let raw: usize = tokens.iter().map(|t| freq.get(t).copied().unwrap_or(0)).sum();
            let score = if tokens.is_empty() {
                0.0
            } else {
                (raw as f64 / tokens.len() as f64) * position_weight * length_weight
            };
            (i, score)
        })
        .collect();

    // Stable on ties: earlier sentence wins.
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    let mut picked: Vec<usize> = scored.iter().take(k).map(|(i, _)| *i).collect();
    picked.sort_unstable();

    picked
        .into_iter()
        .map(|i| sentences[i].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text into sentences on terminal punctuation followed by whitespace.
/// Newlines also terminate a sentence; fragments without punctuation count.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            let s = current.trim();
            if !s.is_empty() {
                sentences.push(s.to_string());
            }
            current.clear();
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            let s = current.trim();
            if !s.is_empty() {
                sentences.push(s.to_string());
            }
            current.clear();
        }
    }
    let s = current.trim();
    if !s.is_empty() {
        sentences.push(s.to_string());
    }
    sentences
}

/// Truncate on a char boundary, appending an ellipsis when cut.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
