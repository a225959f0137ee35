//! Rule-based named-entity extraction.
//!
//! No model, just compiled patterns: capitalized-pair person names, company
//! suffixes for organizations, street/state-zip shapes for locations, and
//! literal patterns for dates, times, and money. Results are surface
//! mentions with a kind tag, deduplicated, in order of first occurrence.

use regex::Regex;

use crate::pipeline::types::{Entity, EntityKind};

pub struct EntityExtractor {
    money: Regex,
    time: Regex,
    date: Regex,
    organization: Regex,
    person: Regex,
    location: Regex,
}

/// Capitalized words that look like name parts but never are.
static NON_NAME_WORDS: &[&str] = &[
    "April", "August", "Best", "December", "February", "Friday", "January", "July", "June",
    "March", "May", "Monday", "November", "October", "Regards", "Saturday", "September",
    "Sunday", "Thank", "Thanks", "The", "This", "Thursday", "Tuesday", "Wednesday",
];

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor {
    pub fn new() -> Self {
        Self {
            money: Regex::new(r"\$\d{1,3}(?:,\d{3})*(?:\.\d{2})?").unwrap(),
            time: Regex::new(r"(?i)\b\d{1,2}:\d{2}\s?(?:am|pm)?\b|\b\d{1,2}\s?(?:am|pm)\b").unwrap(),
            date: Regex::new(
                r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:,?\s+\d{4})?\b|\b\d{1,2}/\d{1,2}(?:/\d{2,4})?\b|\b(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
            )
            .unwrap(),
            organization: Regex::new(
                r"\b([A-Z][A-Za-z&]+(?:\s+[A-Z][A-Za-z&]+)*)\s+(Inc|LLC|Ltd|Corp|Co|Company|Technologies|Labs|Group|Systems|Solutions)\b\.?",
            )
            .unwrap(),
            person: Regex::new(r"\b([A-Z][a-z]+)\s+([A-Z][a-z]+)\b").unwrap(),
            location: Regex::new(
                r"\b\d+\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\s+(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd)\b\.?|\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*,\s*[A-Z]{2}\s+\d{5}\b",
            )
            .unwrap(),
        }
    }

    /// Extract entity mentions from clean text.
    pub fn extract(&self, text: &str) -> Vec<Entity> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut found: Vec<(usize, Entity)> = Vec::new();

        // Organizations and locations first; their spans mask the person
        // pattern below so "Acme Labs" or "Elm Street" do not also surface
        // as person names.
        let mut masked_spans: Vec<(usize, usize)> = Vec::new();
        for cap in self.organization.captures_iter(text) {
            let whole = cap.get(0).unwrap();
            masked_spans.push((whole.start(), whole.end()));
            found.push((
                whole.start(),
                Entity {
                    text: whole.as_str().trim_end_matches('.').to_string(),
                    kind: EntityKind::Organization,
                },
            ));
        }

        for m in self.location.find_iter(text) {
            masked_spans.push((m.start(), m.end()));
            found.push((
                m.start(),
                Entity {
                    text: m.as_str().trim_end_matches('.').to_string(),
                    kind: EntityKind::Location,
                },
            ));
        }

        for cap in self.person.captures_iter(text) {
            let whole = cap.get(0).unwrap();
            let masked = masked_spans
                .iter()
                .any(|&(s, e)| whole.start() < e && s < whole.end());
            if masked {
                continue;
            }
            let first = &cap[1];
            let last = &cap[2];
            if NON_NAME_WORDS.contains(&first) || NON_NAME_WORDS.contains(&last) {
                continue;
            }
            found.push((
                whole.start(),
                Entity {
                    text: whole.as_str().to_string(),
                    kind: EntityKind::Person,
                },
            ));
        }

        for m in self.date.find_iter(text) {
            found.push((
                m.start(),
                Entity {
                    text: m.as_str().to_string(),
                    kind: EntityKind::Date,
                },
            ));
        }

        for m in self.time.find_iter(text) {
            found.push((
                m.start(),
                Entity {
                    text: m.as_str().to_string(),
                    kind: EntityKind::Time,
                },
            ));
        }

        for m in self.money.find_iter(text) {
            found.push((
                m.start(),
                Entity {
                    text: m.as_str().to_string(),
                    kind: EntityKind::Money,
                },
            ));
        }

        // Order of first occurrence, duplicates removed.
        found.sort_by_key(|(start, _)| *start);
        let mut entities: Vec<Entity> = Vec::new();
        for (_, entity) in found {
            if !entities.contains(&entity) {
                entities.push(entity);
            }
        }
        entities
    }
}
