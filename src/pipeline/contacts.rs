//! Contact extraction — email addresses anchor a search window for the
//! surrounding name, phone number, and company.

use regex::Regex;

use crate::pipeline::types::Contact;

/// Characters of context searched around an address for a name.
const NAME_WINDOW: usize = 100;
/// Characters of context searched around an address for phone and company.
const DETAIL_WINDOW: usize = 200;

pub struct ContactExtractor {
    email: Regex,
    phone: Regex,
    name: Regex,
    company: Regex,
}

impl Default for ContactExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactExtractor {
    pub fn new() -> Self {
        Self {
            email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
            phone: Regex::new(r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\d{3})[\s.-]?\d{3}[\s.-]?\d{4}")
                .unwrap(),
            name: Regex::new(r"[A-Z][a-z]+ [A-Z][a-z]+").unwrap(),
            company: Regex::new(
                r"\b[A-Z][A-Za-z&]+(?:\s+[A-Z][A-Za-z&]+)*\s+(?:Inc|LLC|Ltd|Corp|Co|Company|Technologies|Labs|Group|Systems|Solutions)\b",
            )
            .unwrap(),
        }
    }

    /// Extract contacts from clean text. Each distinct address yields at most
    /// one contact; when no name appears near the address, one is derived
    /// from the local part.
    pub fn extract(&self, text: &str) -> Vec<Contact> {
        let mut contacts: Vec<Contact> = Vec::new();

        for m in self.email.find_iter(text) {
            let address = m.as_str();
            if contacts.iter().any(|c| c.email == address) {
                continue;
            }

            let name = self
                .name_near(text, m.start(), m.end())
                .unwrap_or_else(|| name_from_local_part(address));

            let detail_start = m.start().saturating_sub(DETAIL_WINDOW);
            let detail_end = (m.end() + DETAIL_WINDOW).min(text.len());
            let window = slice_at_char_boundaries(text, detail_start, detail_end);

            let phone = self.phone.find(window).map(|p| p.as_str().to_string());
            let company = self.company.find(window).map(|c| c.as_str().to_string());

            contacts.push(Contact {
                name,
                email: address.to_string(),
                phone,
                company,
                position: None,
            });
        }

        contacts
    }

    /// Closest capitalized name before the address, falling back to the
    /// first one after it.
    fn name_near(&self, text: &str, start: usize, end: usize) -> Option<String> {
        let before = slice_at_char_boundaries(text, start.saturating_sub(NAME_WINDOW), start);
        if let Some(m) = self.name.find_iter(before).last() {
            return Some(m.as_str().to_string());
        }
        let after = slice_at_char_boundaries(text, end, (end + NAME_WINDOW).min(text.len()));
        self.name.find(after).map(|m| m.as_str().to_string())
    }
}

/// "jane.doe@example.com" yields "Jane Doe".
fn name_from_local_part(address: &str) -> String {
    let local = address.split('@').next().unwrap_or(address);
    local
        .split(['.', '_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clamp byte offsets outward/inward to valid UTF-8 boundaries.
fn slice_at_char_boundaries(text: &str, mut start: usize, mut end: usize) -> &str {
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}
