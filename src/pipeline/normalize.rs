//! Content normalizer — raw email body to clean plain text.
//!
//! Strips HTML markup, quoted-reply blocks, and signature boilerplate, then
//! collapses irregular whitespace. Total and deterministic: malformed markup
//! degrades to best-effort text, never an error.

use regex::Regex;

use crate::pipeline::types::MimeHint;

/// Compiled pattern set for body cleanup. Build once, reuse per email.
pub struct Normalizer {
    /// Client-specific reply header, e.g. "On Mon, Jan 1, Jane wrote:".
    /// Matches inline as well as on its own line.
    quote_header: Regex,
    /// Lines that start a signature block. Everything from the first match
    /// to the end of the body is dropped.
    signature_starts: Vec<Regex>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        let quote_header = Regex::new(r"(?i)\bon .{0,120}?wrote:").unwrap();
        let signature_starts = vec![
            Regex::new(r"^--\s*$").unwrap(),
            Regex::new(r"(?i)^(best regards|kind regards|regards,|sincerely,|thanks,|thank you,|cheers,)").unwrap(),
            Regex::new(r"(?i)sent from my (iphone|ipad|android)").unwrap(),
            Regex::new(r"(?i)get outlook for").unwrap(),
        ];
        Self {
            quote_header,
            signature_starts,
        }
    }

    /// Normalize a raw body into clean plain text.
    ///
    /// The mime hint selects whether HTML entities are decoded; tag removal
    /// and quote/signature stripping run regardless, so the output never
    /// contains raw markup.
    pub fn normalize(&self, body: &str, hint: MimeHint) -> String {
        let text = match hint {
            MimeHint::Html => strip_tags(&decode_entities(body)),
            MimeHint::Plain => strip_tags(body),
        };

        let mut kept: Vec<String> = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim_start();
            // Quoted reply lines
            if trimmed.starts_with('>') {
                continue;
            }
            // Inline or standalone "On ... wrote:" header — keep the prefix,
            // drop the header and anything after it on that line.
            if let Some(m) = self.quote_header.find(line) {
                let prefix = line[..m.start()].trim_end();
                if !prefix.is_empty() {
                    kept.push(prefix.to_string());
                }
                continue;
            }
            kept.push(line.to_string());
        }

        // Cut at the first signature marker.
        let sig_idx = kept.iter().position(|line| {
            let t = line.trim();
            self.signature_starts.iter().any(|p| p.is_match(t))
        });
        if let Some(idx) = sig_idx {
            kept.truncate(idx);
        }

        collapse_whitespace(&kept.join("\n"))
    }
}

/// Remove everything between `<` and `>`. Block-level closers become
/// newlines first so visible line structure survives the strip.
fn strip_tags(input: &str) -> String {
    let mut text = input.to_string();
    for tag in ["<br>", "<br/>", "<br />", "</p>", "</div>", "</li>", "</tr>", "</h1>", "</h2>", "</h3>"] {
        let lower = text.to_lowercase();
        if lower.contains(tag) {
            // Replace case-insensitively by scanning the lowered copy.
            let mut out = String::with_capacity(text.len());
            let mut last = 0;
            for (idx, _) in lower.match_indices(tag) {
                out.push_str(&text[last..idx]);
                out.push('\n');
                last = idx + tag.len();
            }
            out.push_str(&text[last..]);
            text = out;
        }
    }

    // Drop style/script bodies wholesale before the generic strip.
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result
}

/// Decode the common HTML entities plus numeric character references.
fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let semi = tail.find(';').filter(|&i| i <= 10);
        match semi {
            Some(end) => {
                let entity = &tail[1..end];
                match entity {
                    "amp" => out.push('&'),
                    "lt" => out.push('<'),
                    "gt" => out.push('>'),
                    "quot" => out.push('"'),
                    "apos" => out.push('\''),
                    "nbsp" => out.push(' '),
                    _ => {
                        let decoded = entity
                            .strip_prefix("#x")
                            .or_else(|| entity.strip_prefix("#X"))
                            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                            .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                            .and_then(char::from_u32);
                        match decoded {
                            Some(c) => out.push(c),
                            None => {
                                // Unknown entity — keep it verbatim.
                                out.push_str(&tail[..=end]);
                            }
                        }
                    }
                }
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Collapse runs of spaces/tabs, drop invisible characters, limit blank
/// lines to one, and trim the result.
fn collapse_whitespace(input: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in input.lines() {
        let cleaned: String = line
            .chars()
            .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}'))
            .map(|c| if c == '\u{00A0}' || c == '\t' { ' ' } else { c })
            .collect();
        let collapsed = cleaned.split(' ').filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");
        lines.push(collapsed);
    }

    // At most one blank line in a row.
    let mut out: Vec<&str> = Vec::new();
    let mut prev_blank = false;
    for line in &lines {
        let blank = line.is_empty();
        if blank && prev_blank {
            continue;
        }
        out.push(line);
        prev_blank = blank;
    }
    out.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm() -> Normalizer {
        Normalizer::new()
    }

    #[test]
    fn strips_html_tags() {
        let out = norm().normalize("<div><b>Bold</b> and <i>italic</i></div>", MimeHint::Html);
        assert_eq!(out, "Bold and italic");
    }

    #[test]
    fn decodes_entities_in_html() {
        let out = norm().normalize("Tom &amp; Jerry &quot;cartoon&quot;", MimeHint::Html);
        assert_eq!(out, "Tom & Jerry \"cartoon\"");
    }

    #[test]
    fn decodes_numeric_entities() {
        let out = norm().normalize("caf&#233; &#x41;", MimeHint::Html);
        assert_eq!(out, "café A");
    }

    #[test]
    fn plain_text_entities_left_alone() {
        let out = norm().normalize("a &amp; b", MimeHint::Plain);
        assert_eq!(out, "a &amp; b");
    }

    #[test]
    fn br_tags_become_line_breaks() {
        let out = norm().normalize("line one<br>line two<br/>line three", MimeHint::Html);
        assert_eq!(out, "line one\nline two\nline three");
    }

    #[test]
    fn drops_quoted_reply_lines() {
        let out = norm().normalize("New text\n> old reply\n>> older reply\nMore text", MimeHint::Plain);
        assert_eq!(out, "New text\nMore text");
    }

    #[test]
    fn drops_on_wrote_header_line() {
        let out = norm().normalize(
            "Thanks!\nOn Mon, Jan 1, 2026 at 9:00 AM Jane Doe wrote:\n> quoted",
            MimeHint::Plain,
        );
        assert_eq!(out, "Thanks!");
    }

    #[test]
    fn truncates_inline_on_wrote_header() {
        let out = norm().normalize(
            "Hi John, On Mon, Jan 1, Jane wrote: > old reply\nPlease send the report by Friday.",
            MimeHint::Plain,
        );
        assert!(out.contains("Hi John,"));
        assert!(out.contains("Please send the report by Friday."));
        assert!(!out.contains("old reply"));
    }

    #[test]
    fn cuts_signature_at_dashes() {
        let out = norm().normalize("Real content\n--\nJane Doe\nAcme Corp", MimeHint::Plain);
        assert_eq!(out, "Real content");
    }

    #[test]
    fn cuts_signature_at_sign_off() {
        let out = norm().normalize("See you then.\nBest regards,\nJane", MimeHint::Plain);
        assert_eq!(out, "See you then.");
    }

    #[test]
    fn cuts_sent_from_my_iphone() {
        let out = norm().normalize("Quick note\nSent from my iPhone", MimeHint::Plain);
        assert_eq!(out, "Quick note");
    }

    #[test]
    fn collapses_whitespace_and_blank_lines() {
        let out = norm().normalize("a   b\t\tc\n\n\n\nd", MimeHint::Plain);
        assert_eq!(out, "a b c\n\nd");
    }

    #[test]
    fn strips_invisible_characters() {
        let out = norm().normalize("a\u{200B}b\u{FEFF}c", MimeHint::Plain);
        assert_eq!(out, "abc");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(norm().normalize("", MimeHint::Html), "");
        assert_eq!(norm().normalize("   \n  ", MimeHint::Plain), "");
    }

    #[test]
    fn malformed_markup_degrades_gracefully() {
        let out = norm().normalize("<div <p broken >text<", MimeHint::Html);
        assert!(out.contains("text"));
        assert!(!out.contains('<') || !out.contains('>'));
    }

    #[test]
    fn never_emits_tags() {
        let inputs = [
            "<html><body><p>hello</p></body></html>",
            "<a href=\"x\">link</a> trailing",
            "prefix <unclosed",
            "&lt;b&gt;encoded&lt;/b&gt;",
        ];
        let n = norm();
        let tag = Regex::new(r"<[a-zA-Z/][^>]*>").unwrap();
        for input in inputs {
            let out = n.normalize(input, MimeHint::Html);
            assert!(!tag.is_match(&out), "tags left in {out:?}");
        }
    }
}
