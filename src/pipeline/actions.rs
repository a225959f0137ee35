//! Action-item and follow-up detection.
//!
//! Sentences containing task language become action items; a "by X" phrase in
//! the same sentence is resolved to a concrete deadline relative to the
//! caller-supplied reference time. Follow-up detection works the same way:
//! phrase match, then a suggested date two days out, rolled off weekends.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use regex::Regex;

use crate::pipeline::types::{ActionItem, FollowUp};

/// Phrases that mark a sentence as a task.
static ACTION_MARKERS: &[&str] = &[
    "please", "would you", "could you", "can you", "need you to", "should", "must", "review",
    "update", "create", "send", "share", "prepare", "complete", "follow up", "call", "email",
    "submit", "provide", "check", "confirm", "schedule", "organize",
];

/// Phrases that signal the sender expects a reply.
static FOLLOWUP_MARKERS: &[&str] = &[
    "follow up",
    "followup",
    "follow-up",
    "get back to",
    "let me know",
    "waiting for your response",
    "waiting for your reply",
    "looking forward to hearing",
    "would appreciate your response",
    "please respond",
    "hope to hear",
    "let's discuss",
    "will you be able to",
];

pub struct ActionExtractor {
    deadline_patterns: Vec<Regex>,
}

impl Default for ActionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExtractor {
    pub fn new() -> Self {
        let deadline_patterns = vec![
            Regex::new(r"by\s+(tomorrow|today|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b").unwrap(),
            Regex::new(r"by\s+(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{1,2})\b").unwrap(),
            Regex::new(r"by\s+(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b").unwrap(),
            Regex::new(r"by\s+end\s+of\s+(day|week|month)\b").unwrap(),
            Regex::new(r"by\s+(next|this)\s+(week|month|monday|tuesday|wednesday|thursday|friday)\b").unwrap(),
        ];
        Self { deadline_patterns }
    }

    /// Extract action items from clean text. `now` anchors relative
    /// deadline phrases so results are reproducible.
    pub fn extract(&self, text: &str, now: DateTime<Utc>) -> Vec<ActionItem> {
        let mut items = Vec::new();
        for sentence in split_sentences(text) {
            let lower = sentence.to_lowercase();
            if !ACTION_MARKERS.iter().any(|m| lower.contains(m)) {
                continue;
            }
            let deadline = self.find_deadline(&lower, now);
            items.push(ActionItem {
                text: sentence.trim().to_string(),
                deadline,
                completed: false,
            });
        }
        items
    }

    fn find_deadline(&self, lower: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        for (i, pattern) in self.deadline_patterns.iter().enumerate() {
            let Some(cap) = pattern.captures(lower) else {
                continue;
            };
            let deadline = match i {
                0 => resolve_day_word(&cap[1], now),
                1 => resolve_month_day(&cap[1], cap[2].parse().ok()?, now),
                2 => resolve_numeric_date(
                    cap[1].parse().ok()?,
                    cap[2].parse().ok()?,
                    cap.get(3).and_then(|m| m.as_str().parse().ok()),
                    now,
                ),
                3 => resolve_end_of(&cap[1], now),
                _ => resolve_relative(&cap[1], &cap[2], now),
            };
            if deadline.is_some() {
                return deadline;
            }
        }
        None
    }
}

/// Detect whether the sender expects a reply; suggests a date two days
/// after `now`, moved to Monday when it lands on a weekend.
pub struct FollowUpDetector;

impl FollowUpDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, text: &str, subject: &str, now: DateTime<Utc>) -> FollowUp {
        let combined = format!("{subject} {text}").to_lowercase();
        let needed = FOLLOWUP_MARKERS.iter().any(|m| combined.contains(m));
        if !needed {
            return FollowUp::none();
        }
        let mut date = now.date_naive() + Duration::days(2);
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let to_monday = 7 - date.weekday().num_days_from_monday() as i64;
            date += Duration::days(to_monday);
        }
        FollowUp {
            needed: true,
            date: Some(date),
        }
    }
}

impl Default for FollowUpDetector {
    fn default() -> Self {
        Self::new()
    }
}

// ── Deadline resolution ─────────────────────────────────────────────

fn resolve_day_word(word: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    let date = match word {
        "today" => today,
        "tomorrow" => today + Duration::days(1),
        _ => next_weekday(today, parse_weekday(word)?),
    };
    at_midnight(date)
}

fn resolve_month_day(month_name: &str, day: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let month = parse_month(month_name)?;
    let today = now.date_naive();
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    // A month/day already behind us means next year.
    let date = if this_year < today {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)?
    } else {
        this_year
    };
    at_midnight(date)
}

fn resolve_numeric_date(
    month: u32,
    day: u32,
    year: Option<i32>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    let date = match year {
        Some(y) => {
            let y = if y < 100 { y + 2000 } else { y };
            NaiveDate::from_ymd_opt(y, month, day)?
        }
        None => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
            if this_year < today {
                NaiveDate::from_ymd_opt(today.year() + 1, month, day)?
            } else {
                this_year
            }
        }
    };
    at_midnight(date)
}

fn resolve_end_of(unit: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    match unit {
        "day" => {
            let five_pm = NaiveTime::from_hms_opt(17, 0, 0)?;
            Utc.from_local_datetime(&today.and_time(five_pm)).single()
        }
        "week" => {
            let days_until_friday =
                (Weekday::Fri.num_days_from_monday() as i64 - today.weekday().num_days_from_monday() as i64).rem_euclid(7);
            at_midnight(today + Duration::days(days_until_friday))
        }
        "month" => {
            let first_of_next = if today.month() == 12 {
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
            };
            at_midnight(first_of_next - Duration::days(1))
        }
        _ => None,
    }
}

fn resolve_relative(qualifier: &str, unit: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    match unit {
        "week" => at_midnight(today + Duration::days(7)),
        "month" => at_midnight(today + Duration::days(30)),
        _ => {
            let target = parse_weekday(unit)?;
            let mut date = next_weekday(today, target);
            // "next monday" skips this week's occurrence.
            if qualifier == "next" && date.iso_week() == today.iso_week() {
                date += Duration::days(7);
            }
            at_midnight(date)
        }
    }
}

/// First occurrence of `target` strictly after `from`.
fn next_weekday(from: NaiveDate, target: Weekday) -> NaiveDate {
    let mut diff = (target.num_days_from_monday() as i64
        - from.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    if diff == 0 {
        diff = 7;
    }
    from + Duration::days(diff)
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_month(word: &str) -> Option<u32> {
    let months = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    months.iter().position(|m| *m == word).map(|i| i as u32 + 1)
}

fn at_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    Utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

/// Terminal-punctuation sentence split, newlines included as boundaries.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch == '\n' {
            if !current.trim().is_empty() {
                sentences.push(current.trim().to_string());
            }
            current.clear();
            continue;
        }
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            if !current.trim().is_empty() {
                sentences.push(current.trim().to_string());
            }
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences
}
