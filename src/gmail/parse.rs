//! Gmail message resource parsing.
//!
//! Turns the API's nested payload JSON into a flat [`RawEmail`]: headers for
//! subject/sender/date, a MIME part walk for the body (text/plain preferred,
//! text/html kept with a hint for the normalizer), and label ids for the
//! starred/important flags.

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::GmailError;
use crate::pipeline::types::{MimeHint, RawEmail};

/// A Gmail `users.messages.get` resource, trimmed to the fields we read.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResource {
    pub id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    pub payload: MessagePayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

/// Parse one message resource. `fallback_date` stands in when the Date
/// header is missing or unparseable.
pub fn parse_message(
    message: &MessageResource,
    fallback_date: DateTime<Utc>,
) -> Result<RawEmail, GmailError> {
    let mut subject = String::new();
    let mut from = String::new();
    let mut date_header = String::new();
    for header in &message.payload.headers {
        match header.name.to_lowercase().as_str() {
            "subject" => subject = header.value.clone(),
            "from" => from = header.value.clone(),
            "date" => date_header = header.value.clone(),
            _ => {}
        }
    }

    let (sender, sender_email) = split_from_header(&from);
    let received_at = DateTime::parse_from_rfc2822(&date_header)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fallback_date);

    let (body, mime_hint) = extract_body(&message.payload)?;

    Ok(RawEmail {
        gmail_id: message.id.clone(),
        subject,
        sender,
        sender_email,
        received_at,
        body,
        mime_hint,
        is_starred: message.label_ids.iter().any(|l| l == "STARRED"),
        is_important_flag: message.label_ids.iter().any(|l| l == "IMPORTANT"),
    })
}

/// Split `Jane Doe <jane@acme.com>` into display name and address. A bare
/// address is used for both.
fn split_from_header(from: &str) -> (String, String) {
    if let (Some(open), Some(close)) = (from.find('<'), from.rfind('>')) {
        if open < close {
            let address = from[open + 1..close].trim().to_string();
            let name = from[..open].trim().trim_matches('"').to_string();
            let name = if name.is_empty() {
                address.clone()
            } else {
                name
            };
            return (name, address);
        }
    }
    let address = from.trim().to_string();
    (address.clone(), address)
}

/// Walk the payload for the best body part: text/plain wins, text/html is
/// the fallback, multipart containers are searched one level at a time.
fn extract_body(payload: &MessagePayload) -> Result<(String, MimeHint), GmailError> {
    // Single-part message: body data sits on the payload itself.
    if payload.parts.is_empty() {
        let data = payload.body.as_ref().and_then(|b| b.data.as_deref());
        let body = match data {
            Some(data) => decode_body(data)?,
            None => String::new(),
        };
        let hint = hint_for(&payload.mime_type);
        return Ok((body, hint));
    }

    if let Some((data, hint)) = find_part(&payload.parts) {
        return Ok((decode_body(data)?, hint));
    }
    Ok((String::new(), MimeHint::Plain))
}

fn find_part(parts: &[MessagePart]) -> Option<(&str, MimeHint)> {
    let mut html: Option<&str> = None;
    for part in parts {
        let data = part.body.as_ref().and_then(|b| b.data.as_deref());
        match part.mime_type.as_str() {
            "text/plain" => {
                if let Some(data) = data {
                    return Some((data, MimeHint::Plain));
                }
            }
            "text/html" => {
                if html.is_none() {
                    html = data;
                }
            }
            mime if mime.starts_with("multipart/") => {
                if let Some(found) = find_part(&part.parts) {
                    match found.1 {
                        MimeHint::Plain => return Some(found),
                        MimeHint::Html => {
                            if html.is_none() {
                                html = Some(found.0);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    html.map(|data| (data, MimeHint::Html))
}

fn hint_for(mime_type: &str) -> MimeHint {
    if mime_type.eq_ignore_ascii_case("text/html") {
        MimeHint::Html
    } else {
        MimeHint::Plain
    }
}

/// Gmail body data is URL-safe base64, padded or not depending on the part.
fn decode_body(data: &str) -> Result<String, GmailError> {
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
        .map_err(|e| GmailError::MalformedMessage(format!("Bad base64 body: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| GmailError::MalformedMessage(format!("Body is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fallback() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap()
    }

    fn encode(text: &str) -> String {
        URL_SAFE.encode(text)
    }

    fn resource(json: serde_json::Value) -> MessageResource {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn parses_single_part_plain_message() {
        let msg = resource(serde_json::json!({
            "id": "m1",
            "labelIds": ["INBOX", "STARRED"],
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "Subject", "value": "Hello"},
                    {"name": "From", "value": "Jane Doe <jane@acme.com>"},
                    {"name": "Date", "value": "Wed, 4 Mar 2026 09:30:00 +0000"}
                ],
                "body": {"data": encode("Plain body text.")}
            }
        }));

        let email = parse_message(&msg, fallback()).unwrap();
        assert_eq!(email.gmail_id, "m1");
        assert_eq!(email.subject, "Hello");
        assert_eq!(email.sender, "Jane Doe");
        assert_eq!(email.sender_email, "jane@acme.com");
        assert_eq!(email.body, "Plain body text.");
        assert_eq!(email.mime_hint, MimeHint::Plain);
        assert!(email.is_starred);
        assert!(!email.is_important_flag);
        assert_eq!(
            email.received_at,
            Utc.with_ymd_and_hms(2026, 3, 4, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn prefers_plain_part_over_html() {
        let msg = resource(serde_json::json!({
            "id": "m2",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [],
                "parts": [
                    {"mimeType": "text/html", "body": {"data": encode("<p>html</p>")}},
                    {"mimeType": "text/plain", "body": {"data": encode("plain")}}
                ]
            }
        }));
        let email = parse_message(&msg, fallback()).unwrap();
        assert_eq!(email.body, "plain");
        assert_eq!(email.mime_hint, MimeHint::Plain);
    }

    #[test]
    fn falls_back_to_html_part() {
        let msg = resource(serde_json::json!({
            "id": "m3",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [],
                "parts": [
                    {"mimeType": "text/html", "body": {"data": encode("<p>only html</p>")}}
                ]
            }
        }));
        let email = parse_message(&msg, fallback()).unwrap();
        assert_eq!(email.body, "<p>only html</p>");
        assert_eq!(email.mime_hint, MimeHint::Html);
    }

    #[test]
    fn descends_into_nested_multipart() {
        let msg = resource(serde_json::json!({
            "id": "m4",
            "payload": {
                "mimeType": "multipart/mixed",
                "headers": [],
                "parts": [
                    {"mimeType": "multipart/alternative", "parts": [
                        {"mimeType": "text/plain", "body": {"data": encode("nested plain")}}
                    ]}
                ]
            }
        }));
        let email = parse_message(&msg, fallback()).unwrap();
        assert_eq!(email.body, "nested plain");
    }

    #[test]
    fn bare_from_address_doubles_as_name() {
        let msg = resource(serde_json::json!({
            "id": "m5",
            "payload": {
                "headers": [{"name": "From", "value": "noreply@example.com"}],
                "body": {"data": encode("x")},
                "mimeType": "text/plain"
            }
        }));
        let email = parse_message(&msg, fallback()).unwrap();
        assert_eq!(email.sender, "noreply@example.com");
        assert_eq!(email.sender_email, "noreply@example.com");
    }

    #[test]
    fn missing_date_uses_fallback() {
        let msg = resource(serde_json::json!({
            "id": "m6",
            "payload": {
                "headers": [],
                "body": {"data": encode("x")},
                "mimeType": "text/plain"
            }
        }));
        let email = parse_message(&msg, fallback()).unwrap();
        assert_eq!(email.received_at, fallback());
    }

    #[test]
    fn missing_body_yields_empty_string() {
        let msg = resource(serde_json::json!({
            "id": "m7",
            "payload": {"headers": [], "mimeType": "text/plain"}
        }));
        let email = parse_message(&msg, fallback()).unwrap();
        assert!(email.body.is_empty());
    }

    #[test]
    fn unpadded_base64_decodes() {
        let data = URL_SAFE_NO_PAD.encode("unpadded body");
        let msg = resource(serde_json::json!({
            "id": "m8",
            "payload": {
                "headers": [],
                "body": {"data": data},
                "mimeType": "text/plain"
            }
        }));
        let email = parse_message(&msg, fallback()).unwrap();
        assert_eq!(email.body, "unpadded body");
    }

    #[test]
    fn garbage_base64_is_a_malformed_message() {
        let msg = resource(serde_json::json!({
            "id": "m9",
            "payload": {
                "headers": [],
                "body": {"data": "!!!not base64!!!"},
                "mimeType": "text/plain"
            }
        }));
        let err = parse_message(&msg, fallback()).unwrap_err();
        assert!(matches!(err, GmailError::MalformedMessage(_)));
    }
}
