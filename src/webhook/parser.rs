//! Field extraction from notification payloads
//!
//! The backend posts a semi-structured HTML-ish body. This is the only place
//! that knows its shape: extraction either yields typed fields or a typed
//! parse failure, never a panic.

use crate::ticketing::TicketId;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookParseError {
    #[error("notification payload has no requester address")]
    MissingAddress,
    #[error("notification payload has no ticket id")]
    MissingTicketId,
    #[error("notification payload has no title")]
    MissingTitle,
}

/// Fields extracted from one notification payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationFields {
    pub ticket_id: TicketId,
    pub title: String,
    pub requester_address: String,
}

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:<b>)?\s*E-?mail:\s*(?:</b>)?\s*([^<\s]+)").expect("valid regex")
    })
}

fn ticket_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Ticket[:\s#]+(\d+)").expect("valid regex"))
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Title\s*:\s*([^\n]+)").expect("valid regex"))
}

/// Extract only the requester address (the synchronous accept phase needs
/// nothing more).
pub fn extract_requester_address(raw: &str) -> Result<String, WebhookParseError> {
    address_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| strip_html(m.as_str()))
        .filter(|a| !a.is_empty())
        .ok_or(WebhookParseError::MissingAddress)
}

/// Extract every field the delayed processing phase needs.
pub fn parse_notification(raw: &str) -> Result<NotificationFields, WebhookParseError> {
    let requester_address = extract_requester_address(raw)?;

    let ticket_id = ticket_id_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or(WebhookParseError::MissingTicketId)?;

    let title = title_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| strip_html(m.as_str()))
        .filter(|t| !t.is_empty())
        .ok_or(WebhookParseError::MissingTitle)?;

    Ok(NotificationFields {
        ticket_id,
        title,
        requester_address,
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>?").expect("valid regex"))
}

fn line_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</p>").expect("valid regex"))
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid regex"))
}

/// Reduce an HTML fragment to readable plain text: entities decoded, line
/// breaks preserved, tags removed, blank runs collapsed.
pub fn strip_html(html: &str) -> String {
    let decoded = html
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#60;", "<")
        .replace("&#62;", ">")
        .replace("&nbsp;", " ");

    let with_breaks = line_break_re().replace_all(&decoded, "\n");
    let stripped = tag_re().replace_all(&with_breaks, "");
    blank_lines_re()
        .replace_all(stripped.trim(), "\n")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = "Ticket: #4821\n\
        Title: VPN access broken\n\
        <b>E-mail:</b> ada@example.com\n\
        <p>Status changed to pending</p>";

    #[test]
    fn full_payload_parses() {
        let fields = parse_notification(PAYLOAD).unwrap();
        assert_eq!(fields.ticket_id, 4821);
        assert_eq!(fields.title, "VPN access broken");
        assert_eq!(fields.requester_address, "ada@example.com");
    }

    #[test]
    fn address_survives_bold_markup() {
        let raw = "Ticket #9\nTitle: x\n<b>E-mail:</b> bob@example.com<br>";
        assert_eq!(
            extract_requester_address(raw).unwrap(),
            "bob@example.com"
        );
    }

    #[test]
    fn missing_address_is_a_typed_error() {
        assert_eq!(
            extract_requester_address("Ticket #1\nTitle: y"),
            Err(WebhookParseError::MissingAddress)
        );
    }

    #[test]
    fn missing_ticket_id_is_a_typed_error() {
        let raw = "Title: y\nE-mail: a@example.com";
        assert_eq!(
            parse_notification(raw),
            Err(WebhookParseError::MissingTicketId)
        );
    }

    #[test]
    fn strip_html_decodes_and_flattens() {
        let html = "<p>first&nbsp;line</p><p>second &amp; third</p>\n\n\nrest";
        assert_eq!(strip_html(html), "first line\nsecond & third\nrest");
    }
}
