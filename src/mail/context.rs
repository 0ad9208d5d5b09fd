//! Typed template context for reporter mails.
//!
//! Report text goes through a content-safety pass before it can appear in an
//! email: percent-encoded payloads are decoded a bounded number of times and
//! URLs are stripped. Text that still contains encoded characters after the
//! decode loop is treated as suspicious and no mail is produced for it.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::Value as JsonValue;

/// Matches URLs with or without a scheme, including user-info and ports.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:[a-z0-9.+-]*://)?(?:[^\s:@/]+(?::[^\s:@/]*)?@)?(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}(?::\d{2,5})?(?:[/?#][^\s]*)?",
    )
    .expect("url pattern compiles")
});

/// Matches percent-encoded characters such as `%2F`.
static ENCODED_CHARS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)%[0-9a-f]{2}").expect("encoded chars pattern compiles"));

/// Raised when report text still contains percent-encoded characters after
/// the bounded decode loop. Callers refuse to mail and record a note.
#[derive(Debug, thiserror::Error)]
#[error("text still contains percent-encoded characters after decoding")]
pub struct SuspiciousContent;

/// Decode nested percent-encoding (at most `max_iterations` passes), then
/// strip every URL.
pub fn cleanup_text(text: &str, max_iterations: usize) -> Result<String, SuspiciousContent> {
    let mut text = text.to_string();
    let mut remaining = max_iterations;
    while ENCODED_CHARS_PATTERN.is_match(&text) && remaining > 0 {
        text = percent_decode_str(&text).decode_utf8_lossy().into_owned();
        remaining -= 1;
    }
    if ENCODED_CHARS_PATTERN.is_match(&text) {
        return Err(SuspiciousContent);
    }
    Ok(URL_PATTERN.replace_all(&text, "").into_owned())
}

/// Keep the first character of the local part, mask the rest, keep the domain.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first = local.chars().next().unwrap_or('*');
            format!("{}***@{}", first, domain)
        }
        _ => "***".to_string(),
    }
}

/// Mask all but the last three digits of a phone number.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 3 {
        return "***".to_string();
    }
    let visible: String = digits[digits.len() - 3..].iter().collect();
    format!("{}{}", "*".repeat(digits.len() - 3), visible)
}

/// Everything the mail templates can reference, by name.
#[derive(Debug, Clone)]
pub struct MailContext {
    pub signal_id: i64,
    pub formatted_signal_id: String,
    pub created_at: DateTime<FixedOffset>,
    pub incident_date_start: DateTime<FixedOffset>,
    pub text: String,
    pub text_extra: String,
    pub address: Option<JsonValue>,
    pub status_state_label: String,
    pub status_text: Option<String>,
    pub handling_message: Option<String>,
    pub organization_name: String,
    pub main_category_public_name: String,
    pub sub_category_public_name: String,
    pub source: String,
    pub reporter_email_masked: Option<String>,
    pub reporter_phone_masked: Option<String>,
}

impl MailContext {
    /// Display form of the signal id used in subjects and bodies.
    pub fn format_signal_id(id: i64) -> String {
        format!("SIG-{}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_stripped_from_text() {
        let cleaned =
            cleanup_text("Please visit https://example.com/path?q=1 for details", 5).unwrap();
        assert!(!cleaned.contains("example.com"));
        assert!(cleaned.contains("Please visit"));

        let cleaned = cleanup_text("bare domain example.org here", 5).unwrap();
        assert!(!cleaned.contains("example.org"));
    }

    #[test]
    fn nested_encoding_is_decoded_then_stripped() {
        // %2568 decodes to %68 decodes to h
        let cleaned = cleanup_text("go to %2568ttp://example.com now", 5).unwrap();
        assert!(!cleaned.contains("example.com"));
        assert!(!cleaned.contains('%'));
    }

    #[test]
    fn deeply_nested_encoding_is_refused() {
        // Six layers of encoding outlast a five-pass decode loop:
        // each pass turns one leading "%25" back into "%".
        let payload = format!("%{}41", "25".repeat(5));
        assert!(cleanup_text(&payload, 5).is_err());
    }

    #[test]
    fn plain_text_passes_through() {
        let text = "Overflowing garbage container on the corner";
        assert_eq!(cleanup_text(text, 5).unwrap(), text);
    }

    #[test]
    fn email_masking_keeps_domain() {
        assert_eq!(mask_email("reporter@example.com"), "r***@example.com");
        assert_eq!(mask_email("not-an-email"), "***");
    }

    #[test]
    fn phone_masking_keeps_last_digits() {
        assert_eq!(mask_phone("+31 6 1234 5678"), "********678");
        assert_eq!(mask_phone("12"), "***");
    }
}
