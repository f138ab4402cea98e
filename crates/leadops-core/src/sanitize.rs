//! Input sanitization for user-supplied strings.
//!
//! `sanitize_input` is for single-line values rendered into HTML,
//! `sanitize_text_content` for multi-line free text, and `sanitize_email`
//! normalizes an address or rejects it with an empty string.

use regex::Regex;
use std::sync::LazyLock;

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("Invalid email regex")
});

fn strip_tags(input: &str) -> String {
    TAG_REGEX.replace_all(input, "").into_owned()
}

/// Strip HTML tags and escape the characters that matter in markup.
pub fn sanitize_input(input: &str) -> String {
    let stripped = strip_tags(input);
    let mut out = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out.trim().to_string()
}

/// Strip tags from free text while keeping its line structure.
///
/// Quotes and ampersands are left alone. Control characters other than
/// newline, carriage return and tab are dropped.
pub fn sanitize_text_content(input: &str) -> String {
    let stripped = strip_tags(input);
    let mut out = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' | '\r' | '\t' => out.push(c),
            c if c.is_control() => {}
            other => out.push(other),
        }
    }
    out.trim().to_string()
}

/// Normalize an email address; returns `""` when the result is not a valid address.
pub fn sanitize_email(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '+' | '-'))
        .collect();

    if EMAIL_REGEX.is_match(&cleaned) {
        cleaned
    } else {
        String::new()
    }
}
