//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Sanitize filename by removing invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    static INVALID_CHARS: OnceLock<Regex> = OnceLock::new();

    let re =
        INVALID_CHARS.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("Invalid regex pattern"));

    re.replace_all(filename, "_").to_string()
}

/// File-name fragment for a region: lower-cased, spaces to underscores
pub fn region_slug(region: &str) -> String {
    sanitize_filename(&normalize_whitespace(region).to_lowercase().replace(' ', "_"))
}

/// Whether the string is an absolute URL with scheme and host
pub fn is_valid_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| url.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

/// Human-readable rouble amount: millions, thousands or plain roubles
pub fn format_price(price: f64) -> String {
    if !price.is_finite() || price == 0.0 {
        return String::from("0 руб.");
    }

    if price >= 1_000_000.0 {
        format!("{} млн. руб.", (price / 1_000_000.0).round() as i64)
    } else if price >= 1_000.0 {
        format!("{} тыс. руб.", (price / 1_000.0).round() as i64)
    } else {
        format!("{} руб.", price.trunc() as i64)
    }
}

/// Truncate text to a maximum number of characters
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
