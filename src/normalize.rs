//! Text normalization applied to every field pulled out of a feed record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("entity pattern")
});
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));
// Only sequences shaped like an element tag; a lone `<` or `>` is text.
static RE_HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)</?[a-zA-Z][a-zA-Z0-9:-]*(?:\s[^<>]*)?/?>").expect("html tag pattern")
});
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

const ELLIPSIS: &str = "...";

fn named_entity(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "trade" => "\u{2122}",
        _ => return None,
    };
    Some(decoded)
}

fn numeric_entity(body: &str) -> Option<char> {
    let code = match body.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => body.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

/// Decode named and numeric character references in a single pass.
/// Anything not in the table is left exactly as written.
pub fn decode_entities(text: &str) -> String {
    RE_ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = match body.strip_prefix('#') {
                Some(number) => numeric_entity(number).map(String::from),
                None => named_entity(body).map(String::from),
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

pub fn strip_markup(text: &str) -> String {
    RE_TAGS.replace_all(text, "").into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    RE_WS.replace_all(text, " ").trim().to_string()
}

/// Strip tags and collapse whitespace, as done to raw extracted element text.
pub fn clean_text(text: &str) -> String {
    collapse_whitespace(&strip_markup(text))
}

/// Remove element tags that only appear once entities are decoded, leaving
/// comparison signs and other literal angle brackets alone.
pub fn strip_decoded_tags(text: &str) -> String {
    RE_HTML_TAG.replace_all(text, "").into_owned()
}

/// Full treatment for a field entering a `ContentItem`: clean the raw text,
/// decode references, then drop any entity-escaped HTML tags.
pub fn normalize_field(raw: &str) -> String {
    collapse_whitespace(&strip_decoded_tags(&decode_entities(&clean_text(raw))))
}

/// Cap `text` at `max_chars` characters, ellipsis included.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let head: String = text.chars().take(keep).collect();
    format!("{}{}", head.trim_end(), ELLIPSIS)
}

/// Parse the date formats seen in RSS and Atom feeds. Missing or unparseable
/// input yields `fallback`.
pub fn parse_date(raw: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    let raw = raw.trim();
    if raw.is_empty() {
        return fallback;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return dt.with_timezone(&Utc);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_utc();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return naive.and_utc();
        }
    }

    fallback
}
