//! Feed parsing strategies.
//!
//! Feeds in the wild are frequently malformed, so records are located and
//! fields extracted by pattern scanning rather than a strict XML parse. Three
//! strategies are tried in order and the first one that yields anything wins.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::categorize::categorize;
use crate::model::ContentItem;
use crate::normalize::{clean_text, normalize_field, parse_date, truncate};

/// Upper bound on records examined per document by any one parser.
pub const MAX_RECORDS_PER_SOURCE: usize = 15;
pub const EXCERPT_MAX_CHARS: usize = 160;
pub const CONTENT_MAX_CHARS: usize = 500;

const PLACEHOLDER_URL: &str = "#";

const FIELD_TAGS: &[&str] = &[
    "title",
    "link",
    "guid",
    "description",
    "content:encoded",
    "content",
    "summary",
    "pubDate",
    "dc:date",
    "published",
    "updated",
];

static RE_RSS_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<item\s*>(.*?)</item\s*>").expect("item pattern"));
static RE_ATOM_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<entry\s*>(.*?)</entry\s*>").expect("entry pattern"));
static RE_ANY_RECORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<item(?:\s[^>]*)?>(.*?)</item\s*>|<entry(?:\s[^>]*)?>(.*?)</entry\s*>")
        .expect("record pattern")
});
static FIELD_PATTERNS: Lazy<HashMap<&'static str, FieldPattern>> = Lazy::new(|| {
    FIELD_TAGS
        .iter()
        .map(|tag| (*tag, FieldPattern::new(tag)))
        .collect()
});

/// The three ways a field value can be written inside a record.
struct FieldPattern {
    cdata: Regex,
    inline: Regex,
    href: Regex,
}

impl FieldPattern {
    fn new(tag: &str) -> Self {
        let tag = regex::escape(tag);
        // Opening tag, optionally with attributes, but not self-closing.
        let open = format!(r"<{tag}(?:\s[^>]*[^>/]|\s)?>");
        let close = format!(r"</{tag}\s*>");

        Self {
            cdata: Regex::new(&format!(r"(?is){open}\s*<!\[CDATA\[(.*?)\]\]>\s*{close}"))
                .expect("cdata pattern"),
            inline: Regex::new(&format!(r"(?is){open}(.*?){close}")).expect("inline pattern"),
            href: Regex::new(&format!(
                r#"(?is)<{tag}\s[^>]*?href\s*=\s*["']([^"']+)["'][^>]*>"#
            ))
            .expect("href pattern"),
        }
    }

    fn find(&self, block: &str) -> Option<String> {
        if let Some(caps) = self.cdata.captures(block) {
            let text = clean_text(&caps[1]);
            if !text.is_empty() {
                return Some(text);
            }
        }
        if let Some(caps) = self.inline.captures(block) {
            let text = clean_text(&caps[1]);
            if !text.is_empty() {
                return Some(text);
            }
        }
        self.href
            .captures(block)
            .map(|caps| caps[1].trim().to_string())
            .filter(|href| !href.is_empty())
    }
}

/// Return the first non-empty value among `tags`, trying each tag's CDATA,
/// inline and `href` forms before moving on to the next tag.
pub fn extract_field(block: &str, tags: &[&str]) -> Option<String> {
    tags.iter()
        .filter_map(|tag| FIELD_PATTERNS.get(*tag))
        .find_map(|pattern| pattern.find(block))
}

/// Per-document information parsers need besides the text itself.
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    pub source: &'a str,
    pub language: &'a str,
    /// Publish time assigned to records without a usable date.
    pub fetched_at: DateTime<Utc>,
}

pub trait FeedParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parse `raw` into items, or return an empty list if the format doesn't match.
    fn attempt(&self, raw: &str, ctx: &ParseContext<'_>) -> Vec<ContentItem>;
}

/// Field values for one record before normalization.
#[derive(Debug, Default)]
struct RawRecord {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    body: Option<String>,
    published: Option<String>,
}

impl RawRecord {
    fn into_item(self, ctx: &ParseContext<'_>) -> Option<ContentItem> {
        let title = normalize_field(self.title.as_deref()?);
        if title.is_empty() {
            return None;
        }

        let description = self
            .description
            .as_deref()
            .map(normalize_field)
            .filter(|d| !d.is_empty());
        let body = self
            .body
            .as_deref()
            .map(normalize_field)
            .filter(|b| !b.is_empty());

        let excerpt = truncate(
            description.as_deref().unwrap_or(title.as_str()),
            EXCERPT_MAX_CHARS,
        );
        let content = truncate(
            body.as_deref()
                .or(description.as_deref())
                .unwrap_or(title.as_str()),
            CONTENT_MAX_CHARS,
        );
        let url = self
            .link
            .map(|l| l.trim().to_string())
            .filter(|l| l.starts_with("http"))
            .unwrap_or_else(|| PLACEHOLDER_URL.to_string());
        let date = parse_date(self.published.as_deref().unwrap_or_default(), ctx.fetched_at);
        let category = categorize(&title, description.as_deref()).to_string();

        Some(ContentItem {
            id: format!("news-{}", Uuid::new_v4().simple()),
            title,
            date,
            excerpt,
            category,
            url,
            source: ctx.source.to_string(),
            language: ctx.language.to_string(),
            content,
        })
    }
}

/// RSS 2.0: bare `<item>` records with element-text links.
pub struct StandardParser;

impl FeedParser for StandardParser {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn attempt(&self, raw: &str, ctx: &ParseContext<'_>) -> Vec<ContentItem> {
        RE_RSS_ITEM
            .captures_iter(raw)
            .take(MAX_RECORDS_PER_SOURCE)
            .filter_map(|caps| {
                let block = caps.get(1)?.as_str();
                RawRecord {
                    title: extract_field(block, &["title"]),
                    link: extract_field(block, &["link"])
                        .or_else(|| extract_field(block, &["guid"])),
                    description: extract_field(block, &["description"]),
                    body: extract_field(block, &["content:encoded"]),
                    published: extract_field(block, &["pubDate", "dc:date"]),
                }
                .into_item(ctx)
            })
            .collect()
    }
}

/// Atom: `<entry>` records whose link lives in an `href` attribute.
pub struct AtomParser;

impl FeedParser for AtomParser {
    fn name(&self) -> &'static str {
        "atom"
    }

    fn attempt(&self, raw: &str, ctx: &ParseContext<'_>) -> Vec<ContentItem> {
        RE_ATOM_ENTRY
            .captures_iter(raw)
            .take(MAX_RECORDS_PER_SOURCE)
            .filter_map(|caps| {
                let block = caps.get(1)?.as_str();
                RawRecord {
                    title: extract_field(block, &["title"]),
                    link: extract_field(block, &["link"]),
                    description: extract_field(block, &["summary"]),
                    body: extract_field(block, &["content"]),
                    published: extract_field(block, &["published", "updated"]),
                }
                .into_item(ctx)
            })
            .collect()
    }
}

/// Last resort for hybrid or sloppy documents: accepts either record
/// delimiter, with or without attributes, and any of the known field names.
pub struct LenientParser;

impl FeedParser for LenientParser {
    fn name(&self) -> &'static str {
        "lenient"
    }

    fn attempt(&self, raw: &str, ctx: &ParseContext<'_>) -> Vec<ContentItem> {
        RE_ANY_RECORD
            .captures_iter(raw)
            .take(MAX_RECORDS_PER_SOURCE)
            .filter_map(|caps| {
                let block = caps.get(1).or_else(|| caps.get(2))?.as_str();
                RawRecord {
                    title: extract_field(block, &["title"]),
                    link: extract_field(block, &["link", "guid"]),
                    description: extract_field(block, &["description", "summary"]),
                    body: extract_field(block, &["content:encoded", "content"]),
                    published: extract_field(
                        block,
                        &["pubDate", "dc:date", "published", "updated"],
                    ),
                }
                .into_item(ctx)
            })
            .collect()
    }
}

/// Ordered set of strategies; the first to produce at least one item wins.
pub struct ParserChain {
    parsers: Vec<Box<dyn FeedParser>>,
}

impl ParserChain {
    pub fn new(parsers: Vec<Box<dyn FeedParser>>) -> Self {
        Self { parsers }
    }

    pub fn parse(&self, raw: &str, ctx: &ParseContext<'_>) -> Vec<ContentItem> {
        for parser in &self.parsers {
            let items = parser.attempt(raw, ctx);
            if !items.is_empty() {
                debug!(
                    source = ctx.source,
                    parser = parser.name(),
                    count = items.len(),
                    "parser matched"
                );
                return items;
            }
        }
        debug!(source = ctx.source, "no parser matched");
        Vec::new()
    }
}

impl Default for ParserChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(StandardParser),
            Box::new(AtomParser),
            Box::new(LenientParser),
        ])
    }
}
