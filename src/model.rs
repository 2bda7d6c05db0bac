use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label used when a feed URL matches no known provider.
pub const GENERIC_SOURCE_LABEL: &str = "News Source";

pub const DEFAULT_LANGUAGE: &str = "en";

/// Known providers, matched by substring against the feed URL in order.
const PROVIDERS: &[(&str, &str)] = &[
    ("bbc", "BBC News"),
    ("cnn", "CNN"),
    ("reuters", "Reuters"),
    ("timesofindia", "Times of India"),
    ("hindustantimes", "Hindustan Times"),
    ("indianexpress", "Indian Express"),
    ("onmanorama", "Manorama Online"),
    ("mathrubhumi", "Mathrubhumi"),
    ("asianetnews", "Asianet News"),
];

/// One normalized article, whatever feed format it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub excerpt: String,
    pub category: String,
    pub url: String,
    pub source: String,
    pub language: String,
    pub content: String,
}

/// A feed endpoint together with the label its items are attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub url: String,
    pub label: String,
    pub language: String,
}

impl SourceDescriptor {
    /// Build a descriptor whose label comes from the provider table.
    pub fn from_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            label: label_for_url(url).to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

pub fn label_for_url(url: &str) -> &'static str {
    PROVIDERS
        .iter()
        .find(|(pattern, _)| url.contains(pattern))
        .map(|(_, label)| *label)
        .unwrap_or(GENERIC_SOURCE_LABEL)
}

/// Whether a snapshot holds live feed content or the canned fallback set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOrigin {
    Live,
    Fallback,
}

/// What happened to one source during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub url: String,
    pub items: usize,
    pub error: Option<String>,
}

/// The ranked result of one aggregation run. Never modified after construction;
/// a refresh builds a new snapshot instead.
#[derive(Debug, Clone)]
pub struct AggregationSnapshot {
    items: Vec<ContentItem>,
    created_at: DateTime<Utc>,
    origin: SnapshotOrigin,
    reports: Vec<SourceReport>,
}

impl AggregationSnapshot {
    pub fn new(
        items: Vec<ContentItem>,
        created_at: DateTime<Utc>,
        origin: SnapshotOrigin,
        reports: Vec<SourceReport>,
    ) -> Self {
        Self {
            items,
            created_at,
            origin,
            reports,
        }
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn origin(&self) -> SnapshotOrigin {
        self.origin
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == SnapshotOrigin::Fallback
    }

    pub fn reports(&self) -> &[SourceReport] {
        &self.reports
    }
}
