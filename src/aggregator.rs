use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::FeaturedConfig;
use crate::fallback::{fallback_items, featured_fallback};
use crate::fetcher::Fetcher;
use crate::model::{
    AggregationSnapshot, ContentItem, SnapshotOrigin, SourceDescriptor, SourceReport,
};
use crate::parser::{FeedParser, ParseContext, ParserChain, StandardParser};
use crate::rank::dedup_and_rank;

/// Sources beyond this prefix of the list are ignored.
pub const DEFAULT_MAX_SOURCES: usize = 8;
pub const DEFAULT_PER_SOURCE_LIMIT: usize = 10;

/// Fans out one fetch-and-parse task per source and merges whatever comes back.
pub struct Aggregator {
    fetcher: Arc<Fetcher>,
    parsers: Arc<ParserChain>,
    sources: Vec<SourceDescriptor>,
    max_sources: usize,
    per_source_limit: usize,
}

struct SourceOutcome {
    items: Vec<ContentItem>,
    report: SourceReport,
}

impl Aggregator {
    pub fn new(fetcher: Arc<Fetcher>, sources: Vec<SourceDescriptor>) -> Self {
        Self {
            fetcher,
            parsers: Arc::new(ParserChain::default()),
            sources,
            max_sources: DEFAULT_MAX_SOURCES,
            per_source_limit: DEFAULT_PER_SOURCE_LIMIT,
        }
    }

    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = max_sources;
        self
    }

    pub fn with_per_source_limit(mut self, per_source_limit: usize) -> Self {
        self.per_source_limit = per_source_limit;
        self
    }

    pub fn with_parsers(mut self, parsers: ParserChain) -> Self {
        self.parsers = Arc::new(parsers);
        self
    }

    /// The sources a run actually fetches.
    pub fn active_sources(&self) -> &[SourceDescriptor] {
        &self.sources[..self.sources.len().min(self.max_sources)]
    }

    /// Run every active source concurrently and build a ranked snapshot.
    ///
    /// A source that fails, times out or panics contributes nothing; the run
    /// itself always completes. If no source yields anything the fallback
    /// set is ranked instead.
    pub async fn run(&self) -> AggregationSnapshot {
        let started = Instant::now();
        let active = self.active_sources();

        let mut tasks = JoinSet::new();
        for (index, source) in active.iter().cloned().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let parsers = Arc::clone(&self.parsers);
            let limit = self.per_source_limit;
            tasks.spawn(async move {
                let outcome = collect_source(&fetcher, &parsers, &source, limit).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<SourceOutcome>> = active.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!(error = %e, "source task did not complete"),
            }
        }

        // Merge in configuration order so first-seen dedup is reproducible.
        let mut merged = Vec::new();
        let mut reports = Vec::with_capacity(active.len());
        for (source, slot) in active.iter().zip(slots) {
            match slot {
                Some(outcome) => {
                    merged.extend(outcome.items);
                    reports.push(outcome.report);
                }
                None => reports.push(SourceReport {
                    source: source.label.clone(),
                    url: source.url.clone(),
                    items: 0,
                    error: Some("source task did not complete".to_string()),
                }),
            }
        }

        let (items, origin) = if merged.is_empty() {
            warn!(
                sources = active.len(),
                "no source produced items, using fallback content"
            );
            (fallback_items(Utc::now()), SnapshotOrigin::Fallback)
        } else {
            (merged, SnapshotOrigin::Live)
        };

        let items = dedup_and_rank(items);
        info!(
            sources = active.len(),
            items = items.len(),
            fallback = origin == SnapshotOrigin::Fallback,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation run complete"
        );

        AggregationSnapshot::new(items, Utc::now(), origin, reports)
    }
}

/// Items for the featured endpoint: one source, fetched uncached and read
/// with the RSS parser only. Every item carries the featured category.
/// Falls back to the featured placeholder when nothing usable comes back.
pub async fn featured_items(fetcher: &Fetcher, featured: &FeaturedConfig) -> Vec<ContentItem> {
    let source = featured.descriptor();
    let body = fetcher.fetch(&source.url).await;

    let ctx = ParseContext {
        source: &source.label,
        language: &source.language,
        fetched_at: Utc::now(),
    };
    let mut items = StandardParser.attempt(&body, &ctx);
    if items.is_empty() {
        warn!(source = %source.label, "featured feed empty, using fallback content");
        return featured_fallback(Utc::now(), &featured.category);
    }

    for item in &mut items {
        item.category = featured.category.clone();
    }
    info!(source = %source.label, count = items.len(), "featured feed fetched");
    items
}

async fn collect_source(
    fetcher: &Fetcher,
    parsers: &ParserChain,
    source: &SourceDescriptor,
    limit: usize,
) -> SourceOutcome {
    let (items, error) = match fetcher.try_fetch(&source.url).await {
        Ok(body) => {
            let items = parse_body(parsers, source, &body, Utc::now(), limit);
            if items.is_empty() {
                warn!(source = %source.label, url = %source.url, "no records recognised");
                (items, Some("no records recognised".to_string()))
            } else {
                info!(source = %source.label, count = items.len(), "source fetched");
                (items, None)
            }
        }
        Err(e) => {
            warn!(source = %source.label, url = %source.url, error = %e, "source failed");
            (Vec::new(), Some(e.to_string()))
        }
    };

    SourceOutcome {
        report: SourceReport {
            source: source.label.clone(),
            url: source.url.clone(),
            items: items.len(),
            error,
        },
        items,
    }
}

fn parse_body(
    parsers: &ParserChain,
    source: &SourceDescriptor,
    body: &str,
    fetched_at: DateTime<Utc>,
    limit: usize,
) -> Vec<ContentItem> {
    let ctx = ParseContext {
        source: &source.label,
        language: &source.language,
        fetched_at,
    };
    let mut items = parsers.parse(body, &ctx);
    items.truncate(limit);
    items
}
