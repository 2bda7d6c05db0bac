//! News Aggregator - a concurrent multi-source feed aggregation service
//!
//! This crate fetches RSS and Atom feeds from a fixed set of sources in
//! parallel, parses them with a chain of increasingly lenient strategies,
//! and serves a deduplicated, date-ranked snapshot over a small JSON API.

pub mod aggregator;
pub mod cache;
pub mod categorize;
pub mod config;
pub mod fallback;
pub mod fetcher;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod rank;
pub mod routes;
