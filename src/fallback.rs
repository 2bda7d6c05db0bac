//! Canned content served when no live feed produced anything.

use chrono::{DateTime, Duration, Utc};

use crate::model::{ContentItem, DEFAULT_LANGUAGE};

const PLACEHOLDER_URL: &str = "#";

/// The fixed fallback set. Only the timestamps depend on `now`, so the
/// newest-first order is the same on every call.
pub fn fallback_items(now: DateTime<Utc>) -> Vec<ContentItem> {
    vec![
        ContentItem {
            id: "fallback-1".to_string(),
            title: "Kochi Metro Extension to Kakkanad Approved by State Government".to_string(),
            date: now,
            excerpt: "The long-awaited Metro expansion will connect the IT hub of Kakkanad with \
                      the city center, reducing travel time significantly."
                .to_string(),
            category: "Kochi Local".to_string(),
            url: PLACEHOLDER_URL.to_string(),
            source: "Smart City News".to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            content: "The project, spanning 11 km and 11 stations, is expected to reduce \
                      congestion and improve connectivity for thousands of tech professionals. \
                      The extension will pass through major residential and commercial areas, \
                      providing a much-needed public transport solution for the growing \
                      population."
                .to_string(),
        },
        ContentItem {
            id: "fallback-2".to_string(),
            title: "Smart City Kochi Launches Urban Command Center".to_string(),
            date: now - Duration::hours(2),
            excerpt: "A step toward making Kochi one of India's most digitally managed cities \
                      with real-time monitoring of urban services."
                .to_string(),
            category: "Kochi Local".to_string(),
            url: PLACEHOLDER_URL.to_string(),
            source: "Smart City Mission".to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            content: "The integrated control center will monitor traffic, utilities, and \
                      emergency services, marking a major leap in Kochi's smart city \
                      transformation. The facility uses AI and IoT sensors to optimize urban \
                      management."
                .to_string(),
        },
    ]
}

/// Single-item fallback for the featured-source endpoint.
pub fn featured_fallback(now: DateTime<Utc>, category: &str) -> Vec<ContentItem> {
    vec![ContentItem {
        id: "featured-fallback-1".to_string(),
        title: "Kochi witnesses record tourist inflow during Diwali week".to_string(),
        date: now,
        excerpt: "Tourism officials report a surge in domestic and international visitors \
                  exploring Kochi's heritage and backwaters."
            .to_string(),
        category: category.to_string(),
        url: PLACEHOLDER_URL.to_string(),
        source: "Fallback News".to_string(),
        language: DEFAULT_LANGUAGE.to_string(),
        content: "Kochi's tourism industry experienced a major boost as thousands of travelers \
                  arrived for Diwali festivities, contributing to the local economy."
            .to_string(),
    }]
}
