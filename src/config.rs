use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::model::{SourceDescriptor, DEFAULT_LANGUAGE};

/// Feeds aggregated when the configuration doesn't list any.
const DEFAULT_FEEDS: &[&str] = &[
    "https://feeds.bbci.co.uk/news/world/rss.xml",
    "https://rss.cnn.com/rss/edition.rss",
    "https://feeds.reuters.com/reuters/topNews",
    "https://timesofindia.indiatimes.com/rssfeedstopstories.cms",
    "https://www.hindustantimes.com/feeds/rss/latest/rssfeed.xml",
    "https://indianexpress.com/feed/",
    "https://www.onmanorama.com/news/kerala.feed",
    "https://www.mathrubhumi.com/rss/kerala.rss",
    "https://english.mathrubhumi.com/rss/kerala-news.xml",
    "https://www.asianetnews.com/rss/kerala",
];

const DEFAULT_FEATURED_FEED: &str = "https://www.onmanorama.com/news/kerala.feed";
pub const DEFAULT_FEATURED_CATEGORY: &str = "Kochi Local";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// How long an aggregated snapshot is served before recomputation, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Hard deadline for each source fetch, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Only this many feeds from the front of the list are fetched per run
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
    /// Items kept from each source after parsing
    #[serde(default = "default_per_source_limit")]
    pub per_source_limit: usize,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
    #[serde(default = "default_featured")]
    pub featured: Option<FeaturedConfig>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_sources() -> usize {
    8
}

fn default_per_source_limit() -> usize {
    10
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_featured_url() -> String {
    DEFAULT_FEATURED_FEED.to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_featured_category() -> String {
    DEFAULT_FEATURED_CATEGORY.to_string()
}

fn default_feeds() -> Vec<FeedConfig> {
    DEFAULT_FEEDS
        .iter()
        .map(|url| FeedConfig {
            url: url.to_string(),
            name: None,
            language: default_language(),
        })
        .collect()
}

fn default_featured() -> Option<FeaturedConfig> {
    Some(FeaturedConfig {
        url: default_featured_url(),
        name: None,
        category: default_featured_category(),
        enabled: default_enabled(),
    })
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub url: String,
    /// Overrides the label derived from the URL
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

impl FeedConfig {
    pub fn descriptor(&self) -> SourceDescriptor {
        let source = SourceDescriptor::from_url(&self.url).with_language(&self.language);
        match &self.name {
            Some(name) => source.with_label(name),
            None => source,
        }
    }
}

/// The single feed behind the featured-news endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct FeaturedConfig {
    #[serde(default = "default_featured_url")]
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Category stamped on every featured item
    #[serde(default = "default_featured_category")]
    pub category: String,
    /// `enabled = false` turns the endpoint into a fixed fallback response
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl FeaturedConfig {
    pub fn descriptor(&self) -> SourceDescriptor {
        let source = SourceDescriptor::from_url(&self.url);
        match &self.name {
            Some(name) => source.with_label(name),
            None => source,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cache_ttl_secs: default_cache_ttl_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_sources: default_max_sources(),
            per_source_limit: default_per_source_limit(),
            feeds: default_feeds(),
            featured: default_featured(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in defaults.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// The featured feed, unless it is missing or switched off.
    pub fn featured_feed(&self) -> Option<&FeaturedConfig> {
        self.featured.as_ref().filter(|featured| featured.enabled)
    }

    pub fn sources(&self) -> Vec<SourceDescriptor> {
        self.feeds.iter().map(FeedConfig::descriptor).collect()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_sources, 8);
        assert_eq!(config.per_source_limit, 10);
        assert_eq!(config.feeds.len(), DEFAULT_FEEDS.len());
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(config.featured.is_some());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            cache_ttl_secs = 60
            fetch_timeout_secs = 3

            [[feeds]]
            url = "https://feeds.bbci.co.uk/news/world/rss.xml"

            [[feeds]]
            name = "Local Blog"
            url = "https://blog.example.com/feed.xml"
            language = "ml"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.fetch_timeout_secs, 3);
        assert_eq!(config.feeds.len(), 2);

        let sources = config.sources();
        assert_eq!(sources[0].label, "BBC News");
        assert_eq!(sources[0].language, "en");
        assert_eq!(sources[1].label, "Local Blog");
        assert_eq!(sources[1].language, "ml");
    }

    #[test]
    fn test_omitted_fields_use_defaults() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config.cache_ttl_secs, 600);
        assert_eq!(config.fetch_timeout_secs, 10);
        assert_eq!(config.feeds.len(), DEFAULT_FEEDS.len());
        assert_eq!(
            config.featured.unwrap().url,
            "https://www.onmanorama.com/news/kerala.feed"
        );
    }

    #[test]
    fn test_featured_section() {
        let content = r#"
            [featured]
            url = "https://www.mathrubhumi.com/rss/kerala.rss"
        "#;

        let config = Config::from_str(content).unwrap();
        let featured = config.featured.unwrap();

        assert_eq!(featured.category, DEFAULT_FEATURED_CATEGORY);
        assert_eq!(featured.descriptor().label, "Mathrubhumi");
    }

    #[test]
    fn test_featured_can_be_disabled() {
        let content = r#"
            [featured]
            enabled = false
        "#;

        let config = Config::from_str(content).unwrap();

        assert!(config.featured.is_some());
        assert!(config.featured_feed().is_none());
    }

    #[test]
    fn test_featured_enabled_by_default() {
        let config = Config::default();
        let featured = config.featured_feed().unwrap();
        assert!(featured.enabled);
        assert_eq!(featured.url, DEFAULT_FEATURED_FEED);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config.feeds.len(), DEFAULT_FEEDS.len());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_feed_missing_url() {
        let content = r#"
            [[feeds]]
            name = "Test Feed"
        "#;

        let result = Config::from_str(content);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_feeds_list() {
        let config = Config::from_str("feeds = []").unwrap();
        assert!(config.feeds.is_empty());
        assert!(config.sources().is_empty());
    }
}
