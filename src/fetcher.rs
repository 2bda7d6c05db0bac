use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml";

/// Opening tokens that at least one supported feed family starts with.
const FEED_MARKERS: &[&str] = &["<rss", "<feed", "<?xml"];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("response is not an RSS or Atom document")]
    NotAFeed,
}

/// Retrieves raw feed documents, one bounded request at a time.
pub struct Fetcher {
    client: Client,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `url` and return its body if it looks like a feed.
    ///
    /// The whole exchange, body included, runs under the deadline. When it
    /// expires the request future is dropped, which aborts the connection.
    pub async fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "fetching feed");
        match tokio::time::timeout(self.timeout, self.request(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }

    /// Like [`Fetcher::try_fetch`] but logs the failure and yields an empty body.
    pub async fn fetch(&self, url: &str) -> String {
        match self.try_fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url, error = %e, "feed fetch failed");
                String::new()
            }
        }
    }

    async fn request(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        if !looks_like_feed(&body) {
            return Err(FetchError::NotAFeed);
        }

        Ok(body)
    }
}

/// Cheap shape check before handing a body to the parsers.
pub fn looks_like_feed(body: &str) -> bool {
    FEED_MARKERS.iter().any(|marker| body.contains(marker))
}
