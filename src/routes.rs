use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL,
        },
        HeaderName, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::aggregator::{featured_items, Aggregator};
use crate::cache::{CacheStatus, SnapshotCache};
use crate::config::{Config, FeaturedConfig, DEFAULT_FEATURED_CATEGORY};
use crate::fallback::{fallback_items, featured_fallback};
use crate::fetcher::{FetchError, Fetcher};
use crate::model::{AggregationSnapshot, SnapshotOrigin, SourceReport};

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

pub struct AppState {
    pub cache: Arc<SnapshotCache>,
    pub aggregator: Arc<Aggregator>,
    pub fetcher: Arc<Fetcher>,
    pub featured: Option<FeaturedConfig>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let fetcher = Arc::new(Fetcher::new(config.fetch_timeout())?);
        let aggregator = Aggregator::new(Arc::clone(&fetcher), config.sources())
            .with_max_sources(config.max_sources)
            .with_per_source_limit(config.per_source_limit);

        Ok(Self {
            cache: Arc::new(SnapshotCache::new(config.cache_ttl())),
            aggregator: Arc::new(aggregator),
            fetcher,
            featured: config.featured_feed().cloned(),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/news", get(news).options(preflight))
        .route("/api/news/status", get(news_status).options(preflight))
        .route("/api/featured-news", get(featured_news).options(preflight))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Headers carried by every news response: open to any origin, never cached
/// by the browser or intermediaries.
fn news_headers() -> [(HeaderName, &'static str); 4] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
        (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        (CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    ]
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    #[serde(default)]
    pub source: Option<String>,
}

pub async fn news(
    State(state): State<Arc<AppState>>,
    query: Option<Query<NewsQuery>>,
) -> Response {
    if let Some(source) = query.and_then(|Query(q)| q.source) {
        debug!(source, "source filter requested, returning all sources");
    }

    let (snapshot, status) = load_snapshot(&state).await;
    (
        StatusCode::OK,
        news_headers(),
        [(X_CACHE, status.as_str())],
        Json(snapshot.items()),
    )
        .into_response()
}

/// Read through the cache on a separate task so a panic anywhere in the
/// aggregation still ends in fallback content.
async fn load_snapshot(state: &Arc<AppState>) -> (Arc<AggregationSnapshot>, CacheStatus) {
    let task_state = Arc::clone(state);
    let handle = tokio::spawn(async move {
        let aggregator = Arc::clone(&task_state.aggregator);
        task_state
            .cache
            .get_or_refresh(|| async move { aggregator.run().await })
            .await
    });

    match handle.await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "aggregation task failed, serving fallback content");
            let now = Utc::now();
            let snapshot =
                AggregationSnapshot::new(fallback_items(now), now, SnapshotOrigin::Fallback, Vec::new());
            (Arc::new(snapshot), CacheStatus::Miss)
        }
    }
}

pub async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, news_headers())
}

#[derive(Debug, Serialize)]
pub struct NewsStatus {
    pub cached: bool,
    pub fresh: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub age_secs: Option<u64>,
    pub ttl_secs: u64,
    pub items: usize,
    pub origin: Option<SnapshotOrigin>,
    pub sources: Vec<SourceReport>,
}

pub async fn news_status(State(state): State<Arc<AppState>>) -> Response {
    let ttl = state.cache.ttl();
    let status = match state.cache.peek().await {
        Some((snapshot, age)) => NewsStatus {
            cached: true,
            fresh: age < ttl,
            created_at: Some(snapshot.created_at()),
            age_secs: Some(age.as_secs()),
            ttl_secs: ttl.as_secs(),
            items: snapshot.items().len(),
            origin: Some(snapshot.origin()),
            sources: snapshot.reports().to_vec(),
        },
        None => NewsStatus {
            cached: false,
            fresh: false,
            created_at: None,
            age_secs: None,
            ttl_secs: ttl.as_secs(),
            items: 0,
            origin: None,
            sources: Vec::new(),
        },
    };

    (StatusCode::OK, news_headers(), Json(status)).into_response()
}

pub async fn featured_news(State(state): State<Arc<AppState>>) -> Response {
    let items = match &state.featured {
        Some(featured) => featured_items(&state.fetcher, featured).await,
        None => featured_fallback(Utc::now(), DEFAULT_FEATURED_CATEGORY),
    };

    (StatusCode::OK, news_headers(), Json(items)).into_response()
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentItem, SourceDescriptor};
    use axum::{
        body::Body,
        http::{Method, Request},
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS_BODY: &str = r#"<?xml version="1.0"?><rss><channel>
        <item><title>Kochi water metro adds new route</title>
            <link>https://example.com/water-metro</link>
            <pubDate>Mon, 09 Dec 2024 08:00:00 GMT</pubDate></item>
        <item><title>Football league opens in Delhi</title>
            <link>https://example.com/football</link>
            <pubDate>Mon, 09 Dec 2024 09:00:00 GMT</pubDate></item>
    </channel></rss>"#;

    async fn feed_server(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    fn create_test_app(server: &MockServer, featured: Option<FeaturedConfig>) -> Router {
        let feed_url = format!("{}/feed", server.uri());
        let fetcher = Arc::new(Fetcher::new(Duration::from_secs(2)).unwrap());
        let aggregator = Aggregator::new(
            Arc::clone(&fetcher),
            vec![SourceDescriptor::from_url(&feed_url).with_label("Test Wire")],
        );

        router(Arc::new(AppState {
            cache: Arc::new(SnapshotCache::new(Duration::from_secs(600))),
            aggregator: Arc::new(aggregator),
            fetcher,
            featured,
        }))
    }

    async fn get(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    async fn items_of(response: Response) -> Vec<ContentItem> {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn assert_news_headers(response: &Response) {
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");
        assert_eq!(headers["cache-control"], "no-cache, no-store, must-revalidate");
    }

    mod health_tests {
        use super::*;

        #[tokio::test]
        async fn test_health_endpoint() {
            let server = MockServer::start().await;
            let app = create_test_app(&server, None);

            let response = get(&app, "/health").await;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(&body_bytes(response).await[..], b"OK");
        }
    }

    mod news_tests {
        use super::*;

        #[tokio::test]
        async fn test_news_returns_ranked_items() {
            let server = feed_server(ResponseTemplate::new(200).set_body_string(RSS_BODY)).await;
            let app = create_test_app(&server, None);

            let response = get(&app, "/api/news").await;

            assert_eq!(response.status(), StatusCode::OK);
            assert_news_headers(&response);
            assert_eq!(response.headers()["x-cache"], "MISS");

            let items = items_of(response).await;
            let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
            assert_eq!(
                titles,
                vec!["Football league opens in Delhi", "Kochi water metro adds new route"]
            );
            assert!(items.iter().all(|i| i.source == "Test Wire"));
        }

        #[tokio::test]
        async fn test_news_json_fields() {
            let server = feed_server(ResponseTemplate::new(200).set_body_string(RSS_BODY)).await;
            let app = create_test_app(&server, None);

            let body = body_bytes(get(&app, "/api/news").await).await;
            let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
            let first = &value.as_array().unwrap()[0];

            for field in [
                "id", "title", "date", "excerpt", "category", "url", "source", "language",
                "content",
            ] {
                assert!(first.get(field).is_some(), "missing field {}", field);
            }
        }

        #[tokio::test]
        async fn test_second_read_is_cache_hit() {
            let server = feed_server(ResponseTemplate::new(200).set_body_string(RSS_BODY)).await;
            let app = create_test_app(&server, None);

            let first = get(&app, "/api/news").await;
            let second = get(&app, "/api/news").await;

            assert_eq!(second.headers()["x-cache"], "HIT");
            let first_ids: Vec<_> = items_of(first).await.into_iter().map(|i| i.id).collect();
            let second_ids: Vec<_> = items_of(second).await.into_iter().map(|i| i.id).collect();
            assert_eq!(first_ids, second_ids);
            assert_eq!(server.received_requests().await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_failing_sources_serve_fallback() {
            let server = feed_server(ResponseTemplate::new(500)).await;
            let app = create_test_app(&server, None);

            let response = get(&app, "/api/news").await;

            assert_eq!(response.status(), StatusCode::OK);
            assert_news_headers(&response);
            let ids: Vec<_> = items_of(response).await.into_iter().map(|i| i.id).collect();
            assert_eq!(ids, vec!["fallback-1", "fallback-2"]);
        }

        #[tokio::test]
        async fn test_source_param_is_not_applied() {
            let server = feed_server(ResponseTemplate::new(200).set_body_string(RSS_BODY)).await;
            let app = create_test_app(&server, None);

            let response = get(&app, "/api/news?source=BBC%20News").await;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(items_of(response).await.len(), 2);
        }

        #[tokio::test]
        async fn test_options_preflight() {
            let server = MockServer::start().await;
            let app = create_test_app(&server, None);

            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(Method::OPTIONS)
                        .uri("/api/news")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_news_headers(&response);
            assert!(body_bytes(response).await.is_empty());
            assert!(server.received_requests().await.unwrap().is_empty());
        }
    }

    mod status_tests {
        use super::*;

        #[tokio::test]
        async fn test_status_before_first_read() {
            let server = MockServer::start().await;
            let app = create_test_app(&server, None);

            let body = body_bytes(get(&app, "/api/news/status").await).await;
            let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

            assert_eq!(value["cached"], false);
            assert_eq!(value["ttl_secs"], 600);
            assert_eq!(value["items"], 0);
        }

        #[tokio::test]
        async fn test_status_after_read() {
            let server = feed_server(ResponseTemplate::new(200).set_body_string(RSS_BODY)).await;
            let app = create_test_app(&server, None);

            get(&app, "/api/news").await;
            let response = get(&app, "/api/news/status").await;
            assert_news_headers(&response);

            let value: serde_json::Value =
                serde_json::from_slice(&body_bytes(response).await).unwrap();
            assert_eq!(value["cached"], true);
            assert_eq!(value["fresh"], true);
            assert_eq!(value["items"], 2);
            assert_eq!(value["origin"], "live");
            assert_eq!(value["sources"][0]["source"], "Test Wire");
            assert_eq!(value["sources"][0]["items"], 2);
        }
    }

    mod featured_tests {
        use super::*;

        fn featured(server: &MockServer) -> FeaturedConfig {
            FeaturedConfig {
                url: format!("{}/feed", server.uri()),
                name: None,
                category: "Kochi Local".to_string(),
                enabled: true,
            }
        }

        #[tokio::test]
        async fn test_featured_items_use_category() {
            let server = feed_server(ResponseTemplate::new(200).set_body_string(RSS_BODY)).await;
            let app = create_test_app(&server, Some(featured(&server)));

            let response = get(&app, "/api/featured-news").await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_news_headers(&response);

            let items = items_of(response).await;
            assert_eq!(items.len(), 2);
            assert!(items.iter().all(|i| i.category == "Kochi Local"));
        }

        #[tokio::test]
        async fn test_featured_is_not_cached() {
            let server = feed_server(ResponseTemplate::new(200).set_body_string(RSS_BODY)).await;
            let app = create_test_app(&server, Some(featured(&server)));

            get(&app, "/api/featured-news").await;
            get(&app, "/api/featured-news").await;

            assert_eq!(server.received_requests().await.unwrap().len(), 2);
        }

        #[tokio::test]
        async fn test_featured_failure_serves_fallback() {
            let server = feed_server(ResponseTemplate::new(404)).await;
            let app = create_test_app(&server, Some(featured(&server)));

            let response = get(&app, "/api/featured-news").await;
            assert_eq!(response.status(), StatusCode::OK);

            let items = items_of(response).await;
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].id, "featured-fallback-1");
        }

        #[tokio::test]
        async fn test_featured_disabled_in_config_serves_fallback() {
            let server = feed_server(ResponseTemplate::new(200).set_body_string(RSS_BODY)).await;
            let content = format!(
                "feeds = []\n[featured]\nurl = \"{}/feed\"\nenabled = false\n",
                server.uri()
            );
            let config = Config::from_str(&content).unwrap();
            let app = router(Arc::new(AppState::from_config(&config).unwrap()));

            let items = items_of(get(&app, "/api/featured-news").await).await;

            assert_eq!(items.len(), 1);
            assert_eq!(items[0].id, "featured-fallback-1");
            assert!(server.received_requests().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_featured_unconfigured_serves_fallback() {
            let server = MockServer::start().await;
            let app = create_test_app(&server, None);

            let items = items_of(get(&app, "/api/featured-news").await).await;
            assert_eq!(items[0].category, DEFAULT_FEATURED_CATEGORY);
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_news_query_default() {
            let query: NewsQuery = serde_urlencoded::from_str("").unwrap();
            assert!(query.source.is_none());
        }

        #[test]
        fn test_news_query_with_source() {
            let query: NewsQuery = serde_urlencoded::from_str("source=Onmanorama").unwrap();
            assert_eq!(query.source.as_deref(), Some("Onmanorama"));
        }

        #[test]
        fn test_news_query_ignores_unknown_params() {
            let query: NewsQuery = serde_urlencoded::from_str("page=2&source=BBC").unwrap();
            assert_eq!(query.source.as_deref(), Some("BBC"));
        }
    }
}
