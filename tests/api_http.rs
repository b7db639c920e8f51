// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET  /health
// - GET  /search (ranking, validation errors, closed aggregator)
// - POST /keywords
// - GET  /metrics
// - GET  /metrics/prometheus
// - GET  /health/feeds

mod common;

use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::json;
use serde_json::Value as Json;
use std::sync::Arc;
use tower::ServiceExt as _; // for `oneshot`

use common::{config, ok, rss, source, ScriptedTransport, FILLER};
use newsfeed_ranker::CredibilityTier::{Low, VeryHigh};
use newsfeed_ranker::metrics::PrometheusMetrics;
use newsfeed_ranker::FeedAggregator;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_aggregator() -> Arc<FeedAggregator> {
    let t = ScriptedTransport::new();
    t.script(
        "https://a.example/rss",
        vec![ok(rss(&[(
            "Markets rally as inflation cools",
            "https://a.example/1",
            FILLER,
        )]))],
    );
    t.script(
        "https://b.example/rss",
        vec![ok(rss(&[(
            "Local sports roundup",
            "https://b.example/1",
            FILLER,
        )]))],
    );
    let agg = FeedAggregator::new(
        config(vec![
            source("a", VeryHigh, &["https://a.example/rss"], &[]),
            source("b", Low, &["https://b.example/rss"], &[]),
        ]),
        t,
    )
    .expect("valid test config");
    Arc::new(agg)
}

fn test_router(agg: Arc<FeedAggregator>) -> Router {
    newsfeed_ranker::router(agg, None)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (status, bytes) = get(test_router(test_aggregator()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "OK");
}

#[tokio::test]
async fn api_search_returns_ranked_articles() {
    let (status, bytes) = get(
        test_router(test_aggregator()),
        "/search?keywords=markets,inflation&max_results=5",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let v: Json = serde_json::from_slice(&bytes).expect("parse search json");
    let arr = v.as_array().expect("array of articles");
    assert_eq!(arr.len(), 1, "sports item must not qualify: {v}");

    let a = &arr[0];
    assert_eq!(a["url"], "https://a.example/1");
    assert_eq!(a["source_id"], "a");
    assert_eq!(a["source_name"], "a news");
    assert_eq!(a["feed_home_url"], "https://home.example/");
    assert!(a["relevance_score"].as_i64().unwrap_or_default() >= 2);
}

#[tokio::test]
async fn api_search_rejects_zero_max_results() {
    let (status, bytes) = get(
        test_router(test_aggregator()),
        "/search?keywords=markets&max_results=0",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let v: Json = serde_json::from_slice(&bytes).expect("error json");
    assert!(v["error"].as_str().is_some_and(|s| s.contains("max_results")));
}

#[tokio::test]
async fn api_search_rejects_blank_keyword_list() {
    let (status, _) = get(test_router(test_aggregator()), "/search?keywords=%20,%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_search_after_close_is_unavailable() {
    let agg = test_aggregator();
    agg.close().await;
    let (status, bytes) = get(test_router(agg), "/search?keywords=markets").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let v: Json = serde_json::from_slice(&bytes).expect("error json");
    assert_eq!(v["error"], "aggregator is closed");
}

#[tokio::test]
async fn api_keywords_extracts_terms() {
    let app = test_router(test_aggregator());
    let payload = json!({
        "title": "Federal Reserve weighs inflation",
        "content": "Growth slowed to 2.5% last quarter."
    });
    let req = Request::builder()
        .method("POST")
        .uri("/keywords")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /keywords");

    let resp = app.oneshot(req).await.expect("oneshot /keywords");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse keywords json");
    let kws: Vec<&str> = v["keywords"]
        .as_array()
        .expect("keywords array")
        .iter()
        .filter_map(|k| k.as_str())
        .collect();
    assert!(kws.contains(&"federal reserve"), "{kws:?}");
    assert!(kws.contains(&"inflation"), "{kws:?}");
    assert!(kws.contains(&"2.5%"), "{kws:?}");
}

#[tokio::test]
async fn api_metrics_reflect_searches() {
    let agg = test_aggregator();
    let app = test_router(Arc::clone(&agg));

    let (status, _) = get(app.clone(), "/search?keywords=markets").await;
    assert_eq!(status, StatusCode::OK);

    let (status, bytes) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&bytes).expect("metrics json");

    // Contract checks for dashboard consumers
    assert_eq!(v["total_requests"], 2);
    assert_eq!(v["successful_requests"], 2);
    assert_eq!(v["failed_requests"], 0);
    assert_eq!(v["cache_misses"], 2);
    assert_eq!(v["cache_size"], 2);
    assert_eq!(v["sources_available"], 2);
    assert!(v.get("feed_success_rates").is_some(), "missing 'feed_success_rates'");
    assert!(v.get("last_updated").is_some(), "missing 'last_updated'");
}

// the only test in this binary that installs the global recorder
#[tokio::test]
async fn api_prometheus_exposes_feed_counters() {
    let prom = PrometheusMetrics::install().expect("install recorder");
    let app = newsfeed_ranker::router(test_aggregator(), Some(&prom));

    let (status, _) = get(app.clone(), "/search?keywords=markets").await;
    assert_eq!(status, StatusCode::OK);

    let (status, bytes) = get(app, "/metrics/prometheus").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).expect("utf8");
    assert!(text.contains("feed_requests_total"), "{text}");
    assert!(text.contains("feed_fetch_success_total"), "{text}");
}

#[tokio::test]
async fn api_health_feeds_reports_sources() {
    let (status, bytes) = get(test_router(test_aggregator()), "/health/feeds").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&bytes).expect("health json");
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["overall_health"], "excellent");
    assert_eq!(v["sources_status"]["a"], "healthy");
    assert_eq!(v["sources_status"]["b"], "healthy");
}

#[tokio::test]
async fn api_unknown_route_is_404() {
    let (status, _) = get(test_router(test_aggregator()), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
