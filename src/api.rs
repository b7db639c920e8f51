use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregator::{FeedAggregator, ScoredArticle};
use crate::error::ConfigError;
use crate::health::HealthReport;
use crate::metrics::{MetricsSnapshot, PrometheusMetrics};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<FeedAggregator>,
}

/// Build the HTTP surface. `/metrics/prometheus` is mounted only when a
/// recorder was installed.
pub fn router(aggregator: Arc<FeedAggregator>, prometheus: Option<&PrometheusMetrics>) -> Router {
    let state = AppState { aggregator };

    let mut app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/health/feeds", get(health_feeds))
        .route("/metrics", get(metrics_json))
        .route("/search", get(search))
        .route("/keywords", post(keywords))
        .with_state(state);

    if let Some(p) = prometheus {
        app = app.merge(p.router());
    }
    app.layer(CorsLayer::very_permissive())
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(ConfigError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ConfigError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct SearchParams {
    /// Comma-separated; absent or empty means "use each source's static keywords".
    #[serde(default)]
    keywords: Option<String>,
    #[serde(default)]
    max_results: Option<usize>,
}

async fn search(
    State(state): State<AppState>,
    Query(q): Query<SearchParams>,
) -> Result<Json<Vec<ScoredArticle>>, ApiError> {
    let keywords: Vec<&str> = q
        .keywords
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.split(',').collect())
        .unwrap_or_default();
    let max_results = q
        .max_results
        .unwrap_or(state.aggregator.search_settings().default_max_results);

    state
        .aggregator
        .search(keywords.as_slice(), max_results)
        .await
        .map(Json)
        .map_err(ApiError)
}

#[derive(Deserialize)]
struct KeywordsReq {
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct KeywordsResp {
    keywords: Vec<String>,
}

async fn keywords(State(state): State<AppState>, Json(body): Json<KeywordsReq>) -> Json<KeywordsResp> {
    Json(KeywordsResp {
        keywords: state.aggregator.extract_keywords(&body.title, &body.content),
    })
}

async fn health_feeds(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.aggregator.health_check().await)
}

async fn metrics_json(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.aggregator.metrics())
}
