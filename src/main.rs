//! Newsfeed ranker — Binary Entrypoint
//! Loads the feed config, builds the aggregator and serves the HTTP surface.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsfeed_ranker::config::EngineConfig;
use newsfeed_ranker::metrics::PrometheusMetrics;
use newsfeed_ranker::{api, FeedAggregator, ReqwestTransport};

/// Structured logs: compact by default, JSON with FEEDS_LOG_JSON=1.
/// `RUST_LOG` overrides the default filter.
fn enable_tracing() {
    let json = std::env::var("FEEDS_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("newsfeed_ranker=info,warn"));

    // The runtime may already have installed a subscriber; keep it then.
    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_tracing();

    // Recorder first, so metric descriptions land in it.
    let prometheus = match PrometheusMetrics::install() {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::warn!(error = ?e, "prometheus exporter disabled");
            None
        }
    };

    let config = EngineConfig::from_toml().context("loading feeds config")?;
    let transport = ReqwestTransport::new(&config.fetch).context("building HTTP client")?;
    let aggregator = Arc::new(
        FeedAggregator::new(config, Arc::new(transport)).context("building feed aggregator")?,
    );

    // Release the HTTP client and cached payloads on ctrl-c.
    aggregator.close_on(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    });

    let router = api::router(Arc::clone(&aggregator), prometheus.as_ref());

    Ok(router.into())
}
