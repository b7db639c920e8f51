// src/ingest/transport.rs
//! Network seam for the fetcher.
//!
//! The fetcher never talks to `reqwest` directly; it sees one GET that
//! returns status, `Location` and body. Redirects are turned off at the
//! client so 3xx responses reach the fetcher untouched.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::redirect::Policy;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::config::FetchSettings;
use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            location: None,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            location: None,
            body: String::new(),
        }
    }

    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self {
            status,
            location: Some(location.into()),
            body: String::new(),
        }
    }
}

#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Single GET, no redirect handling.
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, TransportError>;

    /// Release connections. Later calls to `get` fail with `TransportError::Closed`.
    async fn close(&self) {}
}

/// `reqwest`-backed transport used by the binary.
pub struct ReqwestTransport {
    client: RwLock<Option<reqwest::Client>>,
}

impl ReqwestTransport {
    pub fn new(settings: &FetchSettings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .redirect(Policy::none())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self {
            client: RwLock::new(Some(client)),
        })
    }

    fn client(&self) -> Option<reqwest::Client> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn header_map(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (k, v) in headers {
        match (
            HeaderName::from_bytes(k.as_bytes()),
            HeaderValue::from_str(v),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::debug!(target: "ingest", header = %k, "skipping invalid header"),
        }
    }
    map
}

#[async_trait]
impl FeedTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        let client = self.client().ok_or(TransportError::Closed)?;
        let resp = client.get(url).headers(header_map(headers)).send().await?;

        let status = resp.status().as_u16();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = if resp.status().is_success() {
            resp.text().await?
        } else {
            String::new()
        };

        Ok(TransportResponse {
            status,
            location,
            body,
        })
    }

    async fn close(&self) {
        self.client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
