// src/error.rs
//! Error types shared across the engine.
//!
//! Only [`ConfigError`] ever leaves `FeedAggregator::search`. Fetch and
//! transport failures are absorbed per source and surface through metrics.

use thiserror::Error;

/// Configuration / caller-input problems. The only error class `search` returns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no feed sources configured")]
    NoSources,

    #[error("duplicate source id: {0}")]
    DuplicateSourceId(String),

    #[error("source `{id}` is invalid: {reason}")]
    InvalidSource { id: String, reason: String },

    #[error("invalid keyword list: {0}")]
    InvalidKeywords(String),

    #[error("max_results must be at least 1")]
    InvalidMaxResults,

    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("aggregator is closed")]
    Closed,
}

/// Low-level transport failure reported by a [`crate::ingest::FeedTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport closed")]
    Closed,

    #[error("request failed: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether another attempt might succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, TransportError::Closed)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Outcome of a failed feed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("redirect from {url} has no usable Location header")]
    BadRedirect { url: String },

    #[error("too many redirects starting at {url}")]
    TooManyRedirects { url: String },

    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// 429, 5xx and transient transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(t) => t.is_transient(),
            FetchError::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}
