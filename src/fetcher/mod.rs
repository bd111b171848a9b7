//! JSON fetching

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub mod client;
pub mod http;
pub mod retry;

/// Fetch errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Retry ceiling reached without a decodable JSON body
    #[error("couldn't get json from {url} after {attempts} attempts (last status: {})", display_status(.status))]
    Exhausted {
        /// Last HTTP status observed, if any response arrived at all
        status: Option<u16>,
        /// URL that kept failing
        url: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// Decoded payload lacks a field the caller needs
    #[error("response from {url} has no usable `{field}` field")]
    MissingField {
        /// URL the payload came from
        url: String,
        /// Name of the missing field
        field: String,
    },

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),

    /// In-flight request limiter was closed
    #[error("request limiter error: {0}")]
    Limiter(String),
}

impl FetchError {
    /// Shorthand for [`FetchError::MissingField`]
    pub fn missing_field(url: impl Into<String>, field: impl Into<String>) -> Self {
        FetchError::MissingField {
            url: url.into(),
            field: field.into(),
        }
    }

    /// Last HTTP status recorded for an exhausted fetch
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Exhausted { status, .. } => *status,
            _ => None,
        }
    }
}

fn display_status(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".to_string())
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Anything that can turn a URL into a decoded JSON document
///
/// Implementations must be safe to call concurrently from many futures.
#[async_trait]
pub trait JsonSource: Send + Sync {
    /// Fetch `url` and decode its body as JSON
    async fn get_json(&self, url: &str) -> FetchResult<Value>;
}

#[async_trait]
impl<S: JsonSource + ?Sized> JsonSource for Arc<S> {
    async fn get_json(&self, url: &str) -> FetchResult<Value> {
        (**self).get_json(url).await
    }
}
