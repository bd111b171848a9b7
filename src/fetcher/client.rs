//! HTTP client construction
//!
//! A single pooled [`reqwest::Client`] is built once at bootstrap and handed to
//! every component that needs it. Cloning the client is cheap and shares the
//! connection pool.

use reqwest::Client;
use std::time::Duration;

use crate::fetcher::{FetchError, FetchResult};
use crate::harvester::config::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS};

/// Transport settings for the shared client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Time allowed to establish a TCP connection
    pub connect_timeout: Duration,
    /// Time allowed for the whole request
    pub request_timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
    /// Optional cap on requests in flight across the whole run
    pub max_in_flight: Option<usize>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            max_in_flight: None,
        }
    }
}

impl HttpSettings {
    /// Cap the number of concurrent requests
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight.filter(|n| *n > 0);
        self
    }
}

/// Build the pooled client used by every fetch in a run
pub fn build_http_client(settings: &HttpSettings) -> FetchResult<Client> {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .user_agent(settings.user_agent.as_str())
        .build()
        .map_err(|e| {
            FetchError::Client(format!(
                "failed to build HTTP client: {e}. Check system TLS configuration."
            ))
        })
}
