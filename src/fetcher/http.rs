//! Retrying JSON client over reqwest
//!
//! Every failure to obtain a decodable JSON body is retried the same way,
//! whatever the HTTP status: a 404 that carries a JSON body is a success here,
//! a 200 with an HTML body is a failure.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::fetcher::client::HttpSettings;
use crate::fetcher::retry::{FailureKind, RetryContext, RetryPolicy};
use crate::fetcher::{FetchError, FetchResult, JsonSource};
use crate::metrics::{record_fetch_failure, record_retry_backoff, HttpRequestMetrics};

enum AttemptOutcome {
    Decoded(Value),
    Failed(FailureKind),
}

/// JSON client with bounded retry and an optional in-flight cap
#[derive(Clone)]
pub struct HttpJsonClient {
    client: Client,
    policy: RetryPolicy,
    max_in_flight: Option<usize>,
    limiter: Option<Arc<Semaphore>>,
}

impl HttpJsonClient {
    /// Create a client without an in-flight cap
    ///
    /// # Arguments
    /// * `client` - Pooled reqwest client (cheap to clone, shares connections)
    /// * `policy` - Attempt ceiling and delay schedule
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            max_in_flight: None,
            limiter: None,
        }
    }

    /// Create a client honouring the in-flight cap from `settings`
    pub fn from_settings(client: Client, policy: RetryPolicy, settings: &HttpSettings) -> Self {
        Self::new(client, policy).with_max_in_flight(settings.max_in_flight)
    }

    /// Limit how many requests may be in flight at once across all callers
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight.filter(|n| *n > 0);
        self.limiter = self.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    /// Retry policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Configured in-flight cap, if any
    pub fn max_in_flight(&self) -> Option<usize> {
        self.max_in_flight
    }

    async fn attempt(&self, url: &str, attempt: u32) -> FetchResult<AttemptOutcome> {
        // Held for the request only, released before any backoff sleep
        let _permit = match &self.limiter {
            Some(limiter) => Some(
                limiter
                    .acquire()
                    .await
                    .map_err(|e| FetchError::Limiter(e.to_string()))?,
            ),
            None => None,
        };

        let request_metrics = HttpRequestMetrics::start(url, attempt);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %url, attempt, error = %e, "Request failed before a response arrived");
                request_metrics.record_network_error();
                return Ok(AttemptOutcome::Failed(FailureKind::Transport));
            }
        };

        let status = response.status().as_u16();
        request_metrics.record_complete(status);

        match response.json::<Value>().await {
            Ok(value) => Ok(AttemptOutcome::Decoded(value)),
            Err(e) => {
                debug!(url = %url, attempt, status, error = %e, "Response body is not JSON");
                Ok(AttemptOutcome::Failed(FailureKind::Undecodable(status)))
            }
        }
    }
}

#[async_trait]
impl JsonSource for HttpJsonClient {
    async fn get_json(&self, url: &str) -> FetchResult<Value> {
        let max_attempts = self.policy.max_attempts();
        let mut last_status = None;

        for attempt in 1..=max_attempts {
            let failure = match self.attempt(url, attempt).await? {
                AttemptOutcome::Decoded(value) => {
                    if attempt > 1 {
                        debug!(url = %url, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                AttemptOutcome::Failed(failure) => failure,
            };

            if let Some(status) = failure.status() {
                last_status = Some(status);
            }

            let ctx = RetryContext::new(&self.policy, attempt, failure, url);
            if !self.policy.should_retry(attempt) {
                error!("{}", ctx.format_failure());
                break;
            }

            warn!(url = %url, attempt, max_attempts, "{}", ctx.format_retry());
            record_retry_backoff(ctx.backoff_duration, attempt);
            tokio::time::sleep(ctx.backoff_duration).await;
        }

        record_fetch_failure();
        Err(FetchError::Exhausted {
            status: last_status,
            url: url.to_string(),
            attempts: max_attempts,
        })
    }
}
