//! Retry policy and retry message formatting.
//!
//! The delay between attempts is a pure function of the attempt number so the
//! fetch loop and the schedule can be tested separately.

use reqwest::StatusCode;
use std::time::Duration;

use crate::harvester::config::{MAX_ATTEMPTS, MAX_BACKOFF_MS, RETRY_DELAY_MS};

/// How long to wait between two attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failed attempt
    Fixed(Duration),
    /// `initial * 2^(attempt-1)`, capped at `max`
    Exponential {
        /// Delay after the first failed attempt
        initial: Duration,
        /// Upper bound for any single delay
        max: Duration,
    },
}

/// Bounded retry schedule for a single logical fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Policy with an explicit attempt ceiling and backoff. A ceiling of zero is raised to one.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Fixed delay between attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, Backoff::Fixed(delay))
    }

    /// Exponential delay starting at `initial`, capped at `MAX_BACKOFF_MS`
    pub fn exponential(max_attempts: u32, initial: Duration) -> Self {
        Self::new(
            max_attempts,
            Backoff::Exponential {
                initial,
                max: Duration::from_millis(MAX_BACKOFF_MS),
            },
        )
    }

    /// Total number of attempts, including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Configured backoff strategy
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { initial, max } => {
                let exponent = attempt.saturating_sub(1).min(31);
                initial
                    .checked_mul(2u32.saturating_pow(exponent))
                    .unwrap_or(max)
                    .min(max)
            }
        }
    }

    /// Whether another attempt is allowed after attempt number `attempt`
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    /// Five attempts, one second apart
    fn default() -> Self {
        Self::fixed(MAX_ATTEMPTS, Duration::from_millis(RETRY_DELAY_MS))
    }
}

/// Why an attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response at all (DNS, refused connection, timeout)
    Transport,
    /// A response arrived but its body was not JSON
    Undecodable(u16),
}

impl FailureKind {
    /// Short description used inside log messages
    pub fn description(&self) -> String {
        match self {
            Self::Transport => "connection failed".to_string(),
            Self::Undecodable(status) => match StatusCode::from_u16(*status) {
                Ok(code) if code.is_server_error() => format!("server error {status}"),
                Ok(code) if code == StatusCode::TOO_MANY_REQUESTS => {
                    "rate limit exceeded".to_string()
                }
                _ => format!("undecodable body (status {status})"),
            },
        }
    }

    /// Status code carried by the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport => None,
            Self::Undecodable(status) => Some(*status),
        }
    }
}

/// Context for formatting retry messages
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// What went wrong on this attempt
    pub failure: FailureKind,
    /// Wait before the next attempt
    pub backoff_duration: Duration,
    /// URL being fetched
    pub url: String,
}

impl RetryContext {
    /// Build a context for attempt `attempt` of `policy`
    pub fn new(policy: &RetryPolicy, attempt: u32, failure: FailureKind, url: impl Into<String>) -> Self {
        Self {
            attempt,
            max_attempts: policy.max_attempts(),
            failure,
            backoff_duration: policy.delay_for(attempt),
            url: url.into(),
        }
    }

    /// "Trying to get json from ... - attempt x/y" style message
    pub fn format_retry(&self) -> String {
        format!(
            "Trying to get json from {} - attempt {}/{} failed ({}), waiting {:.1} seconds...",
            self.url,
            self.attempt,
            self.max_attempts,
            self.failure.description(),
            self.backoff_duration.as_secs_f64()
        )
    }

    /// Final failure summary once the ceiling is reached
    pub fn format_failure(&self) -> String {
        let status = self
            .failure
            .status()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        [
            format!("[FAILED] Couldn't get json after {} attempts", self.max_attempts),
            format!("  URL: {}", self.url),
            format!("  Last status: {status}"),
            format!("  Last error: {}", self.failure.description()),
        ]
        .join("\n")
    }
}
