//! Provider error taxonomy and bounded retry with exponential backoff.
//!
//! Every call to an external service (completions, embeddings, the vector
//! index) goes through [`with_retry`]. Transient failures (rate limits, 5xx,
//! network errors) are retried; everything else fails immediately.

use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;

/// Error from a call to an external provider.
#[derive(Debug)]
pub struct ProviderError {
    /// The kind of error
    pub kind: ProviderErrorKind,
    /// HTTP status code, if applicable
    pub status_code: Option<u16>,
    /// Error message
    pub message: String,
    /// Delay requested by the provider via `Retry-After`
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn rate_limited(message: String, retry_after: Option<Duration>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            status_code: Some(429),
            message,
            retry_after,
        }
    }

    pub fn server_error(status_code: u16, message: String) -> Self {
        Self {
            kind: ProviderErrorKind::ServerError,
            status_code: Some(status_code),
            message,
            retry_after: None,
        }
    }

    pub fn client_error(status_code: u16, message: String) -> Self {
        Self {
            kind: ProviderErrorKind::ClientError,
            status_code: Some(status_code),
            message,
            retry_after: None,
        }
    }

    pub fn network_error(message: String) -> Self {
        Self {
            kind: ProviderErrorKind::NetworkError,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    pub fn parse_error(message: String) -> Self {
        Self {
            kind: ProviderErrorKind::ParseError,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    /// Build an error from a non-success HTTP response.
    pub fn from_status(status: u16, body: String, retry_after: Option<Duration>) -> Self {
        match classify_http_status(status) {
            ProviderErrorKind::RateLimited => Self::rate_limited(body, retry_after),
            ProviderErrorKind::ClientError => Self::client_error(status, body),
            _ => Self::server_error(status, body),
        }
    }

    /// Map a transport-level reqwest failure.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::network_error(format!("Request timeout: {}", error))
        } else if error.is_connect() {
            Self::network_error(format!("Connection failed: {}", error))
        } else {
            Self::network_error(format!("Request failed: {}", error))
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Delay before the next attempt.
    ///
    /// Honors `retry_after` when the provider sent one, otherwise backs off
    /// exponentially from a per-kind base with up to 25% jitter, capped at 60s.
    pub fn suggested_delay(&self, attempt: u32) -> Duration {
        if let Some(retry_after) = self.retry_after {
            return retry_after;
        }

        let base_secs: u64 = match self.kind {
            ProviderErrorKind::RateLimited => 5,
            ProviderErrorKind::ServerError => 2,
            _ => 1,
        };

        let delay_secs = base_secs.saturating_mul(2u64.saturating_pow(attempt));
        let jitter_range = delay_secs / 4;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..=jitter_range)
        } else {
            0
        };

        Duration::from_secs(delay_secs.saturating_add(jitter).min(60))
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Classification of provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// 429
    RateLimited,
    /// 5xx
    ServerError,
    /// 4xx other than 429; retrying will not help
    ClientError,
    /// Connection refused, reset or timed out
    NetworkError,
    /// The provider answered but the body was not what we expected
    ParseError,
}

impl ProviderErrorKind {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError | Self::NetworkError
        )
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "Rate limited"),
            Self::ServerError => write!(f, "Server error"),
            Self::ClientError => write!(f, "Client error"),
            Self::NetworkError => write!(f, "Network error"),
            Self::ParseError => write!(f, "Parse error"),
        }
    }
}

/// Map an HTTP status code onto an error kind.
pub fn classify_http_status(status: u16) -> ProviderErrorKind {
    match status {
        429 => ProviderErrorKind::RateLimited,
        400..=499 => ProviderErrorKind::ClientError,
        _ => ProviderErrorKind::ServerError,
    }
}

/// Parse a `Retry-After` header given in seconds.
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// How hard to try before giving up on a provider call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Upper bound on wall time spent across all attempts
    pub max_retry_duration: Duration,
    pub retry_rate_limits: bool,
    pub retry_server_errors: bool,
    pub retry_network_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_retry_duration: Duration::from_secs(120),
            retry_rate_limits: true,
            retry_server_errors: true,
            retry_network_errors: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn should_retry(&self, error: &ProviderError) -> bool {
        match error.kind {
            ProviderErrorKind::RateLimited => self.retry_rate_limits,
            ProviderErrorKind::ServerError => self.retry_server_errors,
            ProviderErrorKind::NetworkError => self.retry_network_errors,
            ProviderErrorKind::ClientError | ProviderErrorKind::ParseError => false,
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or the policy is exhausted.
///
/// `label` names the call in logs (e.g. `"chat completion"`).
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let start = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let error = match op().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(
                        "{} succeeded after {} retries (total time: {:?})",
                        label,
                        attempt,
                        start.elapsed()
                    );
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !policy.should_retry(&error) || attempt >= policy.max_retries {
            if attempt > 0 {
                tracing::error!(
                    "{} failed after {} retries (total time: {:?}): {}",
                    label,
                    attempt,
                    start.elapsed(),
                    error
                );
            } else {
                tracing::error!("{} failed (non-retryable): {}", label, error);
            }
            return Err(error.into());
        }

        let remaining = policy.max_retry_duration.saturating_sub(start.elapsed());
        let delay = error.suggested_delay(attempt).min(remaining);
        if delay.is_zero() {
            tracing::warn!("{} attempt {} failed, no time remaining: {}", label, attempt + 1, error);
            return Err(error.into());
        }

        tracing::warn!(
            "{} attempt {} failed with {}, retrying in {:?}: {}",
            label,
            attempt + 1,
            error.kind,
            delay,
            error.message
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
