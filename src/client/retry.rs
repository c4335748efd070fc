use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::warn;

use super::transport::{HttpRequest, HttpResponse, Transport};
use super::Error;

pub const DEFAULT_MAX_RETRIES: u32 = 4;
pub const DEFAULT_WAIT_MIN: Duration = Duration::from_secs(1);
pub const DEFAULT_WAIT_MAX: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub wait_min: Duration,
    pub wait_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            wait_min: DEFAULT_WAIT_MIN,
            wait_max: DEFAULT_WAIT_MAX,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Whether a response status is worth another attempt
    pub fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS
            || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
    }

    /// Wait before the attempt following `attempt` (0-based)
    ///
    /// `Retry-After` is honored on 429 and 503, otherwise the wait is `wait_min * 2^attempt` capped at `wait_max`.
    pub fn backoff(&self, attempt: u32, response: Option<&HttpResponse>) -> Duration {
        if let Some(response) = response {
            if matches!(
                response.status,
                StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
            ) {
                if let Some(retry_after) = response.retry_after {
                    return retry_after;
                }
            }
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.wait_min
            .checked_mul(factor)
            .map_or(self.wait_max, |wait| wait.min(self.wait_max))
    }
}

/// Transport retrying throttled and failed requests
#[derive(Debug, Clone)]
pub struct RetryTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryTransport<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let mut attempt = 0;
        loop {
            let result = self.inner.execute(request.clone()).await;
            let retryable = match &result {
                Ok(response) => RetryPolicy::is_retryable(response.status),
                Err(Error::Network(_)) => true,
                Err(_) => false,
            };
            if !retryable || attempt >= self.policy.max_retries {
                return result;
            }

            let wait = self.policy.backoff(attempt, result.as_ref().ok());
            match &result {
                Ok(response) => warn!(
                    "{} {} answered {}, retrying in {:?} ({}/{})",
                    request.method,
                    request.url,
                    response.status,
                    wait,
                    attempt + 1,
                    self.policy.max_retries
                ),
                Err(err) => warn!(
                    "{} {} failed: {}, retrying in {:?} ({}/{})",
                    request.method,
                    request.url,
                    err,
                    wait,
                    attempt + 1,
                    self.policy.max_retries
                ),
            }
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
