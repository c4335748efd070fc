//! Poll a resource until it reaches a target state

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::Error;

pub const STATE_DELETING: &str = "DELETING";
pub const STATE_DELETED: &str = "DELETED";

#[derive(Debug, Clone)]
pub struct StateChange<'a> {
    /// Human readable name of the resource, used in errors and logs
    pub resource: &'a str,
    /// States that are expected before reaching the target
    pub pending: &'a [&'a str],
    /// States that end the wait successfully
    pub target: &'a [&'a str],
    pub timeout: Duration,
    /// Wait before the first poll
    pub delay: Duration,
    pub min_interval: Duration,
    /// The interval doubles after each poll up to this bound
    pub max_interval: Duration,
}

impl<'a> StateChange<'a> {
    pub fn new(
        resource: &'a str,
        pending: &'a [&'a str],
        target: &'a [&'a str],
        timeout: Duration,
    ) -> Self {
        Self {
            resource,
            pending,
            target,
            timeout,
            delay: Duration::from_secs(5),
            min_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(60),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_interval(mut self, min_interval: Duration, max_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self.max_interval = max_interval.max(min_interval);
        self
    }

    /// Poll `refresh` until it returns one of the target states
    ///
    /// Returns the reached state.
    pub async fn wait<F, Fut>(&self, mut refresh: F) -> Result<String, Error>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<String, Error>> + Send,
    {
        let deadline = Instant::now() + self.timeout;
        let mut interval = self.min_interval;

        tokio::time::sleep(self.delay).await;
        loop {
            let state = refresh().await?;
            debug!("{} is in state {:?}", self.resource, state);

            if self.target.contains(&state.as_str()) {
                return Ok(state);
            }
            if !self.pending.contains(&state.as_str()) {
                return Err(Error::UnexpectedState {
                    resource: self.resource.to_owned(),
                    state,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout {
                    resource: self.resource.to_owned(),
                    target: self.target.join(" or "),
                    timeout: self.timeout,
                });
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
            interval = (interval * 2).min(self.max_interval);
        }
    }
}

/// Wait until `fetch` reports the resource as missing
pub async fn wait_deleted<F, Fut, T>(
    resource: &str,
    timeout: Duration,
    delay: Duration,
    interval: Duration,
    mut fetch: F,
) -> Result<(), Error>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, Error>> + Send,
{
    StateChange::new(resource, &[STATE_DELETING], &[STATE_DELETED], timeout)
        .with_delay(delay)
        .with_interval(interval, interval)
        .wait(|| {
            let fetched = fetch();
            async move {
                match fetched.await {
                    Ok(_) => Ok(STATE_DELETING.to_owned()),
                    Err(err) if err.is_not_found() => Ok(STATE_DELETED.to_owned()),
                    Err(err) => Err(err),
                }
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use reqwest::StatusCode;

    use super::*;
    use crate::client::ApiError;

    fn fast<'a>(
        pending: &'a [&'a str],
        target: &'a [&'a str],
        timeout: Duration,
    ) -> StateChange<'a> {
        StateChange::new("Kafka Cluster \"lkc-1\"", pending, target, timeout)
            .with_delay(Duration::ZERO)
            .with_interval(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[tokio::test]
    async fn waits_for_target_state() {
        let polls = Arc::new(AtomicUsize::new(0));
        let states = ["PROVISIONING", "PROVISIONING", "PROVISIONED"];

        let reached = fast(&["PROVISIONING"], &["PROVISIONED"], Duration::from_secs(5))
            .wait(|| {
                let polls = polls.clone();
                async move {
                    let i = polls.fetch_add(1, Ordering::SeqCst);
                    Ok(states[i].to_owned())
                }
            })
            .await
            .unwrap();

        assert_eq!(reached, "PROVISIONED");
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unexpected_state_is_an_error() {
        let err = fast(&["PROVISIONING"], &["PROVISIONED"], Duration::from_secs(5))
            .wait(|| async { Ok("FAILED".to_owned()) })
            .await
            .unwrap_err();
        match err {
            Error::UnexpectedState { state, .. } => assert_eq!(state, "FAILED"),
            err => panic!("unexpected error {err:?}"),
        }
    }

    #[tokio::test]
    async fn times_out() {
        let err = fast(&["PROVISIONING"], &["PROVISIONED"], Duration::from_millis(10))
            .wait(|| async { Ok("PROVISIONING".to_owned()) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn refresh_errors_abort_the_wait() {
        let err = fast(&["PROVISIONING"], &["PROVISIONED"], Duration::from_secs(5))
            .wait(|| async { Err(Error::Network("connection refused".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn deletion_completes_on_not_found() {
        let polls = Arc::new(AtomicUsize::new(0));
        wait_deleted(
            "Network \"n-1\"",
            Duration::from_secs(5),
            Duration::ZERO,
            Duration::from_millis(1),
            || {
                let polls = polls.clone();
                async move {
                    if polls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Ok(())
                    } else {
                        Err(Error::NotFound(ApiError {
                            status_code: StatusCode::NOT_FOUND,
                            messages: vec![],
                        }))
                    }
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }
}
