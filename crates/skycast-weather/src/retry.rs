//! Bounded retries with a fixed backoff.
//!
//! A logical call is attempted up to `max_attempts` times. Transport failures
//! and non-2xx statuses both consume one attempt; there is no distinction
//! between them. A failed attempt that is not the last one is followed by a
//! fixed `backoff` sleep. The sleep is a tokio timer, so only the calling task
//! is suspended.
//!
//! This layer never touches the circuit breaker; callers report the
//! terminal outcome.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use skycast_core::RetryConfig;
use thiserror::Error;

use crate::transport::{HttpResponse, Transport, TransportError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after each failed attempt except the last
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Duration::from_millis(backoff_ms),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff_ms)
    }
}

/// Last failure seen once every attempt has been used up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("HTTP {0}")]
    Status(u16),
}

/// Run `operation` under `policy`, sleeping `policy.backoff` between failures.
///
/// The closure receives the 1-based attempt number. The error of the final
/// attempt is returned unchanged.
pub async fn with_retry<F, Fut, T, E>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("Request succeeded on attempt {} of {}", attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(e) if attempt >= max_attempts => {
                tracing::warn!("All {} attempts failed, last error: {}", max_attempts, e);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    "Attempt {} of {} failed: {}; retrying in {:?}",
                    attempt,
                    max_attempts,
                    e,
                    policy.backoff
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}

/// GET requests wrapped in [`with_retry`].
#[derive(Clone)]
pub struct RetryingRequester {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryingRequester {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Fetch `url`, returning the first 2xx response.
    pub async fn call(&self, url: &str) -> Result<HttpResponse, RequestError> {
        let transport = &self.transport;
        with_retry(self.policy, |_attempt| async move {
            match transport.get(url).await {
                Ok(response) if response.is_success() => Ok(response),
                Ok(response) => Err(RequestError::Status(response.status())),
                Err(e) => Err(RequestError::Transport(e)),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays a fixed script of outcomes, one per call.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, _url: &str) -> Result<HttpResponse, TransportError> {
            *self.calls.lock() += 1;
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("script exhausted".into())))
        }
    }

    const BACKOFF: Duration = Duration::from_millis(1000);

    /// Paused time auto-advances to each timer, so elapsed time counts sleeps.
    fn assert_backoffs(elapsed: Duration, expected: u32) {
        assert!(
            elapsed >= BACKOFF * expected && elapsed < BACKOFF * (expected + 1),
            "expected {} backoff delays, elapsed {:?}",
            expected,
            elapsed
        );
    }

    fn ok(body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(200, body))
    }

    fn status(code: u16) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(code, ""))
    }

    fn refused() -> Result<HttpResponse, TransportError> {
        Err(TransportError::ConnectionFailed("connection refused".into()))
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(1000));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 0,
            backoff_ms: 50,
        });
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff, Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_has_no_delay() {
        let transport = ScriptedTransport::new(vec![ok("{}")]);
        let requester = RetryingRequester::new(transport.clone(), RetryPolicy::default());

        let start = tokio::time::Instant::now();
        let response = requester.call("http://upstream/").await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(transport.calls(), 1);
        assert!(start.elapsed() < BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_third_attempt_after_two_delays() {
        let transport = ScriptedTransport::new(vec![refused(), status(503), ok(r#"{"a":1}"#)]);
        let requester = RetryingRequester::new(transport.clone(), RetryPolicy::default());

        let start = tokio::time::Instant::now();
        let response = requester.call("http://upstream/").await.unwrap();

        assert_eq!(transport.calls(), 3);
        assert_backoffs(start.elapsed(), 2);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["a"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_failure_without_trailing_delay() {
        let transport = ScriptedTransport::new(vec![status(500), refused(), status(502)]);
        let requester = RetryingRequester::new(transport.clone(), RetryPolicy::default());

        let start = tokio::time::Instant::now();
        let err = requester.call("http://upstream/").await.unwrap_err();

        assert_eq!(err, RequestError::Status(502));
        assert_eq!(transport.calls(), 3);
        assert_backoffs(start.elapsed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_terminal_error_kind() {
        let transport = ScriptedTransport::new(vec![status(500), status(500), refused()]);
        let requester = RetryingRequester::new(transport.clone(), RetryPolicy::default());

        let err = requester.call("http://upstream/").await.unwrap_err();
        assert!(matches!(
            err,
            RequestError::Transport(TransportError::ConnectionFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_are_retried_like_server_errors() {
        let transport = ScriptedTransport::new(vec![status(404), status(404), ok("{}")]);
        let requester = RetryingRequester::new(transport.clone(), RetryPolicy::default());

        assert!(requester.call("http://upstream/").await.is_ok());
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_policy_never_sleeps() {
        let transport = ScriptedTransport::new(vec![status(500), ok("{}")]);
        let requester = RetryingRequester::new(transport.clone(), RetryPolicy::new(1, 1000));

        let start = tokio::time::Instant::now();
        let err = requester.call("http://upstream/").await.unwrap_err();

        assert_eq!(err, RequestError::Status(500));
        assert_eq!(transport.calls(), 1);
        assert!(start.elapsed() < BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_passes_attempt_numbers() {
        let seen = Mutex::new(Vec::new());
        let result: Result<(), String> = with_retry(RetryPolicy::new(3, 10), |attempt| {
            seen.lock().push(attempt);
            async move { Err(format!("attempt {} failed", attempt)) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "attempt 3 failed");
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }
}
