//! Retry with exponential backoff for outbound Discord calls
//!
//! Only transport failures, 429 and 5xx answers are retried. Anything else
//! (missing permissions, unknown channel, bad request) fails on first try.
//! Calls that create threads or messages skip transport failures too.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serenity::http::HttpError;
use tracing::warn;

use bj_core::RetryConfig;

/// Backoff schedule for one outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Upper bound for a single backoff
    pub const MAX_DELAY: Duration = Duration::from_secs(8);

    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(Self::MAX_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.base_delay_ms))
    }
}

/// 429 and 5xx
pub fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Whether a serenity error is worth another attempt
pub fn is_transient(error: &serenity::Error) -> bool {
    match error {
        serenity::Error::Http(http) => {
            let http: &HttpError = http;
            match http {
                HttpError::UnsuccessfulRequest(response) => {
                    is_transient_status(response.status_code.as_u16())
                }
                HttpError::Request(_) => true,
                _ => false,
            }
        }
        serenity::Error::Io(_) => true,
        _ => false,
    }
}

/// Whether Discord answered with 429 or 5xx.
///
/// Unlike [`is_transient`] this excludes transport failures: a request that
/// timed out may still have been applied.
pub fn is_transient_rejection(error: &serenity::Error) -> bool {
    match error {
        serenity::Error::Http(http) => {
            let http: &HttpError = http;
            matches!(
                http,
                HttpError::UnsuccessfulRequest(response)
                    if is_transient_status(response.status_code.as_u16())
            )
        }
        _ => false,
    }
}

/// Run `op` until it succeeds, fails permanently, or retries run out
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && is_transient(&e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    label,
                    attempt + 1,
                    policy.max_retries + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// [`with_retry`] for serenity calls
pub async fn discord_call<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    op: F,
) -> std::result::Result<T, serenity::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, serenity::Error>>,
{
    with_retry(policy, label, is_transient, op).await
}

/// [`with_retry`] for serenity calls that create something (threads,
/// messages). Only explicit 429/5xx rejections are retried so a lost
/// response cannot produce a duplicate.
pub async fn discord_create<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    op: F,
) -> std::result::Result<T, serenity::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, serenity::Error>>,
{
    with_retry(policy, label, is_transient_rejection, op).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    enum FakeError {
        Flaky,
        Fatal,
    }

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn flaky(e: &FakeError) -> bool {
        matches!(e, FakeError::Flaky)
    }

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_millis(250));
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for(10), RetryPolicy::MAX_DELAY);
        assert_eq!(policy.delay_for(u32::MAX), RetryPolicy::MAX_DELAY);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_transient_status() {
        assert!(is_transient_status(429));
        assert!(is_transient_status(500));
        assert!(is_transient_status(503));
        assert!(!is_transient_status(400));
        assert!(!is_transient_status(403));
        assert!(!is_transient_status(404));
    }

    #[test]
    fn test_io_errors_only_retried_for_idempotent_calls() {
        let error = serenity::Error::Io(std::io::Error::other("connection reset"));
        assert!(is_transient(&error));
        assert!(!is_transient_rejection(&error));
    }

    #[tokio::test]
    async fn test_create_call_does_not_retry_transport_errors() {
        let mut calls = 0;
        let result: Result<(), serenity::Error> = discord_create(&fast(3), "create", || {
            calls += 1;
            async { Err(serenity::Error::Io(std::io::Error::other("timed out"))) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let mut calls = 0;
        let result = with_retry(&fast(3), "send", flaky, || {
            calls += 1;
            let outcome = if calls < 3 { Err(FakeError::Flaky) } else { Ok(calls) };
            async move { outcome }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let mut calls = 0;
        let result: Result<(), FakeError> = with_retry(&fast(2), "send", flaky, || {
            calls += 1;
            async { Err(FakeError::Flaky) }
        })
        .await;

        assert!(matches!(result, Err(FakeError::Flaky)));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), FakeError> = with_retry(&fast(5), "send", flaky, || {
            calls += 1;
            async { Err(FakeError::Fatal) }
        })
        .await;

        assert!(matches!(result, Err(FakeError::Fatal)));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let mut calls = 0;
        let result: Result<(), FakeError> = with_retry(&RetryPolicy::none(), "send", flaky, || {
            calls += 1;
            async { Err(FakeError::Flaky) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
