//! Backoff helpers for callers that want to repeat a call.
//!
//! Individual calls never retry on their own. The client uses these only
//! for explicit waiting (e.g. polling a studio artifact until it completes),
//! and callers can wrap any operation the same way.

mod policy;

pub use policy::RetryPolicy;

use std::future::Future;
use std::time::Duration;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    Connect,
    Timeout,
    RateLimited,
    ServerError,
    /// The artifact is still being generated.
    NotReady,
}

impl RetryReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::NotReady => "not_ready",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry {
        reason: RetryReason,
        retry_after: Option<Duration>,
    },
    DoNotRetry,
}

impl RetryDecision {
    fn retry(reason: RetryReason) -> Self {
        Self::Retry {
            reason,
            retry_after: None,
        }
    }
}

/// Metadata for one scheduled retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    pub attempt: u32,
    pub delay: Duration,
    pub reason: RetryReason,
}

/// Map an [`Error`] onto a decision. Authentication and structure problems
/// never clear up by waiting.
pub fn classify_error(err: &Error) -> RetryDecision {
    match err {
        Error::Timeout(_) => RetryDecision::retry(RetryReason::Timeout),
        Error::Transport(e) if e.is_timeout() => RetryDecision::retry(RetryReason::Timeout),
        Error::Transport(e) if e.is_connect() || e.is_request() => {
            RetryDecision::retry(RetryReason::Connect)
        }
        Error::HttpStatus { status: 429, .. } => RetryDecision::retry(RetryReason::RateLimited),
        Error::HttpStatus { status, .. } if *status >= 500 => {
            RetryDecision::retry(RetryReason::ServerError)
        }
        Error::ArtifactNotReady { .. } => RetryDecision::retry(RetryReason::NotReady),
        _ => RetryDecision::DoNotRetry,
    }
}

/// Classifier for [`retry_with_backoff`] over crate results.
pub fn classify_result<T>(result: &Result<T, Error>) -> RetryDecision {
    match result {
        Ok(_) => RetryDecision::DoNotRetry,
        Err(e) => classify_error(e),
    }
}

/// Retry an async operation with backoff according to `policy`.
///
/// - `operation(attempt)` is called with a 1-based attempt number.
/// - `classify(result)` decides whether to retry.
/// - `on_retry(info)` is called right before sleeping.
pub async fn retry_with_backoff<T, E, Op, Fut, Classify, OnRetry>(
    policy: &RetryPolicy,
    mut operation: Op,
    mut classify: Classify,
    mut on_retry: OnRetry,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Classify: FnMut(&Result<T, E>) -> RetryDecision,
    OnRetry: FnMut(RetryAttempt),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = operation(attempt).await;
        if attempt >= max_attempts {
            return result;
        }
        let RetryDecision::Retry {
            reason,
            retry_after,
        } = classify(&result)
        else {
            return result;
        };
        let delay = policy.with_jitter(retry_after.unwrap_or_else(|| policy.backoff_delay(attempt)));
        on_retry(RetryAttempt {
            attempt,
            delay,
            reason,
        });
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
