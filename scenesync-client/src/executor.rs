//! Retry/timeout wrapper around outbound calls.
//!
//! Each attempt gets a fresh `timeout_ms` window; expiry drops the attempt's
//! future. Only [`CallError::is_retryable`] failures are retried, with
//! `base_delay_ms * 2^(n-1)` of backoff before attempt `n`. Cancellation is
//! raced against both the attempt and the backoff sleep.

use std::future::Future;

use scenesync_core::RetryPolicy;

use crate::cancel::CancellationToken;
use crate::error::CallError;

/// Run `operation` under `policy`, retrying transient failures.
///
/// `operation` receives the 0-indexed attempt number. When retries are
/// exhausted the last error is returned unchanged.
pub async fn execute<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, CallError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    let attempts = policy.max_attempts();
    let timeout = policy.timeout();
    let mut attempt = 0u32;

    loop {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CallError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(CallError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CallError::Cancelled),
            result = tokio::time::timeout(timeout, operation(attempt)) => match result {
                Ok(inner) => inner,
                Err(_) => Err(CallError::Timeout { timeout }),
            },
        };

        match outcome {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt, "call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                tracing::warn!(
                    attempt,
                    remaining = attempts - attempt - 1,
                    error = %err,
                    "call failed, retrying",
                );
                attempt += 1;
            }
            Err(err) => {
                if err.is_retryable() {
                    tracing::error!(attempts, error = %err, "call failed, retries exhausted");
                } else {
                    tracing::debug!(attempt, error = %err, "terminal call failure");
                }
                return Err(err);
            }
        }
    }
}
