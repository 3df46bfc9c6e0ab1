use std::time::Duration;

use thiserror::Error;

/// Failure of one outbound call, classified by whether retrying can help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The call was refused locally before touching the network.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Network unreachable, DNS failure, connection reset.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("attempt timed out after {}ms", timeout.as_millis())]
    Timeout { timeout: Duration },

    /// 4xx-class answer. Retrying the same request cannot succeed.
    #[error("request rejected ({status}): {detail}")]
    RemoteRejection { status: u16, detail: String },

    /// 5xx-class answer.
    #[error("remote failure ({status}): {detail}")]
    RemoteFailure { status: u16, detail: String },

    /// The call succeeded but produced nothing usable.
    #[error("empty result: {0}")]
    EmptyResult(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    #[error("call cancelled")]
    Cancelled,
}

impl CallError {
    /// Only transport failures, timeouts, and 5xx answers are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CallError::Transport(_) | CallError::Timeout { .. } | CallError::RemoteFailure { .. }
        )
    }

    /// Map an error HTTP status and body detail onto the rejection/failure
    /// split. Anything outside 4xx and 5xx is not an answer this client
    /// understands and is never retried.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            400..=499 => CallError::RemoteRejection { status, detail },
            500..=599 => CallError::RemoteFailure { status, detail },
            _ => CallError::Decode(format!("unexpected status {status}: {detail}")),
        }
    }
}
