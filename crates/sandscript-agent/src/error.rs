//! Error taxonomy for the executor loop and agent server.

use serde::{Deserialize, Serialize};

/// Why an executor activation was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    ReachedMaxIterations,
    ReachedMaxRetries,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CancelReason::ReachedMaxIterations => "reached_max_iterations",
            CancelReason::ReachedMaxRetries => "reached_max_retries",
        })
    }
}

/// Fatal executor errors. Sandbox and parse failures are *not* here — those
/// are recoverable and feed back into the conversation; only the LLM
/// transport aborts a run outright.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ExecutorError {
    #[error("llm transport failed: {0}")]
    Transport(String),
}

/// Errors surfaced to agent-server clients.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `respond` arrived while no human-input request was outstanding.
    #[error("no pending human-input request")]
    NoPendingRequest,

    /// The server task is gone (stopped or panicked).
    #[error("agent server is closed")]
    Closed,

    /// The client-side call timeout elapsed. The executor keeps running.
    #[error("call timed out")]
    CallTimeout,

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_reason_display() {
        assert_eq!(
            CancelReason::ReachedMaxIterations.to_string(),
            "reached_max_iterations"
        );
        assert_eq!(
            CancelReason::ReachedMaxRetries.to_string(),
            "reached_max_retries"
        );
    }

    #[test]
    fn test_transport_error_display() {
        let err = ExecutorError::Transport("connection refused".into());
        assert!(err.to_string().contains("llm transport failed"));
    }
}
