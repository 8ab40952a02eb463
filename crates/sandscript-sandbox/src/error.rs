//! Error taxonomy for the sandbox pipeline.

/// Errors produced by the sandbox. Every variant except transport-level
/// failures upstream is recoverable from the executor's point of view: the
/// message is fed back to the LLM as a fix prompt.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SandboxError {
    /// The source failed to parse; the message carries location and token.
    #[error("syntax error: {message}")]
    Parsing { message: String },

    /// The static analyzer rejected the program.
    #[error("{message}")]
    Restricted { message: String },

    /// The evaluator raised an error while running.
    #[error("{message}")]
    Exception { message: String },

    /// Non-exceptional early termination (`throw`).
    #[error("uncaught throw: {message}")]
    Throw { message: String },

    /// The evaluation worker terminated abnormally.
    #[error("evaluator exited: {message}")]
    Exit { message: String },

    /// The wall-clock deadline expired; the worker was cancelled.
    #[error("Execution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl SandboxError {
    /// Stable lowercase tag for telemetry and classification.
    pub fn kind(&self) -> &'static str {
        match self {
            SandboxError::Parsing { .. } => "parsing",
            SandboxError::Restricted { .. } => "restricted",
            SandboxError::Exception { .. } => "exception",
            SandboxError::Throw { .. } => "throw",
            SandboxError::Exit { .. } => "exit",
            SandboxError::Timeout { .. } => "timeout",
        }
    }
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_matches_contract() {
        let err = SandboxError::Timeout { timeout_ms: 100 };
        assert_eq!(err.to_string(), "Execution timed out after 100ms");
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_restricted_display_is_bare_message() {
        let err = SandboxError::Restricted {
            message: "module File is restricted".into(),
        };
        assert_eq!(err.to_string(), "module File is restricted");
        assert_eq!(err.kind(), "restricted");
    }
}
