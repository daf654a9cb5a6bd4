use thiserror::Error;

/// Stable, user-facing error kinds (§7). Each variant's `Display` text is the label
/// shown verbatim in logs and CLI output.
#[derive(Debug, Error)]
pub enum OperonError {
    #[error("parse_error: {0}")]
    ParseError(String),

    #[error("path_unresolved: {0}")]
    PathUnresolved(String),

    #[error("no_match")]
    NoMatch,

    #[error("ambiguous")]
    Ambiguous,

    #[error("syntax_reject: {0}")]
    SyntaxReject(String),

    #[error("approval_rejected: {0}")]
    ApprovalRejected(String),

    #[error("approval_timeout")]
    ApprovalTimeout,

    #[error("tool_forbidden: {0}")]
    ToolForbidden(String),

    #[error("loop_detected")]
    LoopDetected,

    #[error("noop_streak")]
    NoopStreak,

    #[error("rollback_partial: {0}")]
    RollbackPartial(String),

    #[error("oracle_unavailable: {0}")]
    OracleUnavailable(String),
}

impl OperonError {
    /// Whether the run continues after this error (it only affects the current step)
    /// or the orchestrator must terminate.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OperonError::ParseError(_)
                | OperonError::NoMatch
                | OperonError::Ambiguous
                | OperonError::SyntaxReject(_)
                | OperonError::ApprovalRejected(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors_stay_local() {
        assert!(OperonError::NoMatch.is_recoverable());
        assert!(OperonError::SyntaxReject("bad".into()).is_recoverable());
        assert!(!OperonError::LoopDetected.is_recoverable());
        assert!(!OperonError::RollbackPartial("x".into()).is_recoverable());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(OperonError::NoMatch.to_string(), "no_match");
        assert_eq!(OperonError::LoopDetected.to_string(), "loop_detected");
    }
}
