use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// The credential variable is unset or blank. Never retried.
    #[error("{var} is not set")]
    MissingCredential { var: String },

    #[error("credential in {var} is not a valid header value")]
    InvalidCredential { var: String },

    #[error("evaluator returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("evaluator request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("evaluator transport error: {0}")]
    Transport(String),

    /// The response body matched neither known text shape.
    #[error("invalid evaluator response: {0}")]
    InvalidResponse(String),

    #[error("no integer in evaluator reply: {0:?}")]
    NoInteger(String),

    #[error("evaluator choice {choice} matches no candidate (batch of {count})")]
    UnresolvedChoice { choice: i64, count: usize },
}

impl EvaluatorError {
    /// True for failures that came from the network rather than the reply content.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            EvaluatorError::Http { .. } | EvaluatorError::Timeout { .. } | EvaluatorError::Transport(_)
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EvaluatorError::MissingCredential { .. } | EvaluatorError::InvalidCredential { .. }
        )
    }
}
