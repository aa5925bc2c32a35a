use thiserror::Error;

/// Outcome of a single calling-convention attempt.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// The callable does not accept this argument shape; try the next one.
    #[error("signature mismatch: {0}")]
    SignatureMismatch(String),

    /// The callable accepted the arguments and then failed.
    #[error("{0}")]
    Failed(String),
}

impl CallError {
    pub fn mismatch(shape: &str) -> Self {
        CallError::SignatureMismatch(format!("{shape} arguments not accepted"))
    }
}

#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    #[error("no calling convention succeeded; last error: {last}")]
    Exhausted { last: String },

    #[error("{strategy} call failed: {reason}")]
    Failed {
        strategy: &'static str,
        reason: String,
    },

    #[error("pipeline did not return a usable payload")]
    NoPayload,

    #[error("unexpected pipeline output: {0}")]
    UnexpectedOutput(String),
}
