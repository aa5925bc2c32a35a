use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("model '{model}' failed: {reason}")]
    Backend { model: String, reason: String },

    #[error("model '{model}' returned no text")]
    EmptyResponse { model: String },

    #[error("failed to build generator for '{model}': {reason}")]
    Build { model: String, reason: String },

    #[error("stage '{stage}' is out of range (expected 0-4)")]
    InvalidStage { stage: i64 },
}
