use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CandidateError {
    /// Normalization found no element with usable text.
    #[error("generator output contained no usable candidate text")]
    NoCandidates,

    /// A preference pair needs one chosen and at least one rejected candidate.
    #[error("need at least 2 distinct candidates, got {found}")]
    Insufficient { found: usize },
}
