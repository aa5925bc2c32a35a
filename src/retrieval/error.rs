use thiserror::Error;

use crate::embedding::EmbeddingError;

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("embedder returned {got} vectors for {expected} texts")]
    VectorCountMismatch { expected: usize, got: usize },
}
