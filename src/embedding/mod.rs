//! Sentence embeddings for review and CRM-snippet retrieval.
//!
//! - [`SentenceEmbedder`] runs a BERT-family encoder (or a deterministic stub).
//! - [`LazyEmbedder`] defers the model load to the first request.

/// Mean-pooled BERT encoder.
pub mod bert;
mod config;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;
mod lazy;
mod sentence;
/// Tokenizer loading and vector helpers.
pub mod utils;


pub use config::{DEFAULT_MAX_SEQ_LEN, EmbedderConfig, STUB_EMBEDDING_DIM};
pub use error::EmbeddingError;
pub use lazy::LazyEmbedder;
pub use sentence::SentenceEmbedder;

/// Anything that turns a batch of strings into one vector per string.
pub trait TextEmbedder: Send + Sync {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

impl<T: TextEmbedder + ?Sized> TextEmbedder for std::sync::Arc<T> {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed_batch(texts)
    }
}
