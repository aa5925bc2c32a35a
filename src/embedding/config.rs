use std::path::PathBuf;

use crate::embedding::error::EmbeddingError;

/// Output dimension of the stub embedder.
pub const STUB_EMBEDDING_DIM: usize = 384;

/// Token limit applied to every sentence before encoding.
pub const DEFAULT_MAX_SEQ_LEN: usize = 256;

/// Configuration for [`SentenceEmbedder`](super::SentenceEmbedder).
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    /// Directory with `config.json`, `model.safetensors` and `tokenizer.json`.
    /// `None` selects the deterministic stub.
    pub model_dir: Option<PathBuf>,
    pub max_seq_len: usize,
    pub stub_dim: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            max_seq_len: DEFAULT_MAX_SEQ_LEN,
            stub_dim: STUB_EMBEDDING_DIM,
        }
    }
}

impl EmbedderConfig {
    /// Config for a real model directory.
    pub fn new<P: Into<PathBuf>>(model_dir: P) -> Self {
        Self {
            model_dir: Some(model_dir.into()),
            ..Default::default()
        }
    }

    /// Config for the hash-seeded stub (no model files).
    pub fn stub() -> Self {
        Self::default()
    }

    pub fn is_stub(&self) -> bool {
        self.model_dir.is_none()
    }

    /// Checks that every file a real model needs is present.
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.max_seq_len == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "max_seq_len must be positive".to_string(),
            });
        }
        if self.stub_dim == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "stub_dim must be positive".to_string(),
            });
        }

        let Some(ref dir) = self.model_dir else {
            return Ok(());
        };

        for file in ["config.json", "model.safetensors", "tokenizer.json"] {
            let path = dir.join(file);
            if !path.exists() {
                return Err(EmbeddingError::ModelNotFound { path });
            }
        }
        Ok(())
    }
}
