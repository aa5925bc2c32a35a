use std::hash::{DefaultHasher, Hash, Hasher};

use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use super::bert::SentenceBert;
use super::config::EmbedderConfig;
use super::device::select_device;
use super::error::EmbeddingError;
use super::utils::{l2_normalize, load_batch_tokenizer};
use super::TextEmbedder;

enum Backend {
    Model {
        model: SentenceBert,
        tokenizer: Tokenizer,
        device: Device,
    },
    Stub {
        dim: usize,
    },
}

/// Sentence embedder backed by a BERT-family model, or a deterministic stub.
pub struct SentenceEmbedder {
    backend: Backend,
}

impl std::fmt::Debug for SentenceEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::Model { device, model, .. } => {
                format!("Model({:?}, hidden={})", device, model.hidden_size())
            }
            Backend::Stub { dim } => format!("Stub(dim={dim})"),
        };
        f.debug_struct("SentenceEmbedder")
            .field("backend", &backend)
            .finish()
    }
}

impl SentenceEmbedder {
    pub fn load(config: EmbedderConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;

        let Some(model_dir) = config.model_dir else {
            warn!("sentence embedder running in STUB mode");
            return Ok(Self {
                backend: Backend::Stub {
                    dim: config.stub_dim,
                },
            });
        };

        let device = select_device();
        let tokenizer = load_batch_tokenizer(&model_dir, config.max_seq_len)?;
        let model =
            SentenceBert::load(&model_dir, &device).map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("failed to load BERT encoder: {e}"),
            })?;

        info!(
            model_dir = %model_dir.display(),
            hidden_size = model.hidden_size(),
            max_seq_len = config.max_seq_len,
            "sentence embedder loaded"
        );

        Ok(Self {
            backend: Backend::Model {
                model,
                tokenizer,
                device,
            },
        })
    }

    pub fn stub() -> Self {
        Self {
            backend: Backend::Stub {
                dim: super::config::STUB_EMBEDDING_DIM,
            },
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.backend, Backend::Stub { .. })
    }

    fn embed_with_model(
        texts: &[&str],
        model: &SentenceBert,
        tokenizer: &Tokenizer,
        device: &Device,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let encodings = tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            })?;

        let mut ids = Vec::with_capacity(encodings.len());
        let mut type_ids = Vec::with_capacity(encodings.len());
        let mut masks = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            ids.push(Tensor::new(encoding.get_ids(), device)?);
            type_ids.push(Tensor::new(encoding.get_type_ids(), device)?);
            masks.push(Tensor::new(encoding.get_attention_mask(), device)?);
        }

        let input_ids = Tensor::stack(&ids, 0)?;
        let token_type_ids = Tensor::stack(&type_ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;

        debug!(
            batch = texts.len(),
            seq_len = input_ids.dim(1)?,
            "encoding sentence batch"
        );

        let pooled = model.encode(&input_ids, &token_type_ids, &attention_mask)?;
        let mut vectors = pooled.to_vec2::<f32>()?;
        for v in &mut vectors {
            l2_normalize(v);
        }
        Ok(vectors)
    }

    fn embed_stub(text: &str, dim: usize) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut embedding = Vec::with_capacity(dim);
        for _ in 0..dim {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            embedding.push(((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0);
        }
        l2_normalize(&mut embedding);
        embedding
    }
}

impl TextEmbedder for SentenceEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        match &self.backend {
            Backend::Model {
                model,
                tokenizer,
                device,
            } => Self::embed_with_model(texts, model, tokenizer, device),
            Backend::Stub { dim } => Ok(texts.iter().map(|t| Self::embed_stub(t, *dim)).collect()),
        }
    }
}
