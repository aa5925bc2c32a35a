use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::config::EmbedderConfig;
use super::error::EmbeddingError;
use super::sentence::SentenceEmbedder;
use super::TextEmbedder;

/// Defers loading the sentence embedder until the first embedding request.
///
/// A failed load is not remembered; the next request tries again.
pub struct LazyEmbedder {
    config: EmbedderConfig,
    inner: Mutex<Option<Arc<SentenceEmbedder>>>,
}

impl LazyEmbedder {
    pub fn new(config: EmbedderConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(None),
        }
    }

    /// Returns the loaded embedder, loading it on first use.
    pub fn get(&self) -> Result<Arc<SentenceEmbedder>, EmbeddingError> {
        let mut slot = self.inner.lock();
        if let Some(embedder) = slot.as_ref() {
            return Ok(Arc::clone(embedder));
        }

        debug!(stub = self.config.is_stub(), "loading sentence embedder");
        let embedder = Arc::new(SentenceEmbedder::load(self.config.clone())?);
        *slot = Some(Arc::clone(&embedder));
        Ok(embedder)
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.lock().is_some()
    }
}

impl TextEmbedder for LazyEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.get()?.embed_batch(texts)
    }
}
