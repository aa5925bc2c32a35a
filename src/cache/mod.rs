//! Process-scoped caches owned by the pipeline.
//!
//! - [`GeneratorPool`]: (model, role) → generator instance.
//! - highlight cache: (persona, product, top_k) → ranked review snippets.
//! - [`TemplateIndex`]: (style group, stage) → templates, precomputed at load.
//!
//! A [`CacheRegistry`] is built once per pipeline and shared by handle.

mod keyed;
mod pool;


pub use keyed::KeyedCache;
pub use pool::{
    ChatGeneratorFactory, EchoGeneratorFactory, GeneratorFactory, GeneratorKey, GeneratorPool,
};

use std::sync::Arc;

use tracing::debug;

use crate::retrieval::{RankedSnippet, RetrievalError};
use crate::templates::TemplateIndex;

/// Whether a call may reuse cached state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    Enabled,
    /// Build everything fresh; the generator pool is cleared.
    Bypass,
}

impl CachePolicy {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            CachePolicy::Enabled
        } else {
            CachePolicy::Bypass
        }
    }
}

/// Highlight-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HighlightKey {
    pub persona: String,
    pub product: String,
    pub top_k: usize,
}

pub type HighlightCache = KeyedCache<HighlightKey, Arc<Vec<RankedSnippet>>>;

pub struct CacheRegistry {
    generators: GeneratorPool,
    highlights: HighlightCache,
    templates: Arc<TemplateIndex>,
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("generators", &self.generators)
            .field("highlights", &self.highlights)
            .field("style_groups", &self.templates.group_count())
            .finish()
    }
}

impl CacheRegistry {
    pub fn new(factory: Arc<dyn GeneratorFactory>, templates: TemplateIndex) -> Self {
        Self {
            generators: GeneratorPool::new(factory),
            highlights: KeyedCache::new("highlights"),
            templates: Arc::new(templates),
        }
    }

    pub fn generators(&self) -> &GeneratorPool {
        &self.generators
    }

    pub fn highlights(&self) -> &HighlightCache {
        &self.highlights
    }

    pub fn templates(&self) -> &TemplateIndex {
        &self.templates
    }

    /// Cached highlights for `key`, computing them on a miss.
    ///
    /// Under [`CachePolicy::Bypass`] the cache is neither read nor written.
    pub fn highlights_for<F>(
        &self,
        key: HighlightKey,
        policy: CachePolicy,
        compute: F,
    ) -> Result<Arc<Vec<RankedSnippet>>, RetrievalError>
    where
        F: FnOnce() -> Result<Vec<RankedSnippet>, RetrievalError>,
    {
        if policy == CachePolicy::Bypass {
            return compute().map(Arc::new);
        }

        if let Some(hit) = self.highlights.get(&key) {
            debug!(persona = %key.persona, product = %key.product, "highlight cache hit");
            return Ok(hit);
        }

        self.highlights
            .get_or_try_insert_with(key, || compute().map(Arc::new))
            .map_err(|e| (*e).clone())
    }
}
