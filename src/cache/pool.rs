use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use genai::Client;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::CachePolicy;
use super::keyed::KeyedCache;
use crate::generation::{ChatGenerator, EchoGenerator, GenerationError, Generator, GeneratorRole};

/// Generator-pool key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratorKey {
    pub model: String,
    pub role: GeneratorRole,
}

impl GeneratorKey {
    pub fn new(model: impl Into<String>, role: GeneratorRole) -> Self {
        Self {
            model: model.into(),
            role,
        }
    }
}

/// Builds a ready-to-use generator. May be expensive.
pub trait GeneratorFactory: Send + Sync {
    fn build(&self, key: &GeneratorKey) -> Result<Arc<dyn Generator>, GenerationError>;
}

/// Builds [`ChatGenerator`]s sharing one `genai` client.
#[derive(Debug, Clone, Default)]
pub struct ChatGeneratorFactory {
    client: Client,
}

impl ChatGeneratorFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl GeneratorFactory for ChatGeneratorFactory {
    fn build(&self, key: &GeneratorKey) -> Result<Arc<dyn Generator>, GenerationError> {
        if key.model.trim().is_empty() {
            return Err(GenerationError::Build {
                model: key.model.clone(),
                reason: "empty model name".to_string(),
            });
        }
        Ok(Arc::new(ChatGenerator::new(self.client.clone(), &key.model)))
    }
}

/// Builds offline [`EchoGenerator`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGeneratorFactory;

impl GeneratorFactory for EchoGeneratorFactory {
    fn build(&self, key: &GeneratorKey) -> Result<Arc<dyn Generator>, GenerationError> {
        Ok(Arc::new(EchoGenerator::new(&key.model)))
    }
}

/// Lookup-or-create pool of generator instances keyed by (model, role).
///
/// Construction runs under one lock so a generator is never built twice for a key.
/// Generation calls on a returned instance are not serialized.
pub struct GeneratorPool {
    cache: KeyedCache<GeneratorKey, Arc<dyn Generator>>,
    factory: Arc<dyn GeneratorFactory>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl std::fmt::Debug for GeneratorPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorPool")
            .field("cache", &self.cache)
            .field("builds", &self.builds())
            .finish()
    }
}

impl GeneratorPool {
    pub fn new(factory: Arc<dyn GeneratorFactory>) -> Self {
        Self {
            cache: KeyedCache::new("generators"),
            factory,
            build_lock: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    /// With [`CachePolicy::Bypass`] the pool is cleared and a fresh instance is
    /// built and returned without being stored.
    pub fn get(
        &self,
        key: &GeneratorKey,
        policy: CachePolicy,
    ) -> Result<Arc<dyn Generator>, GenerationError> {
        if policy == CachePolicy::Bypass {
            self.clear();
            return self.build(key);
        }

        if let Some(generator) = self.cache.get(key) {
            debug!(model = %key.model, role = ?key.role, "generator pool hit");
            return Ok(generator);
        }

        let _guard = self.build_lock.lock();
        if let Some(generator) = self.cache.get(key) {
            return Ok(generator);
        }

        let generator = self.build(key)?;
        self.cache.insert(key.clone(), Arc::clone(&generator));
        Ok(generator)
    }

    fn build(&self, key: &GeneratorKey) -> Result<Arc<dyn Generator>, GenerationError> {
        let generator = self.factory.build(key)?;
        self.builds.fetch_add(1, Ordering::SeqCst);
        info!(model = %key.model, role = ?key.role, "generator constructed");
        Ok(generator)
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn len(&self) -> u64 {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Total constructions so far (including bypassed ones).
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}
