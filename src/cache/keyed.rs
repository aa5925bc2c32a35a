use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;

/// Process-lifetime keyed cache with concurrent lookup-or-create.
///
/// Unbounded: entries stay until [`KeyedCache::invalidate_all`] or process exit.
pub struct KeyedCache<K, V> {
    name: &'static str,
    entries: Cache<K, V>,
}

impl<K, V> KeyedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Cache::builder().build(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key)
    }

    #[inline]
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the cached value or runs `init` once for concurrent callers of the same key.
    /// Errors are not cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, init: F) -> Result<V, Arc<E>>
    where
        F: FnOnce() -> Result<V, E>,
        E: Send + Sync + 'static,
    {
        self.entries.try_get_with(key, init)
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> std::fmt::Debug for KeyedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedCache")
            .field("name", &self.name)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
