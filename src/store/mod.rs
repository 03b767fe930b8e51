//! In-memory content stores.
//!
//! Each store owns one content class and its own lock:
//!
//! | Store                | Key            | Value              |
//! |----------------------|----------------|--------------------|
//! | `ContentStore`       | template name  | `CompiledTemplate` |
//! | `ContentStore`       | `foo.css`      | `Stylesheet`       |
//! | `PostCollection`     | slug           | `Post` (ordered)   |
//!
//! Values are stored behind `Arc`, so a reader clones a handle under the read
//! lock and renders after releasing it. Writers only hold the write lock for
//! the in-memory swap; loading and compiling happen before `upsert` is called.
//!
//! A failed load never reaches `upsert`, which keeps the last good value in
//! place. No code path holds two store locks at once.

mod posts;

pub use posts::{PostCollection, Timestamped};

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Keyed map of the last successfully loaded value per key.
#[derive(Debug)]
pub struct ContentStore<V> {
    entries: RwLock<FxHashMap<String, Arc<V>>>,
}

impl<V> Default for ContentStore<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<V> ContentStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot handle of the current value, if any.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.read().get(key).cloned()
    }

    /// Insert or replace. Visible to every `get` that starts after this returns.
    pub fn upsert(&self, key: impl Into<String>, value: V) {
        let value = Arc::new(value);
        self.entries.write().insert(key.into(), value);
    }

    /// Delete if present. Returns whether an entry was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Sorted key list.
    #[cfg(test)]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
