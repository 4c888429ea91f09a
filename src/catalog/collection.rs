//! The document-collection capability set the catalog is built on:
//! indexed find, upsert, optimistic update, and `$addToSet`-style
//! idempotent appends — everything the catalog model needs from a
//! backing store, without committing to any particular database.
//!
//! `MemoryCollection` is the one implementation in this workspace: an
//! in-process `BTreeMap` guarded by a `tokio::sync::RwLock`, each row
//! carrying a version counter so callers can do read-then-compare-and-
//! swap the same way a real document database's optimistic update
//! would work.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;

#[async_trait]
pub trait Collection<K, V>: Send + Sync
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V>;
    async fn upsert(&self, key: K, value: V);
    async fn remove(&self, key: &K) -> Option<V>;
    async fn all(&self) -> Vec<V>;
}

/// A row's current value together with the version it was last
/// written at. Callers hold onto the version across a read-modify-
/// write cycle and pass it back to `compare_and_swap`.
#[derive(Debug, Clone)]
pub struct Versioned<V> {
    pub value: V,
    pub version: u64,
}

pub struct MemoryCollection<K, V> {
    rows: RwLock<BTreeMap<K, Versioned<V>>>,
}

impl<K, V> Default for MemoryCollection<K, V>
where
    K: Ord,
{
    fn default() -> Self {
        MemoryCollection {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, V> MemoryCollection<K, V>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// The current value and version for `key`, if present. Callers
    /// performing an optimistic update read this, compute a new value
    /// off to the side, then call `compare_and_swap`.
    pub async fn get_versioned(&self, key: &K) -> Option<Versioned<V>> {
        self.rows.read().await.get(key).cloned()
    }

    /// Writes `value` for `key` only if the row is still at
    /// `expected_version` (absent counts as version 0). On success,
    /// returns the new version; on a lost race, returns
    /// `StoreError::Conflict`.
    pub async fn compare_and_swap(
        &self,
        key: &K,
        expected_version: u64,
        value: V,
    ) -> Result<u64, StoreError>
    where
        K: std::fmt::Display,
    {
        let mut rows = self.rows.write().await;
        let current_version = rows.get(key).map(|r| r.version).unwrap_or(0);
        if current_version != expected_version {
            return Err(StoreError::Conflict(key.to_string()));
        }

        let new_version = current_version + 1;
        rows.insert(
            key.clone(),
            Versioned {
                value,
                version: new_version,
            },
        );
        Ok(new_version)
    }

    /// Unconditional insert-or-overwrite, bumping the version.
    /// Ingestion uses this for new primary keys where no prior version
    /// could exist; everything else should prefer `compare_and_swap`.
    pub async fn force_upsert(&self, key: K, value: V) {
        let mut rows = self.rows.write().await;
        let new_version = rows.get(&key).map(|r| r.version + 1).unwrap_or(1);
        rows.insert(key, Versioned { value, version: new_version });
    }

    pub async fn contains_key(&self, key: &K) -> bool {
        self.rows.read().await.contains_key(key)
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.rows.write().await.remove(key).map(|r| r.value)
    }

    pub async fn all_entries(&self) -> Vec<(K, V)> {
        self.rows
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl<K, V> Collection<K, V> for MemoryCollection<K, V>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        self.rows.read().await.get(key).map(|r| r.value.clone())
    }

    async fn upsert(&self, key: K, value: V) {
        self.force_upsert(key, value).await;
    }

    async fn remove(&self, key: &K) -> Option<V> {
        MemoryCollection::remove(self, key).await
    }

    async fn all(&self) -> Vec<V> {
        self.rows.read().await.values().map(|r| r.value.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn compare_and_swap_rejects_a_stale_version() {
        let col: MemoryCollection<String, u32> = MemoryCollection::new();
        col.force_upsert("a".into(), 1).await;

        let Versioned { version, .. } = col.get_versioned(&"a".to_string()).await.unwrap();
        col.compare_and_swap(&"a".to_string(), version, 2).await.unwrap();

        // `version` is now stale; a second writer racing on the same
        // read loses.
        let result = col.compare_and_swap(&"a".to_string(), version, 3).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(col.get(&"a".to_string()).await, Some(2));
    }

    #[tokio::test]
    async fn compare_and_swap_on_a_missing_key_requires_version_zero() {
        let col: MemoryCollection<String, u32> = MemoryCollection::new();
        col.compare_and_swap(&"a".to_string(), 0, 1).await.unwrap();
        assert_eq!(col.get(&"a".to_string()).await, Some(1));
    }
}
