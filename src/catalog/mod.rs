//! Typed accessors over the document collections, plus the secondary
//! indexes the resolver, publisher, and search indexer all rely on
//! (by `baseURL`, by `promulgatedURL`, by blob hash, by declared
//! relation interface, and the unique `(baseURL, name, revision)`
//! compound key on resources).

pub mod collection;
pub mod migrations;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::channel::Channel;
use crate::error::StoreError;
use crate::id::EntityId;
use crate::model::{BaseEntity, Entity, LogEntry, MigrationRecord, ResourceRecord, StatTokens, PLACEHOLDER_REVISION};
use crate::series::Series;
use collection::{Collection, MemoryCollection};

/// Unique compound key for the resources collection.
pub type ResourceKey = (String, String, i64);

pub struct Catalog {
    pub entities: MemoryCollection<EntityId, Entity>,
    pub base_entities: MemoryCollection<String, BaseEntity>,
    pub resources: MemoryCollection<ResourceKey, ResourceRecord>,
    pub logs: MemoryCollection<u64, LogEntry>,
    pub migrations: MemoryCollection<(), MigrationRecord>,

    stat_tokens: RwLock<StatTokens>,
    stat_counters: RwLock<BTreeMap<(u64, i64), u64>>,

    next_log_id: AtomicU64,

    by_base_url: RwLock<BTreeMap<String, BTreeSet<EntityId>>>,
    by_promulgated_url: RwLock<BTreeMap<String, EntityId>>,
    by_blob_hash: RwLock<BTreeMap<String, EntityId>>,
    by_provided_interface: RwLock<BTreeMap<String, BTreeSet<EntityId>>>,
    by_required_interface: RwLock<BTreeMap<String, BTreeSet<EntityId>>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            entities: MemoryCollection::new(),
            base_entities: MemoryCollection::new(),
            resources: MemoryCollection::new(),
            logs: MemoryCollection::new(),
            migrations: MemoryCollection::new(),
            stat_tokens: RwLock::new(StatTokens::new()),
            stat_counters: RwLock::new(BTreeMap::new()),
            next_log_id: AtomicU64::new(0),
            by_base_url: RwLock::new(BTreeMap::new()),
            by_promulgated_url: RwLock::new(BTreeMap::new()),
            by_blob_hash: RwLock::new(BTreeMap::new()),
            by_provided_interface: RwLock::new(BTreeMap::new()),
            by_required_interface: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a brand-new entity: a
    /// duplicate primary key is reported as already-existing rather
    /// than silently overwritten.
    pub async fn insert_entity(&self, entity: Entity) -> Result<(), StoreError> {
        if self.entities.contains_key(&entity.url).await {
            return Err(StoreError::AlreadyExists(entity.url.to_string()));
        }

        self.index_entity(&entity).await;
        self.entities.force_upsert(entity.url.clone(), entity).await;
        Ok(())
    }

    async fn index_entity(&self, entity: &Entity) {
        self.by_base_url
            .write()
            .await
            .entry(entity.base_url.clone())
            .or_default()
            .insert(entity.url.clone());

        if let Some(promulgated) = &entity.promulgated_url {
            self.by_promulgated_url
                .write()
                .await
                .insert(promulgated.to_string(), entity.url.clone());
        }

        self.by_blob_hash
            .write()
            .await
            .insert(entity.blob_hash.clone(), entity.url.clone());

        for iface in &entity.charm_provided_interfaces {
            self.by_provided_interface
                .write()
                .await
                .entry(iface.clone())
                .or_default()
                .insert(entity.url.clone());
        }
        for iface in &entity.charm_required_interfaces {
            self.by_required_interface
                .write()
                .await
                .entry(iface.clone())
                .or_default()
                .insert(entity.url.clone());
        }
    }

    pub async fn entities_by_base_url(&self, base_url: &str) -> Vec<Entity> {
        let Some(urls) = self.by_base_url.read().await.get(base_url).cloned() else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(urls.len());
        for url in urls {
            if let Some(e) = self.entities.get(&url).await {
                out.push(e);
            }
        }
        out
    }

    /// Every entity whose base URL is `~<any user>/<name>`, used by the
    /// resolver's "no user, no series" promulgated-name lookup.
    pub async fn entities_by_name(&self, name: &str) -> Vec<Entity> {
        let suffix = format!("/{}", name);
        let base_urls: Vec<String> = self
            .by_base_url
            .read()
            .await
            .keys()
            .filter(|b| b.ends_with(&suffix))
            .cloned()
            .collect();

        let mut out = Vec::new();
        for base_url in base_urls {
            out.extend(self.entities_by_base_url(&base_url).await);
        }
        out
    }

    pub async fn entity_by_promulgated_url(&self, url: &str) -> Option<Entity> {
        let owned = self.by_promulgated_url.read().await.get(url).cloned()?;
        self.entities.get(&owned).await
    }

    /// Finds an existing entity sharing a blob hash, so ingestion can
    /// share storage for byte-identical pre-v5 variants.
    pub async fn entity_by_blob_hash(&self, hash: &str) -> Option<Entity> {
        let url = self.by_blob_hash.read().await.get(hash).cloned()?;
        self.entities.get(&url).await
    }

    /// Reads the base entity for `~user/name`, creating it with
    /// owner-only ACLs on every channel if it doesn't exist yet.
    pub async fn ensure_base_entity(&self, user: &str, name: &str) -> Result<BaseEntity, StoreError> {
        let base_url = format!("~{}/{}", user, name);
        if let Some(existing) = self.base_entities.get(&base_url).await {
            return Ok(existing);
        }

        let fresh = BaseEntity::new(user, name);
        match self.base_entities.compare_and_swap(&base_url, 0, fresh.clone()).await {
            Ok(_) => Ok(fresh),
            // Another concurrent ingestion created it first; use theirs.
            Err(StoreError::Conflict(_)) => Ok(self
                .base_entities
                .get(&base_url)
                .await
                .expect("base entity must exist after a lost race to create it")),
            Err(other) => Err(other),
        }
    }

    /// Retries `f` against the current base entity until the
    /// compare-and-swap succeeds, matching the "second writer re-reads
    /// and retries" ordering guarantee for publish/promulgation.
    pub async fn update_base_entity<F>(&self, base_url: &str, mut f: F) -> Result<BaseEntity, StoreError>
    where
        F: FnMut(&mut BaseEntity),
    {
        const MAX_ATTEMPTS: u32 = 32;
        for _ in 0..MAX_ATTEMPTS {
            let versioned = self
                .base_entities
                .get_versioned(&base_url.to_string())
                .await
                .ok_or_else(|| StoreError::not_found(base_url.to_string()))?;

            let mut next = versioned.value.clone();
            f(&mut next);

            match self
                .base_entities
                .compare_and_swap(&base_url.to_string(), versioned.version, next.clone())
                .await
            {
                Ok(_) => return Ok(next),
                Err(StoreError::Conflict(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(StoreError::Conflict(base_url.to_string()))
    }

    /// Retries `f` against the current entity until the
    /// compare-and-swap succeeds.
    pub async fn update_entity<F>(&self, url: &EntityId, mut f: F) -> Result<Entity, StoreError>
    where
        F: FnMut(&mut Entity),
    {
        const MAX_ATTEMPTS: u32 = 32;
        for _ in 0..MAX_ATTEMPTS {
            let versioned = self
                .entities
                .get_versioned(url)
                .await
                .ok_or_else(|| StoreError::not_found(url.to_string()))?;

            let mut next = versioned.value.clone();
            f(&mut next);

            match self.entities.compare_and_swap(url, versioned.version, next.clone()).await {
                Ok(_) => return Ok(next),
                Err(StoreError::Conflict(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(StoreError::Conflict(url.to_string()))
    }

    /// Inserts a placeholder resource row `(baseURL, name, -1)` if
    /// none exists yet.
    pub async fn ensure_placeholder_resource(&self, base_url: &str, name: &str) -> Result<(), StoreError> {
        let key: ResourceKey = (base_url.to_string(), name.to_string(), PLACEHOLDER_REVISION);
        if self.resources.contains_key(&key).await {
            return Ok(());
        }
        self.resources
            .force_upsert(key, ResourceRecord::placeholder(base_url, name))
            .await;
        Ok(())
    }

    pub async fn resources_for(&self, base_url: &str, name: &str) -> Vec<ResourceRecord> {
        self.resources
            .all_entries()
            .await
            .into_iter()
            .filter(|((b, n, _), _)| b == base_url && n == name)
            .map(|(_, v)| v)
            .collect()
    }

    pub async fn declared_resource_names(&self, base_url: &str) -> BTreeSet<String> {
        self.resources
            .all_entries()
            .await
            .into_iter()
            .filter(|((b, _, _), _)| b == base_url)
            .map(|((_, n, _), _)| n)
            .collect()
    }

    pub async fn append_log(&self, entry: LogEntry) -> u64 {
        let id = self.next_log_id.fetch_add(1, Ordering::SeqCst);
        self.logs.force_upsert(id, entry).await;
        id
    }

    pub async fn intern_stat_token(&self, token: &str) -> u64 {
        self.stat_tokens.write().await.intern(token)
    }

    /// Fire-and-forget counter increment:
    /// commutative, safe to reorder across concurrent tasks.
    pub async fn incr_counter(&self, token_id: u64, minute_bucket: i64, delta: u64) {
        let mut counters = self.stat_counters.write().await;
        *counters.entry((token_id, minute_bucket)).or_insert(0) += delta;
    }

    pub async fn counter_value(&self, token_id: u64, minute_bucket: i64) -> u64 {
        *self.stat_counters.read().await.get(&(token_id, minute_bucket)).unwrap_or(&0)
    }

    /// Bumps the download counter for `key` (an entity URL) in the
    /// current minute bucket. Best-effort: stats are advisory, so a
    /// caller never fails a resolve over a counter write.
    pub async fn record_download(&self, key: &str) {
        let token_id = self.intern_stat_token(&format!("downloads:{key}")).await;
        let bucket = chrono::Utc::now().timestamp() / 60;
        self.incr_counter(token_id, bucket, 1).await;
    }

    /// Sums every minute bucket recorded for `key`'s download counter.
    pub async fn download_count(&self, key: &str) -> u64 {
        let token_id = self.intern_stat_token(&format!("downloads:{key}")).await;
        self.stat_counters.read().await.iter().filter(|((id, _), _)| *id == token_id).map(|(_, v)| *v).sum()
    }

    /// Live blob hashes referenced by any entity (canonical + pre-v5)
    /// or non-placeholder resource — the set blob GC must keep.
    pub async fn referenced_blob_hashes(&self) -> BTreeSet<String> {
        let mut live = BTreeSet::new();
        for entity in self.entities.all().await {
            live.insert(entity.blob_hash);
            if let Some(h) = entity.pre_v5_blob_hash {
                live.insert(h);
            }
        }
        for resource in self.resources.all().await {
            if let Some(h) = resource.blob_hash {
                live.insert(h);
            }
        }
        live
    }

    /// `true` when `series` is in the channel heads for `channel` on
    /// a published entity — used to check that base-entity channel
    /// heads stay consistent with each entity's own `published` set.
    pub async fn is_consistent_head(&self, base_url: &str, channel: Channel, series: &Series) -> bool {
        let Some(base) = self.base_entities.get(&base_url.to_string()).await else {
            return true;
        };
        let Some(head_url) = base.head_for(channel, series) else {
            return true;
        };
        match self.entities.get(head_url).await {
            Some(e) => e.is_published_to(channel) && e.supported_series.contains(series),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap as StdBTreeMap, HashSet};

    fn sample_entity(url: &str) -> Entity {
        let url: EntityId = url.parse().unwrap();
        Entity {
            base_url: url.base_url(),
            url,
            promulgated_url: None,
            promulgated_revision: None,
            blob_hash: "hash".into(),
            blob_hash256: "hash256".into(),
            size: 10,
            pre_v5_blob_hash: None,
            pre_v5_blob_hash256: None,
            pre_v5_blob_size: None,
            pre_v5_blob_extra_hash: None,
            supported_series: vec![],
            charm_meta: None,
            charm_config: None,
            charm_actions: None,
            charm_provided_interfaces: vec![],
            charm_required_interfaces: vec![],
            bundle_data: None,
            bundle_unit_count: None,
            bundle_machine_count: None,
            contents: StdBTreeMap::new(),
            published: HashSet::new(),
            extra_info: StdBTreeMap::new(),
            common_info: StdBTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn duplicate_primary_key_is_already_exists() {
        let catalog = Catalog::new();
        catalog.insert_entity(sample_entity("cs:~charmers/trusty/wordpress-23")).await.unwrap();

        let err = catalog
            .insert_entity(sample_entity("cs:~charmers/trusty/wordpress-23"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn ensure_base_entity_is_idempotent() {
        let catalog = Catalog::new();
        let first = catalog.ensure_base_entity("charmers", "wordpress").await.unwrap();
        let second = catalog.ensure_base_entity("charmers", "wordpress").await.unwrap();
        assert_eq!(first.url, second.url);
        assert_eq!(catalog.base_entities.len().await, 1);
    }
}
