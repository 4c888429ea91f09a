//! Core of a content-addressed charm/bundle store: catalog model,
//! ingestion, identifier resolution, publishing, promulgation,
//! resource management, search indexing, and the session pool and
//! background worker that bound concurrent access to it all.
//!
//! This crate is deliberately scoped to the store's in-process core.
//! Everything that would sit in front of it in a deployed server — an
//! HTTP API, macaroon-based auth, audit logging of inbound requests —
//! is out of scope here; `BlobStore` and `SearchBackend` are the two
//! seams a real deployment plugs concrete backends into.

pub mod blob;
pub mod bundle;
pub mod catalog;
pub mod channel;
pub mod charm_source;
pub mod config;
pub mod error;
pub mod id;
pub mod ingest;
pub mod model;
pub mod pool;
pub mod promulgation;
pub mod publisher;
pub mod resolver;
pub mod resources;
pub mod search;
pub mod series;
pub mod worker;

use std::sync::Arc;

use blob::BlobStore;
use catalog::Catalog;
use channel::Channel;
use config::ServerParams;
use error::StoreError;
use id::EntityId;
use model::{Entity, ResourceRecord};
use pool::SessionPool;
use publisher::ResourceRevisions;
use search::{SearchBackend, SearchDoc, SearchQuery};
use worker::Worker;

/// The store's facade: a catalog, a blob backend, a search backend,
/// and the pool/worker pair that bound and drive background access to
/// them. This is what an embedding application constructs once and
/// shares across inbound requests.
pub struct Store {
    pub catalog: Arc<Catalog>,
    pub blobs: Arc<dyn BlobStore>,
    pub search: Arc<dyn SearchBackend>,
    pub pool: SessionPool,
    pub worker: Arc<Worker>,
}

impl Store {
    /// Wires a catalog to the given blob/search backends, sized by
    /// `params`, and starts the background blob GC loop.
    pub fn new(blobs: Arc<dyn BlobStore>, search: Arc<dyn SearchBackend>, params: &ServerParams) -> Self {
        let catalog = Arc::new(Catalog::new());
        let pool = SessionPool::new(params);
        let worker = Arc::new(Worker::new(pool.clone()));
        worker.spawn_blob_gc(catalog.clone(), blobs.clone(), params);

        Store { catalog, blobs, search, pool, worker }
    }

    pub async fn ingest(&self, request: ingest::IngestRequest, bytes: &[u8]) -> Result<Entity, StoreError> {
        ingest::ingest(&self.catalog, self.blobs.as_ref(), request, bytes).await
    }

    pub async fn resolve(&self, query: &EntityId, channel: Option<Channel>) -> Result<Entity, StoreError> {
        resolver::resolve(&self.catalog, query, channel).await
    }

    pub async fn publish(&self, url: &EntityId, resources: &ResourceRevisions, channels: &[Channel]) -> Result<(), StoreError> {
        publisher::publish(&self.catalog, url, resources, channels).await?;
        let entity = self
            .catalog
            .entities
            .get(url)
            .await
            .ok_or_else(|| StoreError::not_found(url.to_string()))?;
        search::update_search(&self.catalog, self.search.as_ref(), &entity.base_url).await
    }

    pub async fn set_promulgated(&self, base_url: &str, on: bool) -> Result<(), StoreError> {
        promulgation::set_promulgated(&self.catalog, base_url, on).await?;
        search::update_search(&self.catalog, self.search.as_ref(), base_url).await
    }

    pub async fn upload_resource(
        &self,
        entity_url: &EntityId,
        name: &str,
        bytes: &[u8],
        expected_hash: &str,
    ) -> Result<ResourceRecord, StoreError> {
        resources::upload_resource(&self.catalog, self.blobs.as_ref(), entity_url, name, bytes, expected_hash).await
    }

    pub async fn resolve_resource(
        &self,
        entity_url: &EntityId,
        name: &str,
        revision: i64,
        channel: Option<Channel>,
    ) -> Result<ResourceRecord, StoreError> {
        resources::resolve_resource(&self.catalog, entity_url, name, revision, channel).await
    }

    pub async fn open_resource_blob(&self, resource: &ResourceRecord) -> Result<Vec<u8>, StoreError> {
        resources::open_resource_blob(self.blobs.as_ref(), resource).await
    }

    pub async fn search(&self, query: &SearchQuery) -> Vec<SearchDoc> {
        self.search.query(query).await
    }

    /// Waits for every in-flight background task (GC sweeps included)
    /// to finish. Intended for graceful shutdown and for tests that
    /// need the GC loop drained before asserting on blob state.
    pub async fn shutdown(&self) {
        self.worker.shutdown().await;
    }
}
