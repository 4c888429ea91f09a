//! Resource manager: revisioned blobs attached to a charm's declared
//! resource names, independent of the charm's own archive.

use chrono::Utc;

use crate::blob::{sha384_hex, BlobStore};
use crate::catalog::collection::Collection;
use crate::catalog::Catalog;
use crate::channel::Channel;
use crate::error::StoreError;
use crate::id::EntityId;
use crate::model::{ResourceRecord, PLACEHOLDER_REVISION};
use crate::series::Series;

/// Uploads a new revision of `name` for the charm at `entity_url`,
/// validating that the charm actually declares that resource.
pub async fn upload_resource(
    catalog: &Catalog,
    blobs: &dyn BlobStore,
    entity_url: &EntityId,
    name: &str,
    bytes: &[u8],
    expected_hash: &str,
) -> Result<ResourceRecord, StoreError> {
    let entity = catalog
        .entities
        .get(entity_url)
        .await
        .ok_or_else(|| StoreError::not_found(entity_url.to_string()))?;

    let declares = entity
        .charm_meta
        .as_ref()
        .map(|m| m.resources.contains_key(name))
        .unwrap_or(false);
    if !declares {
        return Err(StoreError::not_found(format!(
            "`{}` declares no resource named `{}`",
            entity.base_url, name
        )));
    }

    let size = bytes.len() as u64;
    blobs.put_content(bytes, expected_hash, size).await?;

    let existing = catalog.resources_for(&entity.base_url, name).await;
    let next_revision = existing
        .iter()
        .filter(|r| !r.is_placeholder())
        .map(|r| r.revision)
        .max()
        .map(|r| r + 1)
        .unwrap_or(0);

    let record = ResourceRecord {
        base_url: entity.base_url.clone(),
        name: name.to_string(),
        revision: next_revision,
        blob_hash: Some(expected_hash.to_string()),
        size: Some(size),
        blob_name: Some(expected_hash.to_string()),
        upload_time: Some(Utc::now()),
    };

    catalog
        .resources
        .force_upsert((entity.base_url.clone(), name.to_string(), next_revision), record.clone())
        .await;

    Ok(record)
}

/// Resolves which revision of `name` a caller sees for `entity_url`
/// under the given `channel` (`None` = latest uploaded, matching spec
/// semantics).
pub async fn resolve_resource(
    catalog: &Catalog,
    entity_url: &EntityId,
    name: &str,
    revision: i64,
    channel: Option<Channel>,
) -> Result<ResourceRecord, StoreError> {
    let entity = catalog
        .entities
        .get(entity_url)
        .await
        .ok_or_else(|| StoreError::not_found(entity_url.to_string()))?;

    if revision >= 0 {
        let key = (entity.base_url.clone(), name.to_string(), revision);
        return catalog
            .resources
            .get(&key)
            .await
            .ok_or_else(|| StoreError::not_found(format!("resource `{}` revision {}", name, revision)));
    }

    if revision != PLACEHOLDER_REVISION {
        return Err(StoreError::InvalidId(format!("invalid resource revision {}", revision)));
    }

    if let Some(channel) = channel {
        let base = catalog
            .base_entities
            .get(&entity.base_url)
            .await
            .ok_or_else(|| StoreError::not_found(entity.base_url.clone()))?;

        let head_series = entity
            .supported_series
            .first()
            .cloned()
            .unwrap_or_else(Series::bundle);

        if let Some(head_url) = base.head_for(channel, &head_series) {
            if let Some(head_entity) = catalog.entities.get(head_url).await {
                let attached = catalog
                    .resources_for(&head_entity.base_url, name)
                    .await
                    .into_iter()
                    .filter(|r| !r.is_placeholder())
                    .max_by_key(|r| r.revision);
                if let Some(r) = attached {
                    return Ok(r);
                }
            }
        }
        return placeholder_or_error(catalog, &entity.base_url, name).await;
    }

    let latest = catalog
        .resources_for(&entity.base_url, name)
        .await
        .into_iter()
        .filter(|r| !r.is_placeholder())
        .max_by_key(|r| r.revision);

    match latest {
        Some(r) => Ok(r),
        None => placeholder_or_error(catalog, &entity.base_url, name).await,
    }
}

async fn placeholder_or_error(catalog: &Catalog, base_url: &str, name: &str) -> Result<ResourceRecord, StoreError> {
    catalog
        .resources
        .get(&(base_url.to_string(), name.to_string(), PLACEHOLDER_REVISION))
        .await
        .ok_or_else(|| StoreError::not_found(format!("no resource `{}` declared for `{}`", name, base_url)))
}

/// Opens the blob backing `resource`. A hash mismatch here means the
/// content-addressed store has been corrupted underneath us.
pub async fn open_resource_blob(blobs: &dyn BlobStore, resource: &ResourceRecord) -> Result<Vec<u8>, StoreError> {
    let hash = resource
        .blob_hash
        .as_ref()
        .ok_or_else(|| StoreError::not_found(format!("resource `{}` has no uploaded blob", resource.name)))?;

    let bytes = blobs.open(&crate::blob::BlobHandle(hash.clone())).await?;
    let actual = sha384_hex(&bytes);
    if &actual != hash {
        return Err(StoreError::HashMismatch {
            what: format!("resource `{}` blob", resource.name),
            expected: hash.clone(),
            actual,
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::charm_source::{Metadata, Resource};
    use crate::model::Entity;
    use std::collections::{BTreeMap, HashMap, HashSet};

    fn charm_entity(url: &str) -> Entity {
        let url: EntityId = url.parse().unwrap();
        let mut resources = HashMap::new();
        resources.insert(
            "image".to_string(),
            Resource::OciImage {
                description: Some("d".into()),
                upstream_source: None,
            },
        );
        Entity {
            base_url: url.base_url(),
            supported_series: vec![url.series.clone().unwrap()],
            charm_meta: Some(Metadata {
                name: "wordpress".into(),
                summary: "s".into(),
                description: "d".into(),
                maintainers: vec![],
                terms: vec![],
                tags: vec![],
                subordinate: false,
                containers: HashMap::new(),
                resources,
                provides: HashMap::new(),
                requires: HashMap::new(),
                peer: HashMap::new(),
                storage: HashMap::new(),
                devices: HashMap::new(),
                extra_bindings: HashMap::new(),
                series: None,
            }),
            url,
            promulgated_url: None,
            promulgated_revision: None,
            blob_hash: "h".into(),
            blob_hash256: "h256".into(),
            size: 1,
            pre_v5_blob_hash: None,
            pre_v5_blob_hash256: None,
            pre_v5_blob_size: None,
            pre_v5_blob_extra_hash: None,
            charm_config: None,
            charm_actions: None,
            charm_provided_interfaces: vec![],
            charm_required_interfaces: vec![],
            bundle_data: None,
            bundle_unit_count: None,
            bundle_machine_count: None,
            contents: BTreeMap::new(),
            published: HashSet::new(),
            extra_info: BTreeMap::new(),
            common_info: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn upload_rejects_an_undeclared_resource() {
        let catalog = Catalog::new();
        let blobs = MemoryBlobStore::new();
        let entity = charm_entity("cs:~charmers/trusty/wordpress-1");
        catalog.insert_entity(entity.clone()).await.unwrap();

        let err = upload_resource(&catalog, &blobs, &entity.url, "nope", b"x", &sha384_hex(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn uploads_start_at_revision_zero_and_increment() {
        let catalog = Catalog::new();
        let blobs = MemoryBlobStore::new();
        let entity = charm_entity("cs:~charmers/trusty/wordpress-1");
        catalog.insert_entity(entity.clone()).await.unwrap();

        let first = upload_resource(&catalog, &blobs, &entity.url, "image", b"one", &sha384_hex(b"one"))
            .await
            .unwrap();
        assert_eq!(first.revision, 0);

        let second = upload_resource(&catalog, &blobs, &entity.url, "image", b"two", &sha384_hex(b"two"))
            .await
            .unwrap();
        assert_eq!(second.revision, 1);
    }

    #[tokio::test]
    async fn resolve_with_no_upload_returns_the_placeholder() {
        let catalog = Catalog::new();
        let entity = charm_entity("cs:~charmers/trusty/wordpress-1");
        catalog.insert_entity(entity.clone()).await.unwrap();
        catalog.ensure_placeholder_resource(&entity.base_url, "image").await.unwrap();

        let resolved = resolve_resource(&catalog, &entity.url, "image", PLACEHOLDER_REVISION, None)
            .await
            .unwrap();
        assert!(resolved.is_placeholder());
    }

    #[tokio::test]
    async fn resolve_latest_after_upload_returns_newest_revision() {
        let catalog = Catalog::new();
        let blobs = MemoryBlobStore::new();
        let entity = charm_entity("cs:~charmers/trusty/wordpress-1");
        catalog.insert_entity(entity.clone()).await.unwrap();
        upload_resource(&catalog, &blobs, &entity.url, "image", b"one", &sha384_hex(b"one")).await.unwrap();
        upload_resource(&catalog, &blobs, &entity.url, "image", b"two", &sha384_hex(b"two")).await.unwrap();

        let resolved = resolve_resource(&catalog, &entity.url, "image", PLACEHOLDER_REVISION, None)
            .await
            .unwrap();
        assert_eq!(resolved.revision, 1);
    }

    #[tokio::test]
    async fn open_resource_blob_round_trips() {
        let catalog = Catalog::new();
        let blobs = MemoryBlobStore::new();
        let entity = charm_entity("cs:~charmers/trusty/wordpress-1");
        catalog.insert_entity(entity.clone()).await.unwrap();
        let record = upload_resource(&catalog, &blobs, &entity.url, "image", b"payload", &sha384_hex(b"payload"))
            .await
            .unwrap();

        let bytes = open_resource_blob(&blobs, &record).await.unwrap();
        assert_eq!(bytes, b"payload");
    }
}
