//! Archive validation through placeholder-resource creation: the one
//! path that turns uploaded bytes into a durable entity.

use std::io::{Cursor, Read as _, Write as _};
use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::ZipArchive;

use crate::blob::{sha384_hex, BlobStore};
use crate::bundle::Bundle;
use crate::catalog::Catalog;
use crate::charm_source::{CharmSource, Metadata, BUNDLE_MANIFEST, CHARM_MANIFEST};
use crate::error::StoreError;
use crate::id::EntityId;
use crate::model::Entity;

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// What an archive turned out to contain once step 1 has run.
enum Manifest {
    Charm(CharmSource),
    Bundle(Bundle),
}

fn read_manifest(bytes: &[u8]) -> Result<Manifest, StoreError> {
    if let Some(charm) = CharmSource::load_zip(bytes)? {
        return Ok(Manifest::Charm(charm));
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut zf = archive
        .by_name(BUNDLE_MANIFEST)
        .map_err(|_| StoreError::InvalidId("archive has neither metadata.yaml nor bundle.yaml".to_string()))?;
    let mut buf = Vec::new();
    zf.read_to_end(&mut buf)?;
    Ok(Manifest::Bundle(Bundle::load(&buf)?))
}

/// Re-serializes `bytes` with `metadata.yaml` replaced by `legacy`,
/// byte for byte otherwise — used to produce the pre-v5 archive
/// variant without re-deriving every other zip member.
fn rezip_with_legacy_metadata(bytes: &[u8], legacy: &Metadata) -> Result<Vec<u8>, StoreError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let legacy_yaml = serde_yaml::to_vec(legacy)?;

    let mut out = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut out));
        let opts = FileOptions::default();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            writer.start_file(&name, opts)?;
            if name == CHARM_MANIFEST {
                writer.write_all(&legacy_yaml)?;
            } else {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf)?;
                writer.write_all(&buf)?;
            }
        }
        writer.finish()?;
    }
    Ok(out)
}

/// Everything ingestion needs beyond the archive bytes: the owned URL
/// being published into, and the optional promulgated projection of
/// it, already decided by the caller. Resolving a promulgation slot is
/// the promulgation module's job, not ingestion's.
pub struct IngestRequest {
    pub url: EntityId,
    pub promulgated_url: Option<EntityId>,
}

/// Runs the full archive-to-entity pipeline, returning the inserted
/// entity.
pub async fn ingest(
    catalog: &Arc<Catalog>,
    blobs: &dyn BlobStore,
    request: IngestRequest,
    bytes: &[u8],
) -> Result<Entity, StoreError> {
    let IngestRequest { url, promulgated_url } = request;
    let user = url.user.clone().ok_or_else(|| StoreError::InvalidId("ingest requires an owned URL".to_string()))?;

    let manifest = read_manifest(bytes)?;

    let blob_hash = sha384_hex(bytes);
    let blob_hash256 = sha256_hex(bytes);
    let size = bytes.len() as u64;
    blobs.put_content(bytes, &blob_hash, size).await?;

    let (supported_series, charm_meta, charm_config, charm_provided, charm_required, bundle_data, unit_count, machine_count) =
        match &manifest {
            Manifest::Charm(charm) => {
                let supported_series = if charm.metadata.is_multi_series() {
                    charm
                        .metadata
                        .series
                        .clone()
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|s| crate::series::Series::new(s).ok())
                        .collect()
                } else {
                    url.series.clone().into_iter().collect()
                };
                let provided = charm.metadata.provided_interfaces().into_iter().map(String::from).collect();
                let required = charm.metadata.required_interfaces().into_iter().map(String::from).collect();
                (
                    supported_series,
                    Some(charm.metadata.clone()),
                    charm.config.clone(),
                    provided,
                    required,
                    None,
                    None,
                    None,
                )
            }
            Manifest::Bundle(bundle) => {
                let counts = bundle.counts();
                (
                    Vec::new(),
                    None,
                    None,
                    Vec::new(),
                    Vec::new(),
                    Some(bundle.clone()),
                    Some(counts.unit_count),
                    Some(counts.machine_count),
                )
            }
        };

    let (pre_v5_hash, pre_v5_hash256, pre_v5_size, pre_v5_extra_hash) = if let Manifest::Charm(charm) = &manifest {
        match charm.metadata.to_legacy() {
            Some(legacy) => {
                let legacy_bytes = rezip_with_legacy_metadata(bytes, &legacy)?;
                let legacy_hash = sha384_hex(&legacy_bytes);
                if legacy_hash == blob_hash {
                    (None, None, None, None)
                } else {
                    let legacy_hash256 = sha256_hex(&legacy_bytes);
                    let legacy_size = legacy_bytes.len() as u64;
                    blobs.put_content(&legacy_bytes, &legacy_hash, legacy_size).await?;
                    (Some(legacy_hash), Some(legacy_hash256), Some(legacy_size), Some(blob_hash.clone()))
                }
            }
            None => (None, None, None, None),
        }
    } else {
        (None, None, None, None)
    };

    catalog.ensure_base_entity(&user, &url.name).await?;

    let entity = Entity {
        base_url: url.base_url(),
        url: url.clone(),
        promulgated_url: promulgated_url.clone(),
        promulgated_revision: promulgated_url.as_ref().and_then(|p| p.revision),
        blob_hash,
        blob_hash256,
        size,
        pre_v5_blob_hash: pre_v5_hash,
        pre_v5_blob_hash256: pre_v5_hash256,
        pre_v5_blob_size: pre_v5_size,
        pre_v5_blob_extra_hash: pre_v5_extra_hash,
        supported_series,
        charm_meta,
        charm_config,
        charm_actions: None,
        charm_provided_interfaces: charm_provided,
        charm_required_interfaces: charm_required,
        bundle_data,
        bundle_unit_count: unit_count,
        bundle_machine_count: machine_count,
        contents: Default::default(),
        published: Default::default(),
        extra_info: Default::default(),
        common_info: Default::default(),
    };

    catalog.insert_entity(entity.clone()).await?;

    if let Manifest::Charm(charm) = &manifest {
        for name in charm.metadata.resources.keys() {
            catalog.ensure_placeholder_resource(&entity.base_url, name).await?;
        }
    }

    catalog
        .append_log(crate::model::LogEntry::new(
            crate::model::LogLevel::Info,
            "ingest",
            vec![entity.url.clone()],
            Utc::now(),
        ))
        .await;

    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use std::io::Write as _;

    fn archive_with(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let opts = FileOptions::default();
            for (name, contents) in files {
                zip.start_file(*name, opts).unwrap();
                zip.write_all(contents.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[tokio::test]
    async fn ingesting_a_charm_creates_base_entity_and_placeholders() {
        let catalog = Arc::new(Catalog::new());
        let blobs = MemoryBlobStore::new();
        let bytes = archive_with(&[(
            CHARM_MANIFEST,
            "name: wordpress\nsummary: s\ndescription: d\nresources:\n  image:\n    type: oci-image\n    description: d\n    upstream-source: busybox\n",
        )]);

        let url: EntityId = "cs:~charmers/trusty/wordpress-1".parse().unwrap();
        let entity = ingest(&catalog, &blobs, IngestRequest { url: url.clone(), promulgated_url: None }, &bytes)
            .await
            .unwrap();

        assert_eq!(entity.url, url);
        assert!(catalog.base_entities.contains_key(&"~charmers/wordpress".to_string()).await);
        let resources = catalog.resources_for("~charmers/wordpress", "image").await;
        assert_eq!(resources.len(), 1);
        assert!(resources[0].is_placeholder());
    }

    #[tokio::test]
    async fn duplicate_ingest_is_already_exists() {
        let catalog = Arc::new(Catalog::new());
        let blobs = MemoryBlobStore::new();
        let bytes = archive_with(&[(CHARM_MANIFEST, "name: wordpress\nsummary: s\ndescription: d\n")]);
        let url: EntityId = "cs:~charmers/trusty/wordpress-1".parse().unwrap();

        ingest(&catalog, &blobs, IngestRequest { url: url.clone(), promulgated_url: None }, &bytes)
            .await
            .unwrap();
        let err = ingest(&catalog, &blobs, IngestRequest { url, promulgated_url: None }, &bytes)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn ingesting_a_bundle_computes_machine_and_unit_counts() {
        let catalog = Arc::new(Catalog::new());
        let blobs = MemoryBlobStore::new();
        let bundle_yaml = "applications:\n  mysql:\n    num_units: 1\n    to: [\"new\"]\n";
        let bytes = archive_with(&[("bundle.yaml", bundle_yaml)]);

        let url: EntityId = "cs:~charmers/bundle/mysql-single-1".parse().unwrap();
        let entity = ingest(&catalog, &blobs, IngestRequest { url, promulgated_url: None }, &bytes)
            .await
            .unwrap();

        assert_eq!(entity.bundle_unit_count, Some(1));
        assert_eq!(entity.bundle_machine_count, Some(1));
        assert!(entity.is_bundle());
    }
}
