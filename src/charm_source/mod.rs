pub mod config;
pub mod container;
pub mod device;
pub mod metadata;
pub mod relation;
pub mod resource;
pub mod storage;

pub use config::{Config, ConfigOption};
pub use container::{BaseContainer, Container, ContainerBase, ContainerMount, ResourceContainer};
pub use metadata::Metadata;
pub use relation::{Relation, RelationScope};
pub use resource::Resource;
pub use storage::Storage;

use std::collections::HashMap;
use std::io::{Cursor, Read as _};

use serde::{Deserialize, Serialize};
use serde_yaml::from_slice;
use zip::ZipArchive;

use crate::error::StoreError;

/// The name a bundle's definition is stored under inside an archive,
/// distinguishing it from a charm: an archive contains either
/// `metadata.yaml` or `bundle.yaml`, never both.
pub const BUNDLE_MANIFEST: &str = "bundle.yaml";
pub const CHARM_MANIFEST: &str = "metadata.yaml";
const CONFIG_MANIFEST: &str = "config.yaml";

/// A charm's metadata and config, as read out of an uploaded archive.
///
/// The only input is the archive bytes an ingestion request uploaded,
/// so there is no source directory to remember and no build/pack step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CharmSource {
    pub config: Option<Config>,
    pub metadata: Metadata,
}

impl CharmSource {
    /// Reads `metadata.yaml` and `config.yaml` out of a zip archive.
    /// Returns `Ok(None)` when the archive has no `metadata.yaml` at
    /// its root — the caller tries the bundle path next.
    pub fn load_zip(bytes: &[u8]) -> Result<Option<Self>, StoreError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        if archive.by_name(CHARM_MANIFEST).is_err() {
            return Ok(None);
        }

        let metadata = {
            let mut zf = archive.by_name(CHARM_MANIFEST)?;
            let mut buf = Vec::new();
            zf.read_to_end(&mut buf)?;
            from_slice(&buf)?
        };

        let config: Option<Config> = match archive.by_name(CONFIG_MANIFEST) {
            Ok(mut zf) => {
                let mut buf = Vec::new();
                zf.read_to_end(&mut buf)?;
                from_slice(&buf)?
            }
            Err(_) => None,
        };

        Ok(Some(Self { config, metadata }))
    }

    /// Merges a caller-supplied resource map (e.g. a bundle's per-
    /// application `resources:` block) with this charm's declared
    /// defaults, erroring when a declared resource has neither a
    /// supplied value nor a default.
    pub fn resources_with_defaults(
        &self,
        configured: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, StoreError> {
        self.metadata
            .resources
            .iter()
            .map(|(k, v)| -> Result<(String, String), StoreError> {
                if let Some(c) = configured.get(k) {
                    return Ok((k.clone(), c.clone()));
                }

                match v {
                    Resource::OciImage {
                        upstream_source: Some(us),
                        ..
                    } => Ok((k.clone(), us.clone())),
                    _ => Err(StoreError::not_found(format!(
                        "resource `{}` declared by `{}` has no default and none was supplied",
                        k, self.metadata.name
                    ))),
                }
            })
            .collect()
    }
}
