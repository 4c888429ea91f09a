//! One row per immutable charm/bundle upload.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;
use crate::channel::Channel;
use crate::charm_source::{Config, Metadata};
use crate::id::EntityId;
use crate::series::Series;

/// Cached zip-entry coordinates for a well-known archive member (icon,
/// readme, ...), populated lazily the first time an entity is opened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZipEntryCoords {
    pub offset: u64,
    pub size: u64,
}

/// One immutable charm-or-bundle revision.
///
/// Entities are append-only: ingestion creates them, and nothing
/// mutates them afterward except the denormalized fields named below
/// (promulgation pointers, the contents cache, extra/common info, and
/// the published-channel set).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    /// Fully qualified owned URL; primary key.
    pub url: EntityId,
    /// Derived `~user/name`.
    pub base_url: String,

    /// Set iff this revision is the current promulgated projection for
    /// its base name.
    pub promulgated_url: Option<EntityId>,
    pub promulgated_revision: Option<u32>,

    /// SHA-384/SHA-256/size of the canonical (post-v5) archive bytes.
    pub blob_hash: String,
    pub blob_hash256: String,
    pub size: u64,

    /// The legacy-client archive variant. May share bytes (and hence
    /// hashes) with the canonical blob when byte-identical.
    pub pre_v5_blob_hash: Option<String>,
    pub pre_v5_blob_hash256: Option<String>,
    pub pre_v5_blob_size: Option<u64>,
    pub pre_v5_blob_extra_hash: Option<String>,

    /// For single-series charms: `[series]`. For multi-series charms:
    /// from the parsed metadata. For bundles: empty.
    pub supported_series: Vec<Series>,

    pub charm_meta: Option<Metadata>,
    pub charm_config: Option<Config>,
    pub charm_actions: Option<serde_yaml::Value>,
    pub charm_provided_interfaces: Vec<String>,
    pub charm_required_interfaces: Vec<String>,

    pub bundle_data: Option<Bundle>,
    pub bundle_unit_count: Option<u32>,
    pub bundle_machine_count: Option<usize>,

    /// Well-known file id (e.g. `"icon.svg"`) → cached coordinates.
    #[serde(default)]
    pub contents: BTreeMap<String, ZipEntryCoords>,

    /// Channels in which this exact revision has ever been the head.
    #[serde(default)]
    pub published: HashSet<Channel>,

    #[serde(default)]
    pub extra_info: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub common_info: BTreeMap<String, serde_json::Value>,
}

impl Entity {
    pub fn is_bundle(&self) -> bool {
        self.bundle_data.is_some()
    }

    pub fn is_charm(&self) -> bool {
        self.charm_meta.is_some()
    }

    /// `true` when this exact revision is currently the head of
    /// `channel` for at least one series. Kept in sync with the base
    /// entity's `channel_entities`.
    pub fn is_published_to(&self, channel: Channel) -> bool {
        self.published.contains(&channel)
    }
}
