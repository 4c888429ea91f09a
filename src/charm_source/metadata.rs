use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::container::Container;
use super::device::Device;
use super::relation::Relation;
use super::resource::Resource;
use super::storage::Storage;

/// A charm's metadata.yaml file
///
/// See https://juju.is/docs/sdk/metadata-reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Metadata {
    /// The name of the charm
    ///
    /// Determines URL in Charmhub and the name administrators will ultimately use to deploy the
    /// charm. E.g. `juju deploy <name>`
    pub name: String,

    /// A short, one-line description of the charm
    pub summary: String,

    /// A full description of the configuration layer
    pub description: String,

    /// A list of maintainers in the format "First Last <email>"
    #[serde(default)]
    pub maintainers: Vec<String>,

    /// A list of terms that any charm user must agree with
    #[serde(default)]
    pub terms: Vec<String>,

    /// Free-form categorization keywords shown on a charm's listing
    /// and searched against as both `tags` and the legacy `categories`
    /// filter name.
    #[serde(default)]
    pub tags: Vec<String>,

    /// True if the charm is meant to be deployed as a subordinate to a principal charm
    #[serde(default)]
    pub subordinate: bool,

    /// A map of containers to be created adjacent to the charm.
    ///
    /// This field is required when the charm is targeting Kubernetes, where each of the specified
    /// containers will be created as sidecars to the charm in the same pod.
    #[serde(default)]
    pub containers: HashMap<String, Container>,

    /// Additional resources that accompany the charm
    ///
    /// Each key represents the name of the resource
    #[serde(default)]
    pub resources: HashMap<String, Resource>,

    /// Map of relations provided by this charm
    ///
    /// Each key represents the name of the relation as known by this charm
    #[serde(default)]
    pub provides: HashMap<String, Relation>,

    /// Map of relations required by this charm
    ///
    /// Each key represents the name of the relation as known by this charm
    #[serde(default)]
    pub requires: HashMap<String, Relation>,

    /// Mutual relations between units/peers of this charm
    ///
    /// Each key represents the name of the relation as known by this charm
    #[serde(default)]
    pub peer: HashMap<String, Relation>,

    /// Storage requests for the charm
    ///
    /// Each key represents the name of the storage
    #[serde(default)]
    pub storage: HashMap<String, Storage>,

    /// Device requests for the charm, for example a GPU
    ///
    /// Each key represents the name of the device
    #[serde(default)]
    pub devices: HashMap<String, Device>,

    /// Extra bindings for the charm
    ///
    /// For example binding extra network interfaces. Key only map, value must be blank. Key
    /// represents the name
    #[serde(default)]
    pub extra_bindings: HashMap<String, ()>,

    /// If set, Juju magically determines that the charm is using v1 metadata
    #[serde(default)]
    pub series: Option<Vec<String>>,
}

impl Metadata {
    /// `true` when this charm declares its own supported series (a
    /// "multi-series" charm), rather than relying on
    /// the series fragment of the identifier it was ingested under.
    pub fn is_multi_series(&self) -> bool {
        self.series.is_some()
    }

    /// Names of relations this charm provides ('s
    /// `charmProvidedInterfaces`).
    pub fn provided_interfaces(&self) -> Vec<&str> {
        self.provides.values().map(|r| r.interface.as_str()).collect()
    }

    /// Names of relations this charm requires ('s
    /// `charmRequiredInterfaces`).
    pub fn required_interfaces(&self) -> Vec<&str> {
        self.requires.values().map(|r| r.interface.as_str()).collect()
    }

    /// Produces the legacy ("pre-v5") rendition of this metadata for
    /// clients that cannot parse modern multi-series metadata
    ///: the
    /// `series` field, which only exists so multi-series charms can
    /// self-declare, is stripped since the legacy wire format has no
    /// concept of it.
    ///
    /// Returns `None` when the legacy rendition would be
    /// byte-for-byte identical to the modern one (single-series
    /// charms, whose metadata never sets `series` in the first
    /// place) — callers use this to share blob storage by hash.
    pub fn to_legacy(&self) -> Option<Metadata> {
        if self.series.is_none() {
            return None;
        }

        let mut legacy = self.clone();
        legacy.series = None;
        Some(legacy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_metadata() -> Metadata {
        Metadata {
            name: "wordpress".into(),
            summary: "A blog".into(),
            description: "A blog engine".into(),
            maintainers: vec![],
            terms: vec![],
            tags: vec![],
            subordinate: false,
            containers: HashMap::new(),
            resources: HashMap::new(),
            provides: HashMap::new(),
            requires: HashMap::new(),
            peer: HashMap::new(),
            storage: HashMap::new(),
            devices: HashMap::new(),
            extra_bindings: HashMap::new(),
            series: None,
        }
    }

    #[test]
    fn single_series_charm_has_no_legacy_variant() {
        assert_eq!(base_metadata().to_legacy(), None);
    }

    #[test]
    fn multi_series_charm_strips_series_for_legacy() {
        let mut meta = base_metadata();
        meta.series = Some(vec!["trusty".into(), "xenial".into()]);

        let legacy = meta.to_legacy().unwrap();
        assert_eq!(legacy.series, None);
        assert_eq!(legacy.name, meta.name);
        assert!(meta.is_multi_series());
        assert!(!legacy.is_multi_series());
    }
}
