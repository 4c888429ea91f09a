//! One row per `~user/name`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::id::EntityId;
use crate::series::Series;

/// Read/write group lists for a single channel ACL entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Perm {
    pub read: Vec<String>,
    pub write: Vec<String>,
}

impl Perm {
    /// The default ACL a base entity is created with: only its owner
    /// may read or write.
    pub fn owner_only(user: &str) -> Self {
        Perm {
            read: vec![user.to_string()],
            write: vec![user.to_string()],
        }
    }
}

/// The `~user/name` root under which entity revisions accumulate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaseEntity {
    pub url: String,
    pub user: String,
    pub name: String,

    /// At most one base entity per `name` may have this set.
    pub promulgated: bool,

    pub channel_acls: BTreeMap<Channel, Perm>,

    /// `(channel, series)` → the entity URL currently the head there.
    pub channel_entities: BTreeMap<Channel, BTreeMap<Series, EntityId>>,

    #[serde(default)]
    pub common_info: BTreeMap<String, serde_json::Value>,
}

impl BaseEntity {
    /// A freshly created base entity: default ACLs replicated across
    /// every channel, nothing published yet.
    pub fn new(user: &str, name: &str) -> Self {
        let acl = Perm::owner_only(user);
        let channel_acls = Channel::ALL.iter().map(|&ch| (ch, acl.clone())).collect();

        BaseEntity {
            url: format!("~{}/{}", user, name),
            user: user.to_string(),
            name: name.to_string(),
            promulgated: false,
            channel_acls,
            channel_entities: BTreeMap::new(),
            common_info: BTreeMap::new(),
        }
    }

    pub fn head_for(&self, channel: Channel, series: &Series) -> Option<&EntityId> {
        self.channel_entities.get(&channel)?.get(series)
    }

    pub fn set_head(&mut self, channel: Channel, series: Series, url: EntityId) {
        self.channel_entities.entry(channel).or_default().insert(series, url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_base_entity_grants_owner_only_acls_on_every_channel() {
        let base = BaseEntity::new("charmers", "wordpress");
        assert_eq!(base.channel_acls.len(), Channel::ALL.len());
        for perm in base.channel_acls.values() {
            assert_eq!(perm.read, vec!["charmers"]);
            assert_eq!(perm.write, vec!["charmers"]);
        }
        assert!(!base.promulgated);
        assert!(base.channel_entities.is_empty());
    }
}
