//! One row per `(baseURL, name, revision)`, as tracked by the
//! resource manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `revision = -1` marks a placeholder: the charm declares the
/// resource but nothing has been uploaded yet.
pub const PLACEHOLDER_REVISION: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRecord {
    pub base_url: String,
    pub name: String,
    pub revision: i64,

    /// Absent for placeholder rows.
    pub blob_hash: Option<String>,
    pub size: Option<u64>,
    /// Opaque blob-store handle.
    pub blob_name: Option<String>,
    pub upload_time: Option<DateTime<Utc>>,
}

impl ResourceRecord {
    pub fn placeholder(base_url: &str, name: &str) -> Self {
        ResourceRecord {
            base_url: base_url.to_string(),
            name: name.to_string(),
            revision: PLACEHOLDER_REVISION,
            blob_hash: None,
            size: None,
            blob_name: None,
            upload_time: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.revision == PLACEHOLDER_REVISION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_has_no_blob() {
        let r = ResourceRecord::placeholder("~charmers/wordpress", "resource1");
        assert!(r.is_placeholder());
        assert!(r.blob_hash.is_none());
    }
}
