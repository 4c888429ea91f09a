//! Content-addressed blob storage, modeled as the capability set the
//! core actually consumes rather than a concrete backend: `put`,
//! `open`, multipart upload with a later `set_owner`, and a
//! GC sweep over unreferenced/unowned blobs.
//!
//! `MemoryBlobStore` is the one implementation in this workspace — an
//! in-process content-addressed map. Hashing uses `sha2` (SHA-384 for
//! the primary handle, matching the wire format's blob hash).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha384};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

/// A content-addressed handle: the hex-encoded SHA-384 of the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobHandle(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadId(pub String);

pub fn sha384_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha384::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `bytes`, verifying them against `expected_hash`/
    /// `expected_size` first — a mismatch is fatal to whatever
    /// ingest produced it and the bytes are not linked.
    async fn put_content(
        &self,
        bytes: &[u8],
        expected_hash: &str,
        expected_size: u64,
    ) -> Result<BlobHandle, StoreError>;

    /// Starts a multipart upload, returning an id the caller must
    /// later hand to `set_owner` or let GC reclaim.
    async fn put_multipart(&self, parts: Vec<Vec<u8>>, expected_hash: &str) -> Result<UploadId, StoreError>;

    /// Attaches an owner reference and expiry to a completed upload,
    /// promoting it to a durable, content-addressed blob.
    async fn set_owner(
        &self,
        upload_id: &UploadId,
        owner_ref: &str,
        expiry: DateTime<Utc>,
    ) -> Result<BlobHandle, StoreError>;

    async fn open(&self, handle: &BlobHandle) -> Result<Vec<u8>, StoreError>;

    /// Removes every blob older than `cutoff` that is both unowned and
    /// not reported live by `is_referenced` — the sweep the
    /// background worker's GC loop drives.
    async fn delete_unreferenced(
        &self,
        cutoff: DateTime<Utc>,
        is_referenced: &(dyn Fn(&str) -> bool + Send + Sync),
    ) -> usize;
}

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    owner: Option<String>,
    created_at: DateTime<Utc>,
    #[allow(dead_code)]
    expiry: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
    uploads: RwLock<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_content(
        &self,
        bytes: &[u8],
        expected_hash: &str,
        expected_size: u64,
    ) -> Result<BlobHandle, StoreError> {
        let actual_hash = sha384_hex(bytes);
        if actual_hash != expected_hash {
            return Err(StoreError::HashMismatch {
                what: "blob content".into(),
                expected: expected_hash.to_string(),
                actual: actual_hash,
            });
        }
        if bytes.len() as u64 != expected_size {
            return Err(StoreError::HashMismatch {
                what: "blob size".into(),
                expected: expected_size.to_string(),
                actual: bytes.len().to_string(),
            });
        }

        self.blobs.write().await.insert(
            actual_hash.clone(),
            StoredBlob {
                bytes: bytes.to_vec(),
                owner: None,
                created_at: Utc::now(),
                expiry: None,
            },
        );
        Ok(BlobHandle(actual_hash))
    }

    async fn put_multipart(&self, parts: Vec<Vec<u8>>, expected_hash: &str) -> Result<UploadId, StoreError> {
        let bytes: Vec<u8> = parts.into_iter().flatten().collect();
        let actual_hash = sha384_hex(&bytes);
        if actual_hash != expected_hash {
            return Err(StoreError::HashMismatch {
                what: "multipart upload".into(),
                expected: expected_hash.to_string(),
                actual: actual_hash,
            });
        }

        let upload_id = Uuid::new_v4().to_string();
        self.blobs.write().await.insert(
            actual_hash.clone(),
            StoredBlob {
                bytes,
                owner: None,
                created_at: Utc::now(),
                expiry: None,
            },
        );
        self.uploads.write().await.insert(upload_id.clone(), actual_hash);
        Ok(UploadId(upload_id))
    }

    async fn set_owner(
        &self,
        upload_id: &UploadId,
        owner_ref: &str,
        expiry: DateTime<Utc>,
    ) -> Result<BlobHandle, StoreError> {
        let hash = self
            .uploads
            .read()
            .await
            .get(&upload_id.0)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("upload `{}`", upload_id.0)))?;

        let mut blobs = self.blobs.write().await;
        let blob = blobs
            .get_mut(&hash)
            .ok_or_else(|| StoreError::not_found(format!("blob `{}`", hash)))?;
        blob.owner = Some(owner_ref.to_string());
        blob.expiry = Some(expiry);

        Ok(BlobHandle(hash))
    }

    async fn open(&self, handle: &BlobHandle) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .read()
            .await
            .get(&handle.0)
            .map(|b| b.bytes.clone())
            .ok_or_else(|| StoreError::not_found(format!("blob `{}`", handle.0)))
    }

    async fn delete_unreferenced(
        &self,
        cutoff: DateTime<Utc>,
        is_referenced: &(dyn Fn(&str) -> bool + Send + Sync),
    ) -> usize {
        let mut blobs = self.blobs.write().await;
        let doomed: Vec<String> = blobs
            .iter()
            .filter(|(hash, blob)| blob.owner.is_none() && blob.created_at < cutoff && !is_referenced(hash))
            .map(|(hash, _)| hash.clone())
            .collect();

        for hash in &doomed {
            blobs.remove(hash);
        }
        doomed.len()
    }
}
