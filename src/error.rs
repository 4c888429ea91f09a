//! Error taxonomy for the entity store.
//!
//! Each variant carries a stable "cause" that callers match on. Built
//! with `thiserror` rather than a hand-rolled `impl std::error::Error`:
//! `#[from]` conversions and the `#[error("...")]` message format save
//! the boilerplate every other crate in this workspace would otherwise
//! repeat.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("entity already exists: {0}")]
    AlreadyExists(String),

    #[error("hash mismatch for `{what}`: expected {expected}, got {actual}")]
    HashMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("publish resource mismatch: {0}")]
    PublishResourceMismatch(String),

    #[error("too many sessions: pool exhausted after waiting")]
    TooManySessions,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("conflict: optimistic update lost the race on {0}")]
    Conflict(String),

    #[error("fatal: {0}")]
    Fatal(#[from] anyhow::Error),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("catalog has recorded an unrecognized migration: {0}")]
    UnrecognizedMigration(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True for errors a caller may retry unilaterally: optimistic-
    /// concurrency conflicts are recoverable locally; everything else
    /// is surfaced.
    pub fn retriable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        StoreError::NotFound(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
