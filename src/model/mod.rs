//! The catalog's on-disk representation: entities, base entities,
//! resources, channel metadata, stats tokens, and logs.

pub mod base_entity;
pub mod entity;
pub mod log;
pub mod migration;
pub mod resource;
pub mod stats;

pub use base_entity::{BaseEntity, Perm};
pub use entity::{Entity, ZipEntryCoords};
pub use log::{LogEntry, LogLevel};
pub use migration::MigrationRecord;
pub use resource::{ResourceRecord, PLACEHOLDER_REVISION};
pub use stats::StatTokens;
