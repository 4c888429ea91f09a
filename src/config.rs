//! Process-wide configuration, loaded once at startup instead of kept
//! as scattered globals.
//!
//! `Settings::from_env()` merges defaults with `CHARMSTORE_`-prefixed
//! environment variables via the `config` crate, the same
//! `config::Environment::with_prefix` idiom used for service
//! configuration throughout the rest of this stack. The loaded value
//! is published once through a `OnceCell` rather than re-read per
//! request.

use std::time::Duration;

use config::{Config as ConfigSource, ConfigError, Environment};
use once_cell::sync::OnceCell;
use serde::Deserialize;

/// Parameters a `Store` is constructed with — the collapsed
/// replacement for any process-wide mutable globals (e.g. a
/// `legacy_download_counts_enabled` flag).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerParams {
    /// Maximum number of concurrently held catalog sessions.
    pub max_sessions: u32,
    /// How long `requestStore()` blocks before giving up with
    /// `TooManySessions`.
    pub max_wait_millis: u64,
    /// How often the background worker's blob GC loop runs.
    pub gc_interval_secs: u64,
    /// Blobs/uploads younger than this are never collected, win or
    /// lose any race with an in-flight ingest that hasn't linked them
    /// yet.
    pub gc_cutoff_secs: u64,
    /// Whether to keep incrementing the legacy per-minute stats
    /// counters alongside the search backend's own download counts.
    pub legacy_download_counts_enabled: bool,
    /// The logical name search queries are issued against; the
    /// indexer resolves it through the alias/version document.
    pub search_index_alias: String,
}

impl Default for ServerParams {
    fn default() -> Self {
        ServerParams {
            max_sessions: 64,
            max_wait_millis: 5_000,
            gc_interval_secs: 3600,
            gc_cutoff_secs: 24 * 3600,
            legacy_download_counts_enabled: true,
            search_index_alias: "charmstore".to_string(),
        }
    }
}

impl ServerParams {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_millis)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }

    pub fn gc_cutoff(&self) -> Duration {
        Duration::from_secs(self.gc_cutoff_secs)
    }
}

static SETTINGS: OnceCell<ServerParams> = OnceCell::new();

pub struct Settings;

impl Settings {
    /// Loads `ServerParams` from `ServerParams::default()` layered
    /// with `CHARMSTORE_*` environment variables, e.g.
    /// `CHARMSTORE_MAX_SESSIONS=128`.
    pub fn from_env() -> Result<ServerParams, ConfigError> {
        let defaults = ServerParams::default();
        let source = ConfigSource::builder()
            .set_default("max_sessions", defaults.max_sessions)?
            .set_default("max_wait_millis", defaults.max_wait_millis)?
            .set_default("gc_interval_secs", defaults.gc_interval_secs)?
            .set_default("gc_cutoff_secs", defaults.gc_cutoff_secs)?
            .set_default("legacy_download_counts_enabled", defaults.legacy_download_counts_enabled)?
            .set_default("search_index_alias", defaults.search_index_alias)?
            .add_source(Environment::with_prefix("CHARMSTORE"))
            .build()?;

        source.try_deserialize()
    }

    /// Loads once and publishes the result for the lifetime of the
    /// process; subsequent calls return the already-loaded value.
    pub fn global() -> &'static ServerParams {
        SETTINGS.get_or_init(|| Self::from_env().unwrap_or_default())
    }
}
