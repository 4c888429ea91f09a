//! Timestamped audit log entries.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::id::EntityId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    #[serde(rename = "type")]
    pub kind: String,
    pub urls: Vec<EntityId>,
}

impl LogEntry {
    pub fn new(level: LogLevel, kind: impl Into<String>, urls: Vec<EntityId>, now: DateTime<Utc>) -> Self {
        LogEntry {
            timestamp: now,
            level,
            kind: kind.into(),
            urls,
        }
    }

    /// Every URL expanded to also include its base URL, de-duplicated
    /// in iteration order.
    pub fn expanded_urls(&self) -> Vec<String> {
        let mut seen = IndexSet::new();
        for url in &self.urls {
            seen.insert(url.to_string());
            if url.user.is_some() {
                seen.insert(url.base_url());
            }
        }
        seen.into_iter().collect()
    }
}
