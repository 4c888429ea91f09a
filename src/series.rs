//! Supported-series identifiers.
//!
//! Generalized to a validated newtype rather than a closed enum of
//! specific OS releases, since the grammar only requires "a dashed
//! lowercase string, with the reserved value `bundle`". Reuses the
//! same kebab-case validation rule as identifier names (alphanumeric,
//! dashes not at the start/end).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The reserved series value that marks an entity as a bundle rather
/// than a charm: `series == "bundle"` means the entity is a bundle,
/// anything else means it's a charm.
pub const BUNDLE: &str = "bundle";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series(String);

impl Series {
    pub fn new(s: impl Into<String>) -> Result<Self, StoreError> {
        let s = s.into();
        if !is_valid_series(&s) {
            return Err(StoreError::InvalidId(format!(
                "invalid series `{}`: must be dashed lowercase",
                s
            )));
        }
        Ok(Series(s))
    }

    pub fn bundle() -> Self {
        Series(BUNDLE.to_string())
    }

    pub fn is_bundle(&self) -> bool {
        self.0 == BUNDLE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Starts and ends with an alphanumeric character, interior dashes
/// allowed.
fn is_valid_series(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let bytes = s.as_bytes();
    let valid_char = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !valid_char(bytes[0]) || !valid_char(*bytes.last().unwrap()) {
        return false;
    }
    bytes.iter().all(|&b| valid_char(b) || b == b'-')
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Series {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Series::new(s)
    }
}
