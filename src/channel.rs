//! Release channels.
//!
//! Adds `rank()` for the resolver's tie-break order and a legacy-name
//! mapping: the old wire name `development` is translated to `Edge`
//! on read. The on-disk/legacy name is not rewritten, only translated
//! at parse time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    Unpublished,
    Edge,
    Beta,
    Candidate,
    Stable,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Unpublished,
        Channel::Edge,
        Channel::Beta,
        Channel::Candidate,
        Channel::Stable,
    ];

    /// Channels that `publish` may target. `Unpublished`
    /// is never a publication destination.
    pub const PUBLISHABLE: [Channel; 4] =
        [Channel::Edge, Channel::Beta, Channel::Candidate, Channel::Stable];

    /// Ordinal rank used by the resolver's tie-break order: higher rank
    /// wins when no channel is requested.
    pub fn rank(&self) -> u8 {
        match self {
            Channel::Unpublished => 0,
            Channel::Edge => 1,
            Channel::Beta => 2,
            Channel::Candidate => 3,
            Channel::Stable => 4,
        }
    }

    pub fn is_publishable(&self) -> bool {
        Self::PUBLISHABLE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Unpublished => "unpublished",
            Channel::Edge => "edge",
            Channel::Beta => "beta",
            Channel::Candidate => "candidate",
            Channel::Stable => "stable",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Channel> for &'static str {
    fn from(ch: Channel) -> &'static str {
        ch.as_str()
    }
}

impl FromStr for Channel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpublished" => Ok(Channel::Unpublished),
            // Legacy wire name, translated on read only.
            "development" => Ok(Channel::Edge),
            "edge" => Ok(Channel::Edge),
            "beta" => Ok(Channel::Beta),
            "candidate" => Ok(Channel::Candidate),
            "stable" => Ok(Channel::Stable),
            other => Err(StoreError::InvalidId(format!("unknown channel `{}`", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_increase_toward_stable() {
        let ranks: Vec<u8> = Channel::ALL.iter().map(Channel::rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn legacy_development_maps_to_edge() {
        assert_eq!("development".parse::<Channel>().unwrap(), Channel::Edge);
    }

    #[test]
    fn unpublished_is_not_publishable() {
        assert!(!Channel::Unpublished.is_publishable());
        for ch in Channel::PUBLISHABLE {
            assert!(ch.is_publishable());
        }
    }

    #[test]
    fn round_trips_through_display() {
        for ch in Channel::ALL {
            assert_eq!(ch.to_string().parse::<Channel>().unwrap(), ch);
        }
    }
}
