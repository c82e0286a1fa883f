//! Persistence policy models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// What happens in storage when an account leaves the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrunePolicy {
    /// Leave the last written record as is. A later snapshot load brings the
    /// stale balances back until a new event for the address arrives.
    Retain,
    /// Write the zeroed record; snapshot loads skip inactive records.
    #[default]
    Tombstone,
    /// Remove the record.
    Delete,
}

impl FromStr for PrunePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(PrunePolicy::Retain),
            "tombstone" => Ok(PrunePolicy::Tombstone),
            "delete" => Ok(PrunePolicy::Delete),
            other => Err(Error::InvalidConfigValue(format!(
                "unknown prune policy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PrunePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrunePolicy::Retain => "retain",
            PrunePolicy::Tombstone => "tombstone",
            PrunePolicy::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

/// Counts of storage writes issued by one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub upserted: usize,
    pub tombstoned: usize,
    pub deleted: usize,
}
