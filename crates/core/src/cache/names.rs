//! Versioned partition names.
//!
//! Every partition name ends in the configured version, so bumping the
//! version orphans the whole previous set at the next activation.

use serde::{Deserialize, Serialize};

/// Partition categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    /// Unsuffixed application partition (`<prefix>-<version>`).
    Root,
    Static,
    Dynamic,
    Images,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 4] =
        [PartitionKind::Root, PartitionKind::Static, PartitionKind::Dynamic, PartitionKind::Images];
}

/// The current set of versioned partition names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheNames {
    root: String,
    static_assets: String,
    dynamic: String,
    images: String,
}

impl CacheNames {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            root: format!("{prefix}-{version}"),
            static_assets: format!("{prefix}-static-{version}"),
            dynamic: format!("{prefix}-dynamic-{version}"),
            images: format!("{prefix}-images-{version}"),
        }
    }

    pub fn name(&self, kind: PartitionKind) -> &str {
        match kind {
            PartitionKind::Root => &self.root,
            PartitionKind::Static => &self.static_assets,
            PartitionKind::Dynamic => &self.dynamic,
            PartitionKind::Images => &self.images,
        }
    }

    /// All current names, in `PartitionKind::ALL` order.
    pub fn current(&self) -> Vec<&str> {
        PartitionKind::ALL.iter().map(|kind| self.name(*kind)).collect()
    }

    pub fn is_current(&self, name: &str) -> bool {
        PartitionKind::ALL.iter().any(|kind| self.name(*kind) == name)
    }

    /// Partitions searched by a lookup for `kind`: its own partition first,
    /// then the remaining current partitions.
    pub fn lookup_order(&self, kind: PartitionKind) -> Vec<&str> {
        std::iter::once(kind)
            .chain(PartitionKind::ALL.into_iter().filter(|k| *k != kind))
            .map(|k| self.name(k))
            .collect()
    }
}
