//! Caching strategy executors.
//!
//! Each executor answers one intercepted request using the network and the
//! cache registry carried by [`StrategyContext`]. Upstream failures are
//! recovered here (cache fallback or a synthetic offline response); registry
//! failures propagate to the caller.

mod cache_first;
mod network_first;
pub mod offline;
mod stale_while_revalidate;

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use rinkorea_core::{CacheDb, CacheNames, Error, Partition, PartitionKind, StoredResponse, WorkerRequest};

use crate::fetch::Network;

pub use cache_first::cache_first;
pub use network_first::network_first;
pub use stale_while_revalidate::stale_while_revalidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }

    pub async fn execute(
        self, ctx: &StrategyContext, partition: PartitionKind, request: &WorkerRequest,
    ) -> Result<Handled, Error> {
        match self {
            Strategy::CacheFirst => cache_first(ctx, partition, request).await,
            Strategy::NetworkFirst => network_first(ctx, partition, request).await,
            Strategy::StaleWhileRevalidate => stale_while_revalidate(ctx, partition, request).await,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry handle, network and partition names threaded through every
/// executor.
#[derive(Clone)]
pub struct StrategyContext {
    pub db: CacheDb,
    pub network: Arc<dyn Network>,
    pub names: CacheNames,
}

impl StrategyContext {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, names: CacheNames) -> Self {
        Self { db, network, names }
    }

    /// The partition that receives writes for `kind`.
    pub fn partition(&self, kind: PartitionKind) -> Partition {
        self.db.partition(self.names.name(kind))
    }

    /// Look a request up, starting with the partition for `kind`.
    pub async fn lookup(&self, kind: PartitionKind, request: &WorkerRequest) -> Result<Option<StoredResponse>, Error> {
        self.db.match_in(&self.names.lookup_order(kind), request).await
    }
}

/// Where the answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Synthetic response produced because the network was unreachable.
    Offline,
    /// No response could be produced.
    None,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::Offline => "offline",
            ResponseSource::None => "none",
        }
    }
}

/// Result of running a strategy.
#[derive(Debug)]
pub struct Handled {
    /// `None` only when stale-while-revalidate had nothing cached and the
    /// fetch failed; hosts answer with their default network error.
    pub response: Option<StoredResponse>,
    pub source: ResponseSource,
    /// Background refresh spawned by stale-while-revalidate.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Handled {
    pub(crate) fn cached(response: StoredResponse) -> Self {
        Self { response: Some(response), source: ResponseSource::Cache, revalidation: None }
    }

    pub(crate) fn network(response: StoredResponse) -> Self {
        Self { response: Some(response), source: ResponseSource::Network, revalidation: None }
    }

    pub(crate) fn offline(response: StoredResponse) -> Self {
        Self { response: Some(response), source: ResponseSource::Offline, revalidation: None }
    }

    pub(crate) fn none() -> Self {
        Self { response: None, source: ResponseSource::None, revalidation: None }
    }

    /// Wait for the background revalidation, if one was spawned.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.revalidation.take()
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "revalidation task did not complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names() {
        assert_eq!(Strategy::CacheFirst.to_string(), "cache-first");
        assert_eq!(Strategy::NetworkFirst.as_str(), "network-first");
        assert_eq!(serde_json::to_string(&Strategy::StaleWhileRevalidate).unwrap(), "\"stale-while-revalidate\"");
    }

    #[test]
    fn test_handled_constructors() {
        assert_eq!(Handled::none().source, ResponseSource::None);
        assert!(Handled::none().response.is_none());
        let offline = Handled::offline(offline::offline_json());
        assert_eq!(offline.source, ResponseSource::Offline);
        assert!(offline.revalidation.is_none());
    }
}
