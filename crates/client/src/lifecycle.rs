//! Worker lifecycle: install (precache) and activate (purge stale
//! partitions), driven by an explicit state machine.
//!
//! ```text
//! Unregistered --install--> Installing --ok--> Installed --activate--> Activating --ok--> Activated
//!       ^                       |                  ^                        |
//!       +--------failed---------+                  +---------failed---------+
//! ```

use futures_util::future::try_join_all;
use serde::Serialize;
use url::Url;

use rinkorea_core::{CacheDb, CacheNames, Destination, Error, PartitionKind, WorkerRequest};

use crate::fetch::Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Unregistered,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Activated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Install,
    InstallSucceeded,
    InstallFailed,
    Activate,
    ActivateSucceeded,
    ActivateFailed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Unregistered => "unregistered",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
        }
    }

    /// Apply a lifecycle event.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` for events the state doesn't accept.
    pub fn on(self, event: LifecycleEvent) -> Result<Self, Error> {
        use LifecycleEvent as E;
        use LifecycleState as S;

        match (self, event) {
            (S::Unregistered, E::Install) => Ok(S::Installing),
            (S::Installing, E::InstallSucceeded) => Ok(S::Installed),
            (S::Installing, E::InstallFailed) => Ok(S::Unregistered),
            (S::Installed, E::Activate) => Ok(S::Activating),
            (S::Activating, E::ActivateSucceeded) => Ok(S::Activated),
            (S::Activating, E::ActivateFailed) => Ok(S::Installed),
            (state, event) => {
                Err(Error::InvalidTransition { state: state.as_str().into(), event: format!("{event:?}").to_lowercase() })
            }
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub partition: String,
    pub cached: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
}

/// Precache `manifest` into the static partition.
///
/// All manifest entries are fetched concurrently. A transport failure or a
/// non-2xx status on any of them fails the install and nothing is written.
pub async fn install(
    db: &CacheDb, network: &dyn Network, names: &CacheNames, manifest: &[Url],
) -> Result<InstallReport, Error> {
    let partition = db.open_partition(names.name(PartitionKind::Static)).await?;
    tracing::info!(partition = partition.name(), assets = manifest.len(), "precaching assets");

    let fetches = manifest.iter().map(|url| async move {
        let request = WorkerRequest::get(url.clone()).with_destination(Destination::Empty);
        let response = network
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed(format!("{url}: {e}")))?;

        if !response.is_success() {
            return Err(Error::InstallFailed(format!("{url}: status {}", response.status.as_u16())));
        }

        Ok((request, response))
    });

    let entries = try_join_all(fetches).await?;
    partition.put_all(&entries).await?;

    Ok(InstallReport {
        partition: partition.name().to_string(),
        cached: entries.iter().map(|(request, _)| request.cache_url()).collect(),
    })
}

/// Delete every partition whose name is not in `current`.
pub async fn purge_stale(db: &CacheDb, current: &[&str]) -> Result<ActivateReport, Error> {
    let mut deleted = Vec::new();

    for name in db.partition_names().await? {
        if current.contains(&name.as_str()) {
            continue;
        }

        tracing::info!(partition = %name, "deleting stale partition");
        if db.delete_partition(&name).await? {
            deleted.push(name);
        }
    }

    Ok(ActivateReport { deleted })
}
