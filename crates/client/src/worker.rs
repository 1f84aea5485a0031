//! The service worker: lifecycle state plus request interception.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use rinkorea_core::{AppConfig, CacheDb, CacheNames, Error, PartitionStats, WorkerRequest};

use crate::fetch::{Network, resolve};
use crate::lifecycle::{self, ActivateReport, InstallReport, LifecycleEvent, LifecycleState};
use crate::router::{Decision, PassReason, RouteContext, RouteInfo, Router};
use crate::strategy::{Handled, StrategyContext};

/// What the worker did with a request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted; the host forwards it unchanged.
    PassThrough(PassReason),
    Handled(Handled),
}

/// Snapshot reported by hosts.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: LifecycleState,
    pub clients_claimed: bool,
    pub partitions: Vec<String>,
    pub routes: Vec<RouteInfo>,
}

pub struct ServiceWorker {
    ctx: StrategyContext,
    router: Router,
    manifest: Vec<Url>,
    state: RwLock<LifecycleState>,
    clients_claimed: AtomicBool,
}

impl ServiceWorker {
    /// Build an unregistered worker from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin or a precache path cannot be
    /// resolved.
    pub fn new(db: CacheDb, network: Arc<dyn Network>, config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let manifest = config
            .precache
            .iter()
            .map(|path| resolve(&origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let names = CacheNames::new(&config.cache_prefix, &config.cache_version);
        let router = Router::new(RouteContext::new(origin, config.backend_host.clone()));

        Ok(Self {
            ctx: StrategyContext::new(db, network, names),
            router,
            manifest,
            state: RwLock::new(LifecycleState::Unregistered),
            clients_claimed: AtomicBool::new(false),
        })
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    pub fn names(&self) -> &CacheNames {
        &self.ctx.names
    }

    pub fn db(&self) -> &CacheDb {
        &self.ctx.db
    }

    pub fn routes(&self) -> Vec<RouteInfo> {
        self.router.routes().iter().map(RouteInfo::from).collect()
    }

    pub fn manifest(&self) -> &[Url] {
        &self.manifest
    }

    /// Run the install event: precache the manifest.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(LifecycleEvent::Install).await?;

        match lifecycle::install(&self.ctx.db, self.ctx.network.as_ref(), &self.ctx.names, &self.manifest).await {
            Ok(report) => {
                self.transition(LifecycleEvent::InstallSucceeded).await?;
                tracing::info!(partition = %report.partition, cached = report.cached.len(), "install complete");
                Ok(report)
            }
            Err(e) => {
                self.transition(LifecycleEvent::InstallFailed).await?;
                tracing::warn!(error = %e, "install failed");
                Err(e)
            }
        }
    }

    /// Run the activate event: purge stale partitions, then claim clients.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(LifecycleEvent::Activate).await?;

        match lifecycle::purge_stale(&self.ctx.db, &self.ctx.names.current()).await {
            Ok(report) => {
                self.transition(LifecycleEvent::ActivateSucceeded).await?;
                self.clients_claimed.store(true, Ordering::SeqCst);
                tracing::info!(deleted = report.deleted.len(), "activated and claimed clients");
                Ok(report)
            }
            Err(e) => {
                self.transition(LifecycleEvent::ActivateFailed).await?;
                tracing::warn!(error = %e, "activate failed");
                Err(e)
            }
        }
    }

    /// Apply one event. The lock is held only for the state change, never
    /// across the fetches or registry work of a phase.
    async fn transition(&self, event: LifecycleEvent) -> Result<LifecycleState, Error> {
        let mut state = self.state.write().await;
        *state = state.on(event)?;
        tracing::info!(state = %*state, ?event, "lifecycle transition");
        Ok(*state)
    }

    /// Install and activate immediately, skipping the waiting phase.
    pub async fn register(&self) -> Result<(InstallReport, ActivateReport), Error> {
        let installed = self.install().await?;
        let activated = self.activate().await?;
        Ok((installed, activated))
    }

    /// Answer an intercepted request.
    ///
    /// # Errors
    ///
    /// Only cache registry failures are returned; upstream failures are
    /// recovered by the strategies.
    pub async fn handle_fetch(&self, request: &WorkerRequest) -> Result<FetchOutcome, Error> {
        if !self.is_controlling().await {
            return Ok(FetchOutcome::PassThrough(PassReason::Unrouted));
        }

        match self.router.classify(request) {
            Decision::PassThrough(reason) => {
                tracing::debug!(url = %request.url, ?reason, "passing request through");
                Ok(FetchOutcome::PassThrough(reason))
            }
            Decision::Route(route) => {
                tracing::debug!(url = %request.url, route = route.name, strategy = %route.strategy, "intercepted");
                let handled = route.strategy.execute(&self.ctx, route.partition, request).await?;
                Ok(FetchOutcome::Handled(handled))
            }
        }
    }

    /// Total stored body bytes across all partitions.
    pub async fn cache_size(&self) -> Result<u64, Error> {
        self.ctx.db.total_size().await
    }

    pub async fn partition_stats(&self) -> Result<Vec<PartitionStats>, Error> {
        self.ctx.db.partition_stats().await
    }

    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        Ok(WorkerStatus {
            state: self.state().await,
            clients_claimed: self.clients_claimed.load(Ordering::SeqCst),
            partitions: self.ctx.db.partition_names().await?,
            routes: self.routes(),
        })
    }

    async fn is_controlling(&self) -> bool {
        self.state().await == LifecycleState::Activated && self.clients_claimed.load(Ordering::SeqCst)
    }
}
