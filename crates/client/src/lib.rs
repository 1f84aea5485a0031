//! Worker logic for the rinkorea offline cache.
//!
//! This crate provides the upstream fetch client, the request router, the
//! caching strategies and the worker lifecycle shared by the server and CLI.

pub mod fetch;
pub mod lifecycle;
pub mod router;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use lifecycle::{ActivateReport, InstallReport, LifecycleEvent, LifecycleState};
pub use router::{Decision, PassReason, Route, RouteContext, RouteInfo, Router};
pub use strategy::{Handled, ResponseSource, Strategy, StrategyContext};
pub use worker::{FetchOutcome, ServiceWorker, WorkerStatus};
