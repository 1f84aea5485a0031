//! Request routing: decide whether to intercept a request and which
//! strategy answers it.
//!
//! Classification is an ordered table of (predicate, strategy, partition)
//! routes evaluated top to bottom; the first match wins. The default table:
//!
//! | route   | matches                                        | strategy               | partition |
//! |---------|------------------------------------------------|------------------------|-----------|
//! | static  | `/assets/`, js/mjs/css/fonts                   | cache-first            | static    |
//! | image   | `/images/`, image destination, image extension | cache-first            | images    |
//! | api     | backend host, `/api/` prefix                   | network-first          | dynamic   |
//! | default | everything else                                | stale-while-revalidate | dynamic   |

pub mod predicates;

use http::Method;
use serde::Serialize;
use url::Url;

use rinkorea_core::{PartitionKind, WorkerRequest};

use crate::fetch::same_origin;
use crate::strategy::Strategy;

/// Inputs shared by every predicate.
#[derive(Debug, Clone)]
pub struct RouteContext {
    origin: Url,
    backend_host: String,
}

impl RouteContext {
    pub fn new(origin: Url, backend_host: impl Into<String>) -> Self {
        Self { origin, backend_host: backend_host.into().to_lowercase() }
    }

    pub fn is_backend_host(&self, host: &str) -> bool {
        host.to_lowercase().contains(&self.backend_host)
    }
}

pub type Predicate = fn(&RouteContext, &WorkerRequest) -> bool;

/// One row of the routing table.
#[derive(Clone, Copy)]
pub struct Route {
    pub name: &'static str,
    pub predicate: Predicate,
    pub strategy: Strategy,
    pub partition: PartitionKind,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("partition", &self.partition)
            .finish()
    }
}

/// Serializable view of a route, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub name: &'static str,
    pub strategy: Strategy,
    pub partition: PartitionKind,
}

impl From<&Route> for RouteInfo {
    fn from(route: &Route) -> Self {
        Self { name: route.name, strategy: route.strategy, partition: route.partition }
    }
}

/// Why a request was left to the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    /// Not a GET.
    Method,
    /// Not http(s).
    Scheme,
    /// Another origin that isn't the backend host.
    CrossOrigin,
    /// No route in the table matched.
    Unrouted,
}

#[derive(Debug, Clone, Copy)]
pub enum Decision<'a> {
    PassThrough(PassReason),
    Route(&'a Route),
}

/// The default routing table.
pub fn default_routes() -> Vec<Route> {
    vec![
        Route {
            name: "static",
            predicate: predicates::is_static_asset,
            strategy: Strategy::CacheFirst,
            partition: PartitionKind::Static,
        },
        Route {
            name: "image",
            predicate: predicates::is_image,
            strategy: Strategy::CacheFirst,
            partition: PartitionKind::Images,
        },
        Route {
            name: "api",
            predicate: predicates::is_api,
            strategy: Strategy::NetworkFirst,
            partition: PartitionKind::Dynamic,
        },
        Route {
            name: "default",
            predicate: predicates::any,
            strategy: Strategy::StaleWhileRevalidate,
            partition: PartitionKind::Dynamic,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct Router {
    context: RouteContext,
    routes: Vec<Route>,
}

impl Router {
    /// Router with the default table.
    pub fn new(context: RouteContext) -> Self {
        Self::with_routes(context, default_routes())
    }

    pub fn with_routes(context: RouteContext, routes: Vec<Route>) -> Self {
        Self { context, routes }
    }

    pub fn context(&self) -> &RouteContext {
        &self.context
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Classify a request. The gates run before the table: only same-origin
    /// (or backend host) http(s) GETs are intercepted.
    pub fn classify(&self, request: &WorkerRequest) -> Decision<'_> {
        if request.method != Method::GET {
            return Decision::PassThrough(PassReason::Method);
        }

        if !matches!(request.url.scheme(), "http" | "https") {
            return Decision::PassThrough(PassReason::Scheme);
        }

        let backend = request.url.host_str().is_some_and(|host| self.context.is_backend_host(host));
        if !backend && !same_origin(&request.url, &self.context.origin) {
            return Decision::PassThrough(PassReason::CrossOrigin);
        }

        self.routes
            .iter()
            .find(|route| (route.predicate)(&self.context, request))
            .map_or(Decision::PassThrough(PassReason::Unrouted), Decision::Route)
    }
}
