use std::sync::Arc;

use url::Url;

use rinkorea_client::{FetchClient, ServiceWorker};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<ServiceWorker>,
    /// Forwards requests the worker leaves alone.
    pub upstream: Arc<FetchClient>,
    /// Base for origin-form request targets.
    pub origin: Arc<Url>,
    /// Largest request body accepted for forwarding.
    pub max_body: usize,
}

impl AppState {
    pub fn new(worker: Arc<ServiceWorker>, upstream: Arc<FetchClient>, origin: Url, max_body: usize) -> Self {
        Self { worker, upstream, origin: Arc::new(origin), max_body }
    }
}
