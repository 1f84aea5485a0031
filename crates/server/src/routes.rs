use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the host router: worker introspection under `/__sw/`, everything
/// else goes through the worker.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/__sw/status", get(handler::status))
        .route("/__sw/cache-size", get(handler::cache_size))
        .route("/__sw/partitions", get(handler::partitions))
        .fallback(handler::intercept)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
