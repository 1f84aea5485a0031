//! Structured errors for the worker host.
//!
//! Cache registry failures and missing upstream responses both surface as
//! 502, the closest HTTP analogue of a failed fetch.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use rinkorea_core::Error;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The request could not be turned into a worker request.
    #[error("INVALID_INPUT: {0}")]
    BadRequest(String),

    /// Neither the worker nor the upstream produced a response.
    #[error("UPSTREAM_FAILED: {0}")]
    Upstream(String),

    #[error(transparent)]
    Worker(#[from] Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Upstream(_) | ServerError::Worker(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
