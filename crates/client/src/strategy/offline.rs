//! Synthetic responses returned when the network is unreachable and nothing
//! is cached.

use http::{HeaderMap, HeaderValue, StatusCode, header};

use rinkorea_core::StoredResponse;

pub const OFFLINE_TEXT: &str = "Offline - content not available";

/// Cache-first fallback: plain text, 503.
pub fn offline_text() -> StoredResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    StoredResponse::new(StatusCode::SERVICE_UNAVAILABLE, headers, OFFLINE_TEXT)
}

/// Network-first fallback: `{"error":"Offline"}`, 503, JSON.
pub fn offline_json() -> StoredResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let body = serde_json::json!({ "error": "Offline" }).to_string();
    StoredResponse::new(StatusCode::SERVICE_UNAVAILABLE, headers, body)
}
