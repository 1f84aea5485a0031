//! HTTP handlers: the intercepting fallback plus worker introspection.

use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, header};
use axum::response::Response;
use serde_json::{Value, json};
use url::Url;

use rinkorea_client::fetch::resolve;
use rinkorea_client::{FetchOutcome, WorkerStatus};
use rinkorea_core::{Destination, PartitionStats, StoredResponse, WorkerRequest};

use crate::error::ServerError;
use crate::state::AppState;

/// Response header naming where the answer came from.
pub static SW_SOURCE: HeaderName = HeaderName::from_static("x-sw-source");

const SEC_FETCH_DEST: &str = "sec-fetch-dest";

/// Build the worker's view of an incoming request. Origin-form targets are
/// resolved against the controlled origin; absolute-form targets are kept.
pub fn to_worker_request(origin: &Url, parts: &Parts) -> Result<WorkerRequest, ServerError> {
    let url = resolve(origin, &parts.uri.to_string()).map_err(|e| ServerError::BadRequest(format!("{}: {e}", parts.uri)))?;

    let destination = parts
        .headers
        .get(SEC_FETCH_DEST)
        .and_then(|value| value.to_str().ok())
        .map(Destination::from_fetch_dest)
        .unwrap_or_default();

    Ok(WorkerRequest { method: parts.method.clone(), url, headers: parts.headers.clone(), destination })
}

fn into_http(response: StoredResponse, source: &'static str) -> Response {
    let StoredResponse { status, mut headers, body } = response;
    headers.remove(header::CONTENT_LENGTH);
    headers.insert(SW_SOURCE.clone(), HeaderValue::from_static(source));

    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

/// Fallback for every path: let the worker answer, or forward upstream.
pub async fn intercept(State(state): State<AppState>, request: Request) -> Result<Response, ServerError> {
    let (parts, body) = request.into_parts();
    let worker_request = to_worker_request(&state.origin, &parts)?;

    match state.worker.handle_fetch(&worker_request).await? {
        FetchOutcome::PassThrough(reason) => {
            let body = to_bytes(body, state.max_body)
                .await
                .map_err(|e| ServerError::BadRequest(format!("request body: {e}")))?;

            tracing::debug!(url = %worker_request.url, ?reason, "forwarding");
            let response = state
                .upstream
                .forward(&worker_request, body)
                .await
                .map_err(|e| ServerError::Upstream(e.to_string()))?;

            Ok(into_http(response, "passthrough"))
        }
        FetchOutcome::Handled(handled) => {
            let source = handled.source.as_str();
            match handled.response {
                Some(response) => Ok(into_http(response, source)),
                None => Err(ServerError::Upstream(format!("no response for {}", worker_request.url))),
            }
        }
    }
}

/// `GET /__sw/status`
pub async fn status(State(state): State<AppState>) -> Result<Json<WorkerStatus>, ServerError> {
    Ok(Json(state.worker.status().await?))
}

/// `GET /__sw/cache-size`
pub async fn cache_size(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    let size = state.worker.cache_size().await?;
    Ok(Json(json!({ "type": "CACHE_SIZE", "size": size })))
}

/// `GET /__sw/partitions`
pub async fn partitions(State(state): State<AppState>) -> Result<Json<Vec<PartitionStats>>, ServerError> {
    Ok(Json(state.worker.partition_stats().await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use axum::http::{Method, StatusCode};
    use bytes::Bytes;
    use http::HeaderMap;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::build_router;
    use rinkorea_client::{FetchClient, FetchConfig, Network, PassReason, ServiceWorker};
    use rinkorea_core::{AppConfig, CacheDb, Error};

    /// Answers 200 with a fixed body until switched off.
    struct Upstream {
        offline: AtomicBool,
    }

    #[async_trait]
    impl Network for Upstream {
        async fn fetch(&self, request: &WorkerRequest) -> Result<StoredResponse, Error> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::HttpError(format!("network error: {} unreachable", request.url)));
            }
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("4"));
            Ok(StoredResponse::new(StatusCode::OK, headers, Bytes::from_static(b"body")))
        }
    }

    async fn state(register: bool) -> (AppState, Arc<Upstream>) {
        // Nothing listens on port 1, so forwarded requests fail.
        let config = AppConfig { origin: "http://127.0.0.1:1".into(), ..Default::default() };
        let network = Arc::new(Upstream { offline: AtomicBool::new(false) });
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = Arc::new(ServiceWorker::new(db, network.clone(), &config).unwrap());
        if register {
            worker.register().await.unwrap();
        }

        let upstream = Arc::new(FetchClient::new(FetchConfig::from(&config)).unwrap());
        (AppState::new(worker, upstream, config.origin_url().unwrap(), 1024), network)
    }

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_to_worker_request_resolves_origin_form() {
        let origin = Url::parse("https://rinkorea.com").unwrap();
        let (parts, _) = Request::builder()
            .uri("/images/logo.png?v=2")
            .header(SEC_FETCH_DEST, "image")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let request = to_worker_request(&origin, &parts).unwrap();
        assert_eq!(request.url.as_str(), "https://rinkorea.com/images/logo.png?v=2");
        assert_eq!(request.destination, Destination::Image);
        assert_eq!(request.method, Method::GET);
    }

    #[test]
    fn test_to_worker_request_keeps_absolute_form() {
        let origin = Url::parse("https://rinkorea.com").unwrap();
        let (parts, _) = get("https://abc.supabase.co/rest/v1/products").into_parts();

        let request = to_worker_request(&origin, &parts).unwrap();
        assert_eq!(request.url.host_str(), Some("abc.supabase.co"));
        assert_eq!(request.destination, Destination::Empty);
    }

    #[test]
    fn test_to_worker_request_origin_form_with_url_in_query() {
        let origin = Url::parse("https://rinkorea.com").unwrap();
        let (parts, _) = get("/login?next=https://rinkorea.com/shop").into_parts();

        let request = to_worker_request(&origin, &parts).unwrap();
        assert_eq!(request.url.host_str(), Some("rinkorea.com"));
        assert_eq!(request.url.path(), "/login");
        assert_eq!(request.url.query(), Some("next=https://rinkorea.com/shop"));
    }

    #[tokio::test]
    async fn test_non_http_scheme_reaches_router_gate() {
        let (state, _) = state(true).await;
        let (parts, _) = get("ftp://files.rinkorea.com/catalog.pdf").into_parts();

        let request = to_worker_request(&state.origin, &parts).unwrap();
        assert_eq!(request.url.scheme(), "ftp");
        assert!(matches!(
            state.worker.handle_fetch(&request).await.unwrap(),
            FetchOutcome::PassThrough(PassReason::Scheme)
        ));
    }

    #[tokio::test]
    async fn test_origin_form_with_url_in_query_is_intercepted() {
        let (state, _) = state(true).await;

        let response = build_router(state).oneshot(get("/login?next=https://rinkorea.com/shop")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(&SW_SOURCE).unwrap(), "network");
    }

    #[test]
    fn test_into_http_sets_source_and_drops_length() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("99"));
        let response = into_http(StoredResponse::new(StatusCode::ACCEPTED, headers, "ok"), "cache");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get(&SW_SOURCE).unwrap(), "cache");
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
    }

    #[tokio::test]
    async fn test_image_served_from_network_then_cache() {
        let (state, _) = state(true).await;
        let app = build_router(state);

        let first = app.clone().oneshot(get("/images/logo.png")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers().get(&SW_SOURCE).unwrap(), "network");

        let second = app.oneshot(get("/images/logo.png")).await.unwrap();
        assert_eq!(second.headers().get(&SW_SOURCE).unwrap(), "cache");
        assert_eq!(second.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    }

    #[tokio::test]
    async fn test_backend_offline_returns_json_503() {
        let (state, network) = state(true).await;
        network.offline.store(true, Ordering::SeqCst);

        let response = build_router(state)
            .oneshot(get("https://abc.supabase.co/rest/v1/products"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(&SW_SOURCE).unwrap(), "offline");
        assert_eq!(json_body(response).await, json!({ "error": "Offline" }));
    }

    #[tokio::test]
    async fn test_unregistered_worker_forwards_and_reports_502() {
        let (state, _) = state(false).await;

        let response = build_router(state).oneshot(get("/images/logo.png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("UPSTREAM_FAILED"));
    }

    #[tokio::test]
    async fn test_cache_size_message() {
        let (state, _) = state(true).await;

        let response = build_router(state).oneshot(get("/__sw/cache-size")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "type": "CACHE_SIZE", "size": 24 }));
    }

    #[tokio::test]
    async fn test_status_and_partitions() {
        let (state, _) = state(true).await;
        let app = build_router(state);

        let status = json_body(app.clone().oneshot(get("/__sw/status")).await.unwrap()).await;
        assert_eq!(status["state"], "activated");
        assert_eq!(status["clients_claimed"], true);
        assert_eq!(status["routes"][0]["name"], "static");
        assert_eq!(status["routes"][0]["strategy"], "cache-first");

        let partitions = json_body(app.oneshot(get("/__sw/partitions")).await.unwrap()).await;
        assert_eq!(partitions[0]["name"], "rinkorea-static-v1.0.0");
        assert_eq!(partitions[0]["entries"], 6);
    }
}
