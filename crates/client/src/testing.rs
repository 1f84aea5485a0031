//! Scripted [`Network`] used by the worker's tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode, header};
use tokio::sync::Notify;
use url::Url;

use rinkorea_core::{CacheDb, CacheNames, Error, StoredResponse, WorkerRequest};

use crate::fetch::Network;
use crate::strategy::StrategyContext;

#[derive(Debug, Clone)]
pub enum Reply {
    Respond(StoredResponse),
    Fail,
}

pub fn response(status: u16, body: &'static str) -> StoredResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    StoredResponse::new(StatusCode::from_u16(status).unwrap(), headers, Bytes::from_static(body.as_bytes()))
}

pub fn get(url: &str) -> WorkerRequest {
    WorkerRequest::get(Url::parse(url).unwrap())
}

#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, Reply>>,
    fallback: Mutex<Option<Reply>>,
    calls: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockNetwork {
    /// Every request fails.
    pub fn offline() -> Self {
        Self { fallback: Mutex::new(Some(Reply::Fail)), ..Default::default() }
    }

    /// Every request gets `reply` unless routed otherwise.
    pub fn serving(reply: StoredResponse) -> Self {
        Self { fallback: Mutex::new(Some(Reply::Respond(reply))), ..Default::default() }
    }

    pub fn route(self, url: &str, reply: Reply) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), reply);
        self
    }

    pub fn set_fallback(&self, reply: Reply) {
        *self.fallback.lock().unwrap() = Some(reply);
    }

    /// Block every fetch until the returned `Notify` is signalled.
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &WorkerRequest) -> Result<StoredResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = self
            .routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .or_else(|| self.fallback.lock().unwrap().clone())
            .unwrap_or(Reply::Fail);

        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail => Err(Error::HttpError(format!("network error: {} unreachable", request.url))),
        }
    }
}

/// In-memory registry plus the given network, with the default names.
pub async fn context(network: Arc<MockNetwork>) -> StrategyContext {
    let db = CacheDb::open_in_memory().await.unwrap();
    StrategyContext::new(db, network, CacheNames::new("rinkorea", "v1.0.0"))
}
