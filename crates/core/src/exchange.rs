//! Request and response types exchanged between the host, the worker and
//! the cache registry.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// What kind of resource the page asked for.
///
/// Hosts derive this from the `Sec-Fetch-Dest` request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    #[default]
    Empty,
    Other,
}

impl Destination {
    /// Parse a `Sec-Fetch-Dest` value. Unknown values map to `Other`.
    pub fn from_fetch_dest(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" | "iframe" | "frame" => Destination::Document,
            "image" => Destination::Image,
            "script" | "worker" | "sharedworker" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            "" | "empty" => Destination::Empty,
            _ => Destination::Other,
        }
    }
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub destination: Destination,
}

impl WorkerRequest {
    /// Build a bodiless GET request, as issued for navigations and precaching.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: HeaderMap::new(), destination: Destination::Empty }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// URL used as the cache identity: the request URL without its fragment.
    pub fn cache_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }
}

/// A response snapshot, as returned by the network or stored in a partition.
///
/// The body is reference counted, so cloning a response to store it while
/// handing it back to the caller does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl StoredResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// Whether the response may be written to a partition.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Encode headers as an ordered JSON list of `[name, value]` pairs.
    ///
    /// Values are kept as raw bytes since obs-text is not valid UTF-8.
    pub fn headers_json(&self) -> Result<String, Error> {
        let pairs: Vec<(&str, &[u8])> =
            self.headers.iter().map(|(name, value)| (name.as_str(), value.as_bytes())).collect();

        serde_json::to_string(&pairs).map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))
    }

    /// Decode headers written by [`StoredResponse::headers_json`].
    pub fn headers_from_json(json: &str) -> Result<HeaderMap, Error> {
        let pairs: Vec<(String, Vec<u8>)> =
            serde_json::from_str(json).map_err(|e| Error::CorruptEntry(e.to_string()))?;

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            let value = HeaderValue::from_bytes(&value).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            headers.append(name, value);
        }

        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_from_fetch_dest() {
        assert_eq!(Destination::from_fetch_dest("image"), Destination::Image);
        assert_eq!(Destination::from_fetch_dest("Document"), Destination::Document);
        assert_eq!(Destination::from_fetch_dest("empty"), Destination::Empty);
        assert_eq!(Destination::from_fetch_dest(""), Destination::Empty);
        assert_eq!(Destination::from_fetch_dest("audio"), Destination::Other);
    }

    #[test]
    fn test_cache_url_strips_fragment() {
        let req = WorkerRequest::get(Url::parse("https://rinkorea.com/shop?page=2#top").unwrap());
        assert_eq!(req.cache_url(), "https://rinkorea.com/shop?page=2");
    }

    #[test]
    fn test_headers_json_keeps_order_and_duplicates() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        let response = StoredResponse::new(StatusCode::OK, headers.clone(), "png");

        let json = response.headers_json().unwrap();
        let decoded = StoredResponse::headers_from_json(&json).unwrap();

        assert_eq!(decoded, headers);
        let cookies: Vec<_> = decoded.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_headers_json_keeps_opaque_bytes() {
        let mut headers = HeaderMap::new();
        let disposition = HeaderValue::from_bytes(b"attachment; filename=\"caf\xE9.pdf\"").unwrap();
        headers.insert(header::CONTENT_DISPOSITION, disposition.clone());
        let response = StoredResponse::new(StatusCode::OK, headers, "pdf");

        let decoded = StoredResponse::headers_from_json(&response.headers_json().unwrap()).unwrap();
        assert_eq!(decoded.get(header::CONTENT_DISPOSITION).unwrap().as_bytes(), disposition.as_bytes());
    }

    #[test]
    fn test_headers_from_bad_json() {
        let result = StoredResponse::headers_from_json("{not json");
        assert!(matches!(result, Err(Error::CorruptEntry(_))));
    }

    #[test]
    fn test_is_success() {
        assert!(StoredResponse::new(StatusCode::OK, HeaderMap::new(), "").is_success());
        assert!(StoredResponse::new(StatusCode::NO_CONTENT, HeaderMap::new(), "").is_success());
        assert!(!StoredResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), "").is_success());
        assert!(!StoredResponse::new(StatusCode::SERVICE_UNAVAILABLE, HeaderMap::new(), "").is_success());
    }
}
