//! In-memory transport for tests.
//!
//! Serves listing documents, file bodies and HEAD metadata from memory,
//! honours `Range`, and records every request so tests can count round-trips.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, HeaderName, HeaderValue};

use super::path::RemoteRoot;
use super::transport::{ByteRange, RemoteResponse, Transport};
use crate::vfs::{VfsError, VfsResult};

/// Request method as seen by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
}

/// One request received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub range: Option<ByteRange>,
}

#[derive(Debug, Default)]
struct State {
    listings: HashMap<String, Bytes>,
    files: HashMap<String, Bytes>,
    status_overrides: HashMap<(Method, String), u16>,
    unreachable: Vec<String>,
    extra_headers: HashMap<String, Vec<(HeaderName, HeaderValue)>>,
    ignore_range: bool,
    url_latency: HashMap<String, Duration>,
}

/// Scriptable [`Transport`] keyed by remote path.
#[derive(Debug)]
pub struct MockTransport {
    root: RemoteRoot,
    state: Mutex<State>,
    requests: Mutex<Vec<RecordedRequest>>,
    latency: Mutex<Option<Duration>>,
}

impl MockTransport {
    /// Create an empty mock rooted at `base`.
    pub fn new(base: &str) -> Self {
        Self {
            root: RemoteRoot::new(base),
            state: Mutex::new(State::default()),
            requests: Mutex::new(Vec::new()),
            latency: Mutex::new(None),
        }
    }

    /// The root the mock builds its URLs from.
    pub fn root(&self) -> &RemoteRoot {
        &self.root
    }

    /// Serve `document` as the listing of directory `path`.
    pub fn add_listing(&self, path: &str, document: serde_json::Value) {
        let body = Bytes::from(document.to_string());
        self.state.lock().listings.insert(self.root.dir_url(path), body);
    }

    /// Serve a raw (possibly malformed) listing body for directory `path`.
    pub fn add_raw_listing(&self, path: &str, body: impl Into<Bytes>) {
        self.state
            .lock()
            .listings
            .insert(self.root.dir_url(path), body.into());
    }

    /// Serve `body` as the content of file `path`.
    pub fn add_file(&self, path: &str, body: impl Into<Bytes>) {
        self.state
            .lock()
            .files
            .insert(self.root.file_url(path), body.into());
    }

    /// Answer every `method` request to `url` with `status` and an empty body.
    pub fn set_status(&self, method: Method, url: &str, status: u16) {
        self.state
            .lock()
            .status_overrides
            .insert((method, url.to_string()), status);
    }

    /// Drop a status override set with [`MockTransport::set_status`].
    pub fn clear_status(&self, method: Method, url: &str) {
        self.state
            .lock()
            .status_overrides
            .remove(&(method, url.to_string()));
    }

    /// Fail every request to `url` at the transport level.
    pub fn set_unreachable(&self, url: &str) {
        self.state.lock().unreachable.push(url.to_string());
    }

    /// Add a response header to every answer for `url`.
    pub fn add_header(&self, url: &str, name: HeaderName, value: &str) {
        let value = HeaderValue::from_str(value).expect("valid header value");
        self.state
            .lock()
            .extra_headers
            .entry(url.to_string())
            .or_default()
            .push((name, value));
    }

    /// Answer ranged GETs with the whole body and status 200.
    pub fn ignore_range(&self, ignore: bool) {
        self.state.lock().ignore_range = ignore;
    }

    /// Delay every response, to widen race windows.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Delay responses for `url` only, on top of any global latency.
    pub fn set_url_latency(&self, url: &str, latency: Duration) {
        self.state.lock().url_latency.insert(url.to_string(), latency);
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Total number of requests received.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests with `method` to `url`.
    pub fn count(&self, method: Method, url: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    /// Ranges of every ranged GET to `url`.
    pub fn ranges_for(&self, url: &str) -> Vec<ByteRange> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == Method::Get && r.url == url)
            .filter_map(|r| r.range)
            .collect()
    }

    /// Forget recorded requests.
    pub fn reset_requests(&self) {
        self.requests.lock().clear();
    }

    fn record(&self, method: Method, url: &str, range: Option<ByteRange>) {
        self.requests.lock().push(RecordedRequest {
            method,
            url: url.to_string(),
            range,
        });
    }

    async fn delay(&self, url: &str) {
        let global = *self.latency.lock();
        let per_url = self.state.lock().url_latency.get(url).copied();
        let latency = global.unwrap_or_default() + per_url.unwrap_or_default();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn respond(&self, method: Method, url: &str, range: Option<ByteRange>) -> VfsResult<RemoteResponse> {
        let state = self.state.lock();

        if state.unreachable.iter().any(|u| u == url) {
            return Err(VfsError::transport(format!("connection refused: {url}")));
        }

        let mut response = if let Some(status) = state.status_overrides.get(&(method, url.to_string())) {
            RemoteResponse::new(*status, Bytes::new())
        } else if let Some(body) = state.listings.get(url) {
            let mut resp = RemoteResponse::new(200, body.clone());
            if method == Method::Head {
                resp.body = Bytes::new();
            }
            resp
        } else if let Some(body) = state.files.get(url) {
            serve_file(method, body, range, state.ignore_range)
        } else {
            RemoteResponse::new(404, Bytes::new())
        };

        if let Some(extra) = state.extra_headers.get(url) {
            for (name, value) in extra {
                response.headers.insert(name.clone(), value.clone());
            }
        }
        Ok(response)
    }
}

fn serve_file(method: Method, body: &Bytes, range: Option<ByteRange>, ignore_range: bool) -> RemoteResponse {
    let total = body.len() as u64;
    let mut resp = match (method, range) {
        (Method::Head, _) => RemoteResponse::new(200, Bytes::new()),
        (Method::Get, Some(range)) if !ignore_range => {
            if range.start >= total {
                return RemoteResponse::new(416, Bytes::new());
            }
            let end = range.end.min(total - 1);
            let mut resp = RemoteResponse::new(206, body.slice(range.start as usize..=end as usize));
            let content_range = format!("bytes {}-{}/{}", range.start, end, total);
            resp.headers
                .insert(CONTENT_RANGE, HeaderValue::from_str(&content_range).expect("ascii"));
            resp
        }
        (Method::Get, _) => RemoteResponse::new(200, body.clone()),
    };

    let length = if method == Method::Head {
        total
    } else {
        resp.body.len() as u64
    };
    resp.headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    resp
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, range: Option<ByteRange>) -> VfsResult<RemoteResponse> {
        self.record(Method::Get, url, range);
        self.delay(url).await;
        self.respond(Method::Get, url, range)
    }

    async fn head(&self, url: &str) -> VfsResult<RemoteResponse> {
        self.record(Method::Head, url, None);
        self.delay(url).await;
        self.respond(Method::Head, url, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "http://alveo.local:3000/catalog";

    #[tokio::test]
    async fn test_serves_ranges() {
        let mock = MockTransport::new(BASE);
        mock.add_file("c/i/d/a.txt", "hello world");
        let url = mock.root().file_url("c/i/d/a.txt");

        let resp = mock.get(&url, Some(ByteRange::new(6, 100))).await.unwrap();
        assert_eq!(resp.status, 206);
        assert_eq!(&resp.body[..], b"world");

        let resp = mock.get(&url, Some(ByteRange::new(20, 30))).await.unwrap();
        assert_eq!(resp.status, 416);

        let resp = mock.head(&url).await.unwrap();
        assert_eq!(resp.content_length(), Some(11));
        assert_eq!(mock.request_count(), 3);
    }

    #[tokio::test]
    async fn test_listing_and_overrides() {
        let mock = MockTransport::new(BASE);
        mock.add_listing("", json!({ "collections": ["austalk"] }));
        let url = mock.root().dir_url("");

        assert_eq!(mock.get(&url, None).await.unwrap().status, 200);
        mock.set_status(Method::Get, &url, 503);
        assert_eq!(mock.get(&url, None).await.unwrap().status, 503);
        mock.clear_status(Method::Get, &url);
        assert_eq!(mock.get(&url, None).await.unwrap().status, 200);

        assert_eq!(mock.count(Method::Get, &url), 3);
        assert_eq!(mock.head(&mock.root().dir_url("nope")).await.unwrap().status, 404);
    }

    #[tokio::test]
    async fn test_url_latency_and_reset() {
        let mock = MockTransport::new(BASE);
        mock.add_file("slow", "s");
        mock.add_file("fast", "f");
        let slow = mock.root().file_url("slow");
        let fast = mock.root().file_url("fast");
        mock.set_url_latency(&slow, Duration::from_millis(200));

        let started = std::time::Instant::now();
        mock.head(&fast).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(200));
        mock.head(&slow).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));

        assert_eq!(mock.request_count(), 2);
        mock.reset_requests();
        assert_eq!(mock.request_count(), 0);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable() {
        let mock = MockTransport::new(BASE);
        let url = mock.root().file_url("x");
        mock.set_unreachable(&url);
        assert!(matches!(mock.head(&url).await, Err(VfsError::Transport(_))));
    }
}
