//! HTTP transport seam.
//!
//! The core only needs GET (optionally ranged) and HEAD. [`HttpTransport`]
//! is the production implementation; tests use `MockTransport`.

use std::fmt;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, HeaderMap, HeaderName, HeaderValue, LAST_MODIFIED, RANGE};
use tracing::debug;

use crate::config::RemoteConfig;
use crate::vfs::{VfsError, VfsResult};

/// Header carrying the catalog API key.
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Inclusive byte range, rendered as `bytes=<start>-<end>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Create an inclusive range. `end` must not be below `start`.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(end >= start, "inverted byte range {start}-{end}");
        Self { start, end }
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; an inclusive range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the `Range` request header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Status, headers and body of a completed request. HEAD bodies are empty.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RemoteResponse {
    /// Response with no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `Content-Length`, if present and parseable.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// `Last-Modified`, if present and parseable as an HTTP date.
    pub fn last_modified(&self) -> Option<SystemTime> {
        let raw = self.headers.get(LAST_MODIFIED)?.to_str().ok()?;
        parse_http_date(raw)
    }
}

/// Parse an HTTP-date (RFC 2822 form, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn parse_http_date(raw: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(SystemTime::from)
}

/// Remote request capability.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url`, sending `Range` when `range` is set.
    async fn get(&self, url: &str, range: Option<ByteRange>) -> VfsResult<RemoteResponse>;

    /// HEAD `url`, following redirects.
    async fn head(&self, url: &str) -> VfsResult<RemoteResponse>;
}

/// reqwest-backed transport.
///
/// Every request carries `Accept: application/json` and, when configured,
/// the API key header. Connection reuse and TLS are reqwest's.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client from the remote configuration.
    pub fn new(config: &RemoteConfig) -> VfsResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(key) = config.api_key.as_deref() {
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| VfsError::other(format!("invalid API key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, range: Option<ByteRange>) -> VfsResult<RemoteResponse> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!(url, status, bytes = body.len(), range = ?range, "GET");

        Ok(RemoteResponse {
            status,
            headers,
            body,
        })
    }

    async fn head(&self, url: &str) -> VfsResult<RemoteResponse> {
        let response = self.client.head(url).send().await?;
        let status = response.status().as_u16();
        debug!(url, status, "HEAD");

        Ok(RemoteResponse {
            status,
            headers: response.headers().clone(),
            body: Bytes::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn with_header(name: HeaderName, value: &str) -> RemoteResponse {
        let mut resp = RemoteResponse::new(200, Bytes::new());
        resp.headers.insert(name, HeaderValue::from_str(value).unwrap());
        resp
    }

    #[test]
    fn test_byte_range() {
        let range = ByteRange::new(0, 1_048_575);
        assert_eq!(range.len(), 1_048_576);
        assert_eq!(range.header_value(), "bytes=0-1048575");
        assert_eq!(range.to_string(), "0-1048575");
    }

    #[test]
    fn test_content_length() {
        assert_eq!(with_header(CONTENT_LENGTH, "2048").content_length(), Some(2048));
        assert_eq!(with_header(CONTENT_LENGTH, "lots").content_length(), None);
        assert_eq!(RemoteResponse::new(200, Bytes::new()).content_length(), None);
    }

    #[test]
    fn test_last_modified() {
        let resp = with_header(LAST_MODIFIED, "Sun, 06 Nov 1994 08:49:37 GMT");
        let secs = resp
            .last_modified()
            .unwrap()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert_eq!(secs, 784_111_777);

        assert!(with_header(LAST_MODIFIED, "yesterday-ish").last_modified().is_none());
    }

    #[test]
    fn test_status_classes() {
        assert!(RemoteResponse::new(200, Bytes::new()).is_success());
        assert!(RemoteResponse::new(206, Bytes::new()).is_success());
        assert!(!RemoteResponse::new(302, Bytes::new()).is_success());
        assert!(!RemoteResponse::new(404, Bytes::new()).is_success());
    }

    #[test]
    fn test_http_transport_builds() {
        let config = RemoteConfig {
            api_key: Some("fxss5G7NxD472koixm7r".into()),
            ..RemoteConfig::default()
        };
        assert!(HttpTransport::new(&config).is_ok());

        let bad = RemoteConfig {
            api_key: Some("line\nbreak".into()),
            ..RemoteConfig::default()
        };
        assert!(HttpTransport::new(&bad).is_err());
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let transport = HttpTransport::from_client(client);

        // Nothing listens on port 1.
        let err = transport.head("http://127.0.0.1:1/catalog/").await.unwrap_err();
        assert!(matches!(err, VfsError::Transport(_)));
        assert!(err.is_io());

        let err = transport
            .get("http://127.0.0.1:1/catalog/a.wav", Some(ByteRange::new(0, 9)))
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::Transport(_)));
    }
}
