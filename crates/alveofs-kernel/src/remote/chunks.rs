//! Range-cache read engine.
//!
//! Reads are mapped onto 1 MiB chunks aligned to byte 0. A read that falls
//! inside one chunk is served from that chunk, fetching it on first use.
//! A read that crosses a chunk boundary bypasses the cache with a single
//! ranged GET for exactly the requested window.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::transport::{ByteRange, Transport};
use crate::vfs::{VfsError, VfsResult};

/// Chunk size in bytes.
pub const CHUNK_SIZE: u64 = 1024 * 1024;

/// Range of chunk `index`.
pub fn chunk_range(index: u64) -> ByteRange {
    let start = index * CHUNK_SIZE;
    ByteRange::new(start, start + CHUNK_SIZE - 1)
}

/// GET `range` of `url`, accepting 200 and 206.
///
/// A 200 means the server ignored `Range` and sent the whole file from
/// byte 0; the requested window is cut out of that body, empty past EOF.
pub async fn fetch_range(transport: &dyn Transport, url: &str, range: ByteRange) -> VfsResult<Bytes> {
    let response = transport.get(url, Some(range)).await?;

    match response.status {
        206 => Ok(response.body),
        200 => {
            let len = response.body.len() as u64;
            let start = range.start.min(len) as usize;
            let end = (range.end + 1).min(len) as usize;
            Ok(response.body.slice(start..end))
        }
        status => {
            warn!(url, %range, status, "ranged fetch failed");
            Err(VfsError::range_fetch(url, status))
        }
    }
}

/// Per-file chunk store. Chunks are fetched at most once and never dropped.
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: DashMap<u64, Arc<OnceCell<Bytes>>>,
}

impl ChunkCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once chunk `index` has been fetched.
    pub fn is_cached(&self, index: u64) -> bool {
        self.chunks
            .get(&index)
            .is_some_and(|cell| cell.initialized())
    }

    /// Number of fetched chunks.
    pub fn cached_chunks(&self) -> usize {
        self.chunks
            .iter()
            .filter(|cell| cell.value().initialized())
            .count()
    }

    /// Bytes held by fetched chunks.
    pub fn cached_bytes(&self) -> u64 {
        self.chunks
            .iter()
            .filter_map(|cell| cell.value().get().map(|b| b.len() as u64))
            .sum()
    }

    /// Read `length` bytes at `offset` of the file at `url`.
    ///
    /// `size` is the probed file size, 0 when unknown. It only bounds the
    /// uncached spanning path.
    pub async fn read(
        &self,
        transport: &dyn Transport,
        url: &str,
        size: u64,
        offset: u64,
        length: u64,
    ) -> VfsResult<Bytes> {
        if length == 0 {
            return Ok(Bytes::new());
        }

        let end = offset.saturating_add(length);
        let chunk_start = offset / CHUNK_SIZE;
        let chunk_end = end / CHUNK_SIZE;

        if chunk_start == chunk_end {
            let chunk = self.chunk(transport, url, chunk_start).await?;
            let within = (offset % CHUNK_SIZE) as usize;
            let from = within.min(chunk.len());
            let to = (within + length as usize).min(chunk.len());
            return Ok(chunk.slice(from..to));
        }

        // Spanning reads are rare (and whole-file streams would fill the
        // cache), so they go straight to the remote.
        let last = if size > 0 {
            if offset >= size {
                return Ok(Bytes::new());
            }
            end.min(size) - 1
        } else {
            end - 1
        };
        let range = ByteRange::new(offset, last);
        debug!(url, %range, "spanning read, bypassing chunk cache");
        fetch_range(transport, url, range).await
    }

    async fn chunk(&self, transport: &dyn Transport, url: &str, index: u64) -> VfsResult<Bytes> {
        let cell = self.chunks.entry(index).or_default().clone();
        if let Some(bytes) = cell.get() {
            debug!(url, chunk = index, "chunk cache hit");
            return Ok(bytes.clone());
        }

        cell.get_or_try_init(|| async {
            let range = chunk_range(index);
            debug!(url, chunk = index, %range, "fetching chunk");
            fetch_range(transport, url, range).await
        })
        .await
        .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockTransport;

    const BASE: &str = "http://alveo.local:3000/catalog";
    const PATH: &str = "austalk/1_1/document/1_1.wav";

    fn body(len: usize) -> Bytes {
        (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
    }

    fn setup(len: usize) -> (Arc<MockTransport>, String, Bytes) {
        let mock = Arc::new(MockTransport::new(BASE));
        let data = body(len);
        mock.add_file(PATH, data.clone());
        let url = mock.root().file_url(PATH);
        (mock, url, data)
    }

    #[test]
    fn test_chunk_range() {
        assert_eq!(chunk_range(0), ByteRange::new(0, 1_048_575));
        assert_eq!(chunk_range(2), ByteRange::new(2_097_152, 3_145_727));
    }

    #[tokio::test]
    async fn test_single_chunk_reads_share_one_fetch() {
        let (mock, url, data) = setup(3 * CHUNK_SIZE as usize);
        let cache = ChunkCache::new();
        let size = data.len() as u64;

        let a = cache.read(mock.as_ref(), &url, size, 0, 10).await.unwrap();
        let b = cache.read(mock.as_ref(), &url, size, 5, 10).await.unwrap();

        assert_eq!(a, data.slice(0..10));
        assert_eq!(b, data.slice(5..15));
        assert_eq!(mock.ranges_for(&url), vec![ByteRange::new(0, 1_048_575)]);
        assert!(cache.is_cached(0));
        assert_eq!(cache.cached_bytes(), CHUNK_SIZE);
    }

    #[tokio::test]
    async fn test_offset_within_later_chunk() {
        let (mock, url, data) = setup(3 * CHUNK_SIZE as usize);
        let cache = ChunkCache::new();
        let offset = 2 * CHUNK_SIZE + 100;

        let got = cache
            .read(mock.as_ref(), &url, data.len() as u64, offset, 4096)
            .await
            .unwrap();

        assert_eq!(got, data.slice(offset as usize..offset as usize + 4096));
        assert_eq!(mock.ranges_for(&url), vec![chunk_range(2)]);
    }

    #[tokio::test]
    async fn test_spanning_read_bypasses_cache() {
        let (mock, url, data) = setup(2 * CHUNK_SIZE as usize);
        let cache = ChunkCache::new();

        let got = cache
            .read(mock.as_ref(), &url, data.len() as u64, 1_048_570, 20)
            .await
            .unwrap();

        assert_eq!(got, data.slice(1_048_570..1_048_590));
        assert_eq!(mock.ranges_for(&url), vec![ByteRange::new(1_048_570, 1_048_589)]);
        assert_eq!(cache.cached_chunks(), 0);
    }

    #[tokio::test]
    async fn test_spanning_read_clamped_to_size() {
        let (mock, url, data) = setup(CHUNK_SIZE as usize + 10);
        let cache = ChunkCache::new();
        let size = data.len() as u64;

        let got = cache
            .read(mock.as_ref(), &url, size, CHUNK_SIZE - 5, 100)
            .await
            .unwrap();

        assert_eq!(got.len(), 15);
        assert_eq!(
            mock.ranges_for(&url),
            vec![ByteRange::new(CHUNK_SIZE - 5, size - 1)]
        );

        let past_end = cache
            .read(mock.as_ref(), &url, 10, CHUNK_SIZE - 5, 100)
            .await
            .unwrap();
        assert!(past_end.is_empty());
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_length_read_is_free() {
        let (mock, url, _) = setup(100);
        let cache = ChunkCache::new();

        let got = cache.read(mock.as_ref(), &url, 100, 50, 0).await.unwrap();
        assert!(got.is_empty());
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_short_chunk_reports_eof() {
        let (mock, url, data) = setup(100);
        let cache = ChunkCache::new();

        let tail = cache.read(mock.as_ref(), &url, 100, 90, 4096).await.unwrap();
        assert_eq!(tail, data.slice(90..100));

        let beyond = cache.read(mock.as_ref(), &url, 100, 200, 4096).await.unwrap();
        assert!(beyond.is_empty());
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_io_error_and_retried() {
        let (mock, url, data) = setup(100);
        mock.set_status(crate::remote::mock::Method::Get, &url, 500);
        let cache = ChunkCache::new();

        let err = cache.read(mock.as_ref(), &url, 100, 0, 10).await.unwrap_err();
        assert!(matches!(err, VfsError::RangeFetch { status: 500, .. }));
        assert!(!cache.is_cached(0));

        mock.clear_status(crate::remote::mock::Method::Get, &url);
        let got = cache.read(mock.as_ref(), &url, 100, 0, 10).await.unwrap();
        assert_eq!(got, data.slice(0..10));
    }

    #[tokio::test]
    async fn test_full_body_200_is_windowed() {
        let (mock, url, data) = setup(2 * CHUNK_SIZE as usize + 50);
        mock.ignore_range(true);
        let cache = ChunkCache::new();

        let got = cache
            .read(mock.as_ref(), &url, data.len() as u64, CHUNK_SIZE + 7, 3)
            .await
            .unwrap();
        assert_eq!(got, data.slice(CHUNK_SIZE as usize + 7..CHUNK_SIZE as usize + 10));
        assert_eq!(cache.cached_bytes(), CHUNK_SIZE);
    }

    #[tokio::test]
    async fn test_full_body_200_past_eof_is_empty() {
        let (mock, url, data) = setup(100);
        mock.ignore_range(true);
        let cache = ChunkCache::new();

        let chunk_one = cache
            .read(mock.as_ref(), &url, 0, CHUNK_SIZE + 10, 5)
            .await
            .unwrap();
        assert!(chunk_one.is_empty());
        assert!(cache.is_cached(1));
        assert_eq!(cache.cached_bytes(), 0);

        let spanning = cache
            .read(mock.as_ref(), &url, 0, CHUNK_SIZE - 5, 20)
            .await
            .unwrap();
        assert!(spanning.is_empty());

        let head = cache.read(mock.as_ref(), &url, 0, 10, 5).await.unwrap();
        assert_eq!(head, data.slice(10..15));
    }

    #[tokio::test]
    async fn test_fetch_range_windows_short_200() {
        let (mock, url, data) = setup(100);
        mock.ignore_range(true);

        let got = fetch_range(mock.as_ref(), &url, ByteRange::new(40, 59)).await.unwrap();
        assert_eq!(got, data.slice(40..60));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_single_flight() {
        let (mock, url, data) = setup(CHUNK_SIZE as usize);
        mock.set_latency(std::time::Duration::from_millis(50));
        let cache = Arc::new(ChunkCache::new());
        let size = data.len() as u64;

        let tasks: Vec<_> = (0..8u64)
            .map(|i| {
                let cache = cache.clone();
                let mock = mock.clone();
                let url = url.clone();
                tokio::spawn(async move {
                    cache.read(mock.as_ref(), &url, size, i * 100, 50).await
                })
            })
            .collect();

        for (i, result) in futures::future::join_all(tasks).await.into_iter().enumerate() {
            let got = result.unwrap().unwrap();
            let start = i * 100;
            assert_eq!(got, data.slice(start..start + 50));
        }
        assert_eq!(mock.ranges_for(&url).len(), 1);
    }
}
