//! Entry descriptors.
//!
//! A descriptor is the resolved form of one path: filtered placeholder,
//! directory, or file with its chunk cache. Descriptors are built on first
//! touch (classify, then HEAD) and kept for the life of the mount.

use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::chunks::ChunkCache;
use super::filter::NameFilter;
use super::listing::ListingCache;
use super::path::{self, RemoteRoot};
use super::transport::{RemoteResponse, Transport};
use crate::vfs::{FileAttr, VfsError, VfsResult};

/// Outcome of the metadata probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// The remote answered with this status.
    Http(u16),
    /// The request never completed.
    NoResponse,
}

impl ProbeStatus {
    /// Any 2xx answer.
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeStatus::Http(status) if (200..300).contains(status))
    }
}

/// Result of the HEAD request made while building a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    pub status: ProbeStatus,
    /// `Content-Length`, 0 when missing, unparseable or unsuccessful.
    pub size: u64,
    /// `Last-Modified`, or the probe time when missing or unparseable.
    pub modified: SystemTime,
}

impl Probe {
    /// Derive a probe from a HEAD response. Bad metadata falls back quietly.
    pub fn from_response(response: &RemoteResponse) -> Self {
        let status = ProbeStatus::Http(response.status);
        if !response.is_success() {
            return Self::failed(status);
        }
        Self {
            status,
            size: response.content_length().unwrap_or(0),
            modified: response.last_modified().unwrap_or_else(SystemTime::now),
        }
    }

    /// A probe that did not succeed.
    pub fn failed(status: ProbeStatus) -> Self {
        Self {
            status,
            size: 0,
            modified: SystemTime::now(),
        }
    }

    /// Returns true if the probe got a 2xx answer.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Resolved representation of one filesystem path.
#[derive(Debug)]
pub enum EntryDescriptor {
    /// Reserved name, answered locally as an empty file.
    Filtered { path: String, created: SystemTime },
    /// Remote container.
    Directory { path: String, probe: Probe },
    /// Remote file.
    File {
        path: String,
        url: String,
        probe: Probe,
        chunks: ChunkCache,
    },
}

impl EntryDescriptor {
    /// Root-relative path.
    pub fn path(&self) -> &str {
        match self {
            EntryDescriptor::Filtered { path, .. }
            | EntryDescriptor::Directory { path, .. }
            | EntryDescriptor::File { path, .. } => path,
        }
    }

    /// Returns true for remote containers.
    pub fn is_directory(&self) -> bool {
        matches!(self, EntryDescriptor::Directory { .. })
    }

    /// Returns true for names answered by the filter.
    pub fn is_filtered(&self) -> bool {
        matches!(self, EntryDescriptor::Filtered { .. })
    }

    /// Probed size, 0 for filtered entries.
    pub fn size(&self) -> u64 {
        match self {
            EntryDescriptor::Filtered { .. } => 0,
            EntryDescriptor::Directory { probe, .. } | EntryDescriptor::File { probe, .. } => {
                probe.size
            }
        }
    }

    /// Best-effort modification time.
    pub fn modified(&self) -> SystemTime {
        match self {
            EntryDescriptor::Filtered { created, .. } => *created,
            EntryDescriptor::Directory { probe, .. } | EntryDescriptor::File { probe, .. } => {
                probe.modified
            }
        }
    }

    /// The metadata probe, if one was made.
    pub fn probe(&self) -> Option<&Probe> {
        match self {
            EntryDescriptor::Filtered { .. } => None,
            EntryDescriptor::Directory { probe, .. } | EntryDescriptor::File { probe, .. } => {
                Some(probe)
            }
        }
    }

    /// Attribute query.
    ///
    /// Fails with NotFound when the probe did not succeed.
    pub fn attributes(&self) -> VfsResult<FileAttr> {
        match self {
            EntryDescriptor::Filtered { created, .. } => Ok(FileAttr::file(0, *created)),
            EntryDescriptor::Directory { path, probe } => {
                if !probe.is_success() {
                    return Err(VfsError::not_found(path.clone()));
                }
                Ok(FileAttr::directory(probe.size, probe.modified))
            }
            EntryDescriptor::File { path, probe, .. } => {
                if !probe.is_success() {
                    return Err(VfsError::not_found(path.clone()));
                }
                Ok(FileAttr::file(probe.size, probe.modified))
            }
        }
    }

    /// Read `length` bytes at `offset`.
    ///
    /// Filtered entries are empty. Directories cannot be read.
    pub async fn read(&self, transport: &dyn Transport, offset: u64, length: u64) -> VfsResult<Bytes> {
        match self {
            EntryDescriptor::Filtered { .. } => Ok(Bytes::new()),
            EntryDescriptor::Directory { path, .. } => Err(VfsError::is_a_directory(path.clone())),
            EntryDescriptor::File {
                url, probe, chunks, ..
            } => chunks.read(transport, url, probe.size, offset, length).await,
        }
    }

    /// Chunk cache of a file descriptor.
    pub fn chunks(&self) -> Option<&ChunkCache> {
        match self {
            EntryDescriptor::File { chunks, .. } => Some(chunks),
            _ => None,
        }
    }
}

/// Process-wide descriptor cache with single-flight construction.
pub struct DescriptorCache {
    transport: Arc<dyn Transport>,
    root: RemoteRoot,
    listings: Arc<ListingCache>,
    filter: NameFilter,
    descriptors: DashMap<String, Arc<OnceCell<Arc<EntryDescriptor>>>>,
}

impl std::fmt::Debug for DescriptorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorCache")
            .field("root", &self.root)
            .field("filter", &self.filter)
            .field("descriptors", &self.descriptors.len())
            .finish()
    }
}

impl DescriptorCache {
    /// Create an empty cache sharing `listings` for classification.
    pub fn new(
        transport: Arc<dyn Transport>,
        root: RemoteRoot,
        listings: Arc<ListingCache>,
        filter: NameFilter,
    ) -> Self {
        Self {
            transport,
            root,
            listings,
            filter,
            descriptors: DashMap::new(),
        }
    }

    /// Descriptor for `path`, building it on first use.
    ///
    /// Concurrent first touches share one build. A failed build (parent
    /// listing unavailable) is not cached.
    pub async fn get(&self, path: &str) -> VfsResult<Arc<EntryDescriptor>> {
        let cell = self.descriptors.entry(path.to_string()).or_default().clone();
        cell.get_or_try_init(|| async { self.build(path).await.map(Arc::new) })
            .await
            .cloned()
    }

    async fn build(&self, path: &str) -> VfsResult<EntryDescriptor> {
        if self.filter.is_filtered(path::leaf(path)) {
            debug!(path, "filtered name, no remote lookup");
            return Ok(EntryDescriptor::Filtered {
                path: path.to_string(),
                created: SystemTime::now(),
            });
        }

        let is_dir = self.listings.classify(path).await?;
        let url = self.root.url(path, is_dir);

        let probe = match self.transport.head(&url).await {
            Ok(response) => {
                if !response.is_success() {
                    info!(%url, status = response.status, "non-success metadata probe");
                }
                Probe::from_response(&response)
            }
            Err(e) => {
                info!(%url, error = %e, "metadata probe failed");
                Probe::failed(ProbeStatus::NoResponse)
            }
        };

        debug!(path, is_dir, size = probe.size, status = ?probe.status, "built descriptor");
        let path = path.to_string();
        Ok(if is_dir {
            EntryDescriptor::Directory { path, probe }
        } else {
            EntryDescriptor::File {
                path,
                url,
                probe,
                chunks: ChunkCache::new(),
            }
        })
    }

    fn built(&self) -> Vec<Arc<EntryDescriptor>> {
        self.descriptors
            .iter()
            .filter_map(|cell| cell.value().get().cloned())
            .collect()
    }

    /// Number of built descriptors.
    pub fn len(&self) -> usize {
        self.built().len()
    }

    /// Returns true if nothing has been built yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Chunks held across all file descriptors, as `(count, bytes)`.
    pub fn chunk_totals(&self) -> (usize, u64) {
        self.built()
            .iter()
            .filter_map(|d| d.chunks())
            .fold((0, 0), |(count, bytes), chunks| {
                (count + chunks.cached_chunks(), bytes + chunks.cached_bytes())
            })
    }
}
