//! Catalog-backed filesystem backend.
//!
//! Wires the remote core into [`VfsOps`]: `getattr` goes through the
//! descriptor cache, `readdir` through the listing cache, `read` through
//! the descriptor's chunk cache.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::remote::{self, DescriptorCache, EntryDescriptor, ListingCache, NameFilter, RemoteRoot, Transport};
use crate::vfs::error::VfsResult;
use crate::vfs::ops::VfsOps;
use crate::vfs::types::{DirEntry, FileAttr, StatFs};

/// Sizes of the process-wide caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Resolved directory listings.
    pub listings: usize,
    /// Built descriptors.
    pub descriptors: usize,
    /// Fetched chunks across all files.
    pub chunks: usize,
    /// Bytes held by fetched chunks.
    pub chunk_bytes: u64,
}

/// Read-only filesystem over the remote catalog.
///
/// All paths are relative to the catalog root given at construction.
pub struct RemoteBackend {
    root: RemoteRoot,
    transport: Arc<dyn Transport>,
    listings: Arc<ListingCache>,
    descriptors: DescriptorCache,
}

impl std::fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("root", &self.root)
            .field("stats", &self.stats())
            .finish()
    }
}

impl RemoteBackend {
    /// Create a backend with the default name filter.
    pub fn new(root: RemoteRoot, transport: Arc<dyn Transport>) -> Self {
        Self::with_filter(root, transport, NameFilter::default())
    }

    /// Create a backend with a custom name filter.
    pub fn with_filter(root: RemoteRoot, transport: Arc<dyn Transport>, filter: NameFilter) -> Self {
        let listings = Arc::new(ListingCache::new(transport.clone(), root.clone()));
        let descriptors = DescriptorCache::new(transport.clone(), root.clone(), listings.clone(), filter);
        Self {
            root,
            transport,
            listings,
            descriptors,
        }
    }

    /// The catalog root.
    pub fn root(&self) -> &RemoteRoot {
        &self.root
    }

    /// Descriptor for `path`, built on first use.
    pub async fn descriptor(&self, path: &Path) -> VfsResult<Arc<EntryDescriptor>> {
        let path = remote::path::normalize(path)?;
        self.descriptors.get(&path).await
    }

    /// Current cache sizes.
    pub fn stats(&self) -> CacheStats {
        let (chunks, chunk_bytes) = self.descriptors.chunk_totals();
        CacheStats {
            listings: self.listings.len(),
            descriptors: self.descriptors.len(),
            chunks,
            chunk_bytes,
        }
    }
}

#[async_trait]
impl VfsOps for RemoteBackend {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        self.descriptor(path).await?.attributes()
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let path = remote::path::normalize(path)?;
        let listing = self.listings.get(&path).await?;

        let mut entries = Vec::with_capacity(listing.len() + 2);
        entries.push(DirEntry::directory("."));
        entries.push(DirEntry::directory(".."));
        entries.extend(listing.dir_entries());
        Ok(entries)
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let descriptor = self.descriptor(path).await?;
        let bytes = descriptor
            .read(self.transport.as_ref(), offset, u64::from(size))
            .await?;
        Ok(bytes.to_vec())
    }

    fn read_only(&self) -> bool {
        true
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        let stats = self.stats();
        Ok(StatFs {
            files: stats.descriptors as u64,
            ..StatFs::default()
        })
    }
}
