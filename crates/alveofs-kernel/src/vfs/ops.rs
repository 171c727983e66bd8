//! VFS operations trait.
//!
//! Path-based, no inodes, explicit offset/size. Only the read half of a
//! filesystem: the remote catalog cannot be written through.

use async_trait::async_trait;
use std::path::Path;

use super::VfsResult;
use super::types::{DirEntry, FileAttr, StatFs};

/// Core VFS operations trait.
///
/// Paths are relative to the backend's root; a leading `/` is ignored.
#[async_trait]
pub trait VfsOps: Send + Sync {
    /// Get file attributes.
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Read directory entries, `.` and `..` first.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Read file contents.
    ///
    /// Reads up to `size` bytes starting at `offset`.
    /// Returns fewer bytes if EOF is reached.
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>>;

    /// Returns true if this filesystem is read-only.
    fn read_only(&self) -> bool;

    /// Get filesystem statistics.
    async fn statfs(&self) -> VfsResult<StatFs>;

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.getattr(path).await.is_ok()
    }

    /// Read entire file contents.
    async fn read_all(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let attr = self.getattr(path).await?;
        let size = u32::try_from(attr.size)
            .map_err(|_| super::VfsError::other(format!("file too large: {}", attr.size)))?;
        self.read(path, 0, size).await
    }
}
