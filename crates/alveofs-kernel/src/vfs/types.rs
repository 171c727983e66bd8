//! Core VFS types.
//!
//! Path-based and inode-free; the FUSE layer owns the inode mapping.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// `S_IFDIR` file-type bits.
pub const S_IFDIR: u32 = 0o040000;
/// `S_IFREG` file-type bits.
pub const S_IFREG: u32 = 0o100000;

/// Permission bits reported for every directory.
pub const DIR_PERM: u32 = 0o777;
/// Permission bits reported for every file.
pub const FILE_PERM: u32 = 0o666;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o666).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last access time. Mirrors `mtime`; the remote has no notion of access.
    pub atime: SystemTime,
    /// Number of hard links.
    pub nlink: u32,
}

impl FileAttr {
    /// Attributes for a regular file.
    pub fn file(size: u64, mtime: SystemTime) -> Self {
        Self {
            size,
            kind: FileType::File,
            perm: FILE_PERM,
            mtime,
            atime: mtime,
            nlink: 1,
        }
    }

    /// Attributes for a directory.
    pub fn directory(size: u64, mtime: SystemTime) -> Self {
        Self {
            size,
            kind: FileType::Directory,
            perm: DIR_PERM,
            mtime,
            atime: mtime,
            nlink: 2, // . and ..
        }
    }

    /// Full `st_mode`: type bits plus permissions.
    pub fn mode(&self) -> u32 {
        let type_bits = match self.kind {
            FileType::Directory => S_IFDIR,
            FileType::File => S_IFREG,
        };
        type_bits | self.perm
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }
}

/// Filesystem statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatFs {
    /// Total blocks.
    pub blocks: u64,
    /// Free blocks.
    pub bfree: u64,
    /// Available blocks (to non-root).
    pub bavail: u64,
    /// Total inodes.
    pub files: u64,
    /// Free inodes.
    pub ffree: u64,
    /// Block size.
    pub bsize: u32,
    /// Maximum name length.
    pub namelen: u32,
    /// Fragment size.
    pub frsize: u32,
}

impl Default for StatFs {
    /// A read-only remote has no free space to report.
    fn default() -> Self {
        Self {
            blocks: 0,
            bfree: 0,
            bavail: 0,
            files: 0,
            ffree: 0,
            bsize: 4096,
            namelen: 255,
            frsize: 4096,
        }
    }
}
