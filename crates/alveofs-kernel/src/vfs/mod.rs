//! Virtual Filesystem abstraction.
//!
//! Key components:
//!
//! - [`VfsOps`] - Core trait for filesystem operations
//! - [`RemoteBackend`] - Read-only filesystem over the remote catalog
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations use paths, not inode numbers.
//!   The FUSE layer handles inode ↔ path mapping.
//! - **Explicit offset/size**: Reads take offset and size; there is no
//!   open-handle state.
//! - **Read-only**: the catalog cannot be written through, so the trait
//!   carries no mutating operations.

pub mod backends;
mod error;
mod ops;
mod types;

pub use backends::{CacheStats, RemoteBackend};
pub use error::{VfsError, VfsResult};
pub use ops::VfsOps;
pub use types::{DIR_PERM, DirEntry, FILE_PERM, FileAttr, FileType, S_IFDIR, S_IFREG, StatFs};
