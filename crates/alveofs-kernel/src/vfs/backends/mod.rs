//! VFS backends.
//!
//! Backends implement [`VfsOps`](super::VfsOps) for different storage types.

mod remote;

pub use remote::{CacheStats, RemoteBackend};
