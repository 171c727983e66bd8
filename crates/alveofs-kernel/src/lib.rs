//! # alveofs-kernel
//!
//! Read-only virtual filesystem over the Alveo catalog API.
//!
//! The catalog is a tree of collections, items and documents served as JSON
//! listings, with document files served over plain HTTP. This crate turns
//! that into path-based filesystem operations:
//!
//! - directory entries come from one listing request per directory
//! - directory vs file is decided by which listing field names the child
//! - sizes and times come from HEAD probes
//! - reads are served from a 1 MiB chunk cache filled by ranged GETs
//!
//! The FUSE binding lives in `alveofs-fuse`.

pub mod config;
pub mod remote;
pub mod vfs;

pub use config::{AlveoConfig, ConfigError, MountConfig, RemoteConfig};
pub use remote::{
    ByteRange, CHUNK_SIZE, DirectoryListing, EntryDescriptor, HttpTransport, NameFilter,
    RemoteResponse, RemoteRoot, Transport,
};
pub use vfs::{
    CacheStats, DirEntry, FileAttr, FileType, RemoteBackend, StatFs, VfsError, VfsOps, VfsResult,
};
