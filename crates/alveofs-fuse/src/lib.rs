//! # alveofs-fuse
//!
//! FUSE binding for the Alveo catalog filesystem in `alveofs-kernel`.
//!
//! [`AlveoFs`] maps kernel inodes onto catalog paths and answers each FUSE
//! callback from a tokio task driving the async
//! [`RemoteBackend`](alveofs_kernel::RemoteBackend).
//! [`mount`] serves it read-only at a mountpoint.

pub mod cli;
pub mod fuse;
pub mod inodes;
pub mod mount;

pub use fuse::{AlveoFs, BLOCK_SIZE, TTL, errno};
pub use inodes::{InodeTable, ROOT_INO};
pub use mount::{MountOptions, mount};
