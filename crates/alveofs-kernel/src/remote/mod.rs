//! Remote catalog core.
//!
//! Turns the catalog's JSON listings and byte-range responses into
//! filesystem answers:
//!
//! - [`ListingCache`] - one listing request per directory, container vs file
//! - [`DescriptorCache`] - per-path classification plus metadata probe
//! - [`ChunkCache`] - 1 MiB aligned read cache per file
//! - [`NameFilter`] - reserved names answered locally
//! - [`Transport`] - GET/HEAD seam, [`HttpTransport`] in production
//!
//! Nothing here is ever evicted. The catalog is treated as immutable for
//! the life of a mount, so memory grows with the set of touched paths and
//! read chunks.

mod chunks;
mod descriptor;
mod filter;
mod listing;
#[cfg(any(test, feature = "test-mock"))]
pub mod mock;
pub mod path;
mod transport;

pub use chunks::{CHUNK_SIZE, ChunkCache, chunk_range, fetch_range};
pub use descriptor::{DescriptorCache, EntryDescriptor, Probe, ProbeStatus};
pub use filter::{FILTERED_PREFIXES, NameFilter};
pub use listing::{DirectoryListing, ListingCache, ListingEntry, is_directory_in, resolve};
pub use path::RemoteRoot;
pub use transport::{API_KEY_HEADER, ByteRange, HttpTransport, RemoteResponse, Transport, parse_http_date};
