//! Directory listing resolution and path classification.
//!
//! The catalog API has no "type" field. A path is a directory when its
//! parent's listing names it in a container field (`collections`, `items`,
//! `documents`, `document_directory`), a file when it only appears under
//! `files`. Listings are fetched once per directory and kept for the life
//! of the mount.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::path::{self, RemoteRoot};
use super::transport::Transport;
use crate::vfs::{DirEntry, FileType, VfsError, VfsResult};

/// One child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Filesystem-visible name (last segment of the raw identifier).
    pub name: String,
    /// True if the child came from a container field.
    pub is_container: bool,
}

/// Raw shape of a listing document. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct ListingDocument {
    #[serde(default)]
    collections: Option<Vec<String>>,
    #[serde(default)]
    items: Option<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<String>>,
    #[serde(default)]
    document_directory: Option<Vec<String>>,
    #[serde(default)]
    files: Option<Vec<String>>,
}

/// Entry set of one remote directory: containers first, then files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    entries: Vec<ListingEntry>,
}

impl DirectoryListing {
    /// Parse a listing document.
    ///
    /// Container fields are checked in the order collections, items,
    /// documents, document_directory; the last one present replaces
    /// whatever an earlier one produced. `files` is always added.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let doc: ListingDocument = serde_json::from_slice(body)?;
        Ok(Self::from_document(doc))
    }

    fn from_document(doc: ListingDocument) -> Self {
        let containers = [doc.collections, doc.items, doc.documents, doc.document_directory]
            .into_iter()
            .flatten()
            .last()
            .unwrap_or_default();

        let containers = containers.iter().map(|id| (id, true));
        let files = doc.files.iter().flatten().map(|id| (id, false));

        let entries = containers
            .chain(files)
            .filter_map(|(id, is_container)| {
                path::identifier_name(id).map(|name| ListingEntry {
                    name: name.to_string(),
                    is_container,
                })
            })
            .collect();

        Self { entries }
    }

    /// All entries in listing order.
    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    /// Names of all entries.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Names of the container entries.
    pub fn directories(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.is_container)
            .map(|e| e.name.as_str())
    }

    /// Returns true if `name` appears in any field.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries as VFS directory entries.
    pub fn dir_entries(&self) -> Vec<DirEntry> {
        self.entries
            .iter()
            .map(|e| {
                let kind = if e.is_container {
                    FileType::Directory
                } else {
                    FileType::File
                };
                DirEntry::new(e.name.clone(), kind)
            })
            .collect()
    }
}

/// Classify `leaf` against its parent's listing.
///
/// The empty leaf is the root, which is always a directory.
pub fn is_directory_in(listing: &DirectoryListing, leaf: &str) -> bool {
    leaf.is_empty() || listing.directories().any(|d| d == leaf)
}

/// Fetch and parse the listing of directory `path`. Exactly one GET.
pub async fn resolve(
    transport: &dyn Transport,
    root: &RemoteRoot,
    path: &str,
) -> VfsResult<DirectoryListing> {
    let url = root.dir_url(path);
    let response = transport
        .get(&url, None)
        .await
        .map_err(|e| VfsError::remote_unavailable(path, e.to_string()))?;

    if !response.is_success() {
        warn!(%url, status = response.status, "listing request failed");
        return Err(VfsError::remote_unavailable(
            path,
            format!("listing returned status {}", response.status),
        ));
    }

    let listing = DirectoryListing::from_json(&response.body).map_err(|e| {
        warn!(%url, error = %e, "malformed listing document");
        VfsError::remote_unavailable(path, format!("malformed listing: {e}"))
    })?;

    debug!(path, entries = listing.len(), "resolved listing");
    Ok(listing)
}

/// Process-wide listing cache with single-flight resolution.
///
/// Concurrent callers for the same directory share one request. A failed
/// resolution is not cached; the next caller tries again.
pub struct ListingCache {
    transport: Arc<dyn Transport>,
    root: RemoteRoot,
    listings: DashMap<String, Arc<OnceCell<Arc<DirectoryListing>>>>,
}

impl std::fmt::Debug for ListingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingCache")
            .field("root", &self.root)
            .field("listings", &self.listings.len())
            .finish()
    }
}

impl ListingCache {
    /// Create an empty cache.
    pub fn new(transport: Arc<dyn Transport>, root: RemoteRoot) -> Self {
        Self {
            transport,
            root,
            listings: DashMap::new(),
        }
    }

    /// Listing of directory `path`, resolving it on first use.
    pub async fn get(&self, path: &str) -> VfsResult<Arc<DirectoryListing>> {
        let cell = self.listings.entry(path.to_string()).or_default().clone();
        cell.get_or_try_init(|| async {
            resolve(self.transport.as_ref(), &self.root, path)
                .await
                .map(Arc::new)
        })
        .await
        .cloned()
    }

    /// Directory-vs-file status of `path`, via its parent's listing.
    pub async fn classify(&self, path: &str) -> VfsResult<bool> {
        let (parent, leaf) = path::split(path);
        if leaf.is_empty() {
            return Ok(true);
        }
        let listing = self.get(parent).await?;
        Ok(is_directory_in(&listing, leaf))
    }

    /// Number of resolved listings.
    pub fn len(&self) -> usize {
        self.listings
            .iter()
            .filter(|cell| cell.value().initialized())
            .count()
    }

    /// Returns true if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::{Method, MockTransport};
    use serde_json::json;

    const BASE: &str = "http://alveo.local:3000/catalog";

    fn names(listing: &DirectoryListing) -> Vec<&str> {
        listing.names().collect()
    }

    #[test]
    fn test_last_container_field_wins() {
        let body = json!({
            "documents": ["a", "b"],
            "document_directory": ["c"],
            "files": ["x.wav"],
        })
        .to_string();
        let listing = DirectoryListing::from_json(body.as_bytes()).unwrap();

        assert_eq!(listing.directories().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(names(&listing), vec!["c", "x.wav"]);
        assert!(!listing.contains("a"));
    }

    #[test]
    fn test_precedence_order() {
        let body = json!({
            "items": ["item"],
            "collections": ["coll"],
        })
        .to_string();
        let listing = DirectoryListing::from_json(body.as_bytes()).unwrap();
        assert_eq!(names(&listing), vec!["item"]);

        let body = json!({ "collections": ["coll"], "items": null }).to_string();
        let listing = DirectoryListing::from_json(body.as_bytes()).unwrap();
        assert_eq!(names(&listing), vec!["coll"]);
    }

    #[test]
    fn test_identifiers_reduced_to_last_segment() {
        let body = json!({
            "items": [
                "https://app.alveo.edu.au/catalog/austalk/1_1",
                "austalk/1_2/",
                "",
            ],
            "files": ["https://app.alveo.edu.au/catalog/austalk/1_1/document/1_1.wav"],
        })
        .to_string();
        let listing = DirectoryListing::from_json(body.as_bytes()).unwrap();

        assert_eq!(names(&listing), vec!["1_1", "1_2", "1_1.wav"]);
        let entries = listing.dir_entries();
        assert!(entries[0].kind.is_dir());
        assert!(entries[2].kind.is_file());
    }

    #[test]
    fn test_empty_and_malformed_documents() {
        let listing = DirectoryListing::from_json(b"{}").unwrap();
        assert!(listing.is_empty());

        assert!(DirectoryListing::from_json(b"not json").is_err());
        assert!(DirectoryListing::from_json(b"[\"a\"]").is_err());
        assert!(DirectoryListing::from_json(br#"{"files": "a.wav"}"#).is_err());
    }

    #[test]
    fn test_is_directory_in() {
        let body = json!({ "documents": ["x"], "files": ["y"] }).to_string();
        let listing = DirectoryListing::from_json(body.as_bytes()).unwrap();

        assert!(is_directory_in(&listing, "x"));
        assert!(!is_directory_in(&listing, "y"));
        assert!(!is_directory_in(&listing, "z"));
        assert!(is_directory_in(&listing, ""));
    }

    #[tokio::test]
    async fn test_listing_resolved_once() {
        let mock = Arc::new(MockTransport::new(BASE));
        mock.add_listing("austalk", json!({ "items": ["1_1", "1_2"] }));
        let cache = ListingCache::new(mock.clone(), RemoteRoot::new(BASE));

        let first = cache.get("austalk").await.unwrap();
        let second = cache.get("austalk").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(names(&first), vec!["1_1", "1_2"]);
        assert_eq!(mock.request_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_classify_uses_parent_listing() {
        let mock = Arc::new(MockTransport::new(BASE));
        mock.add_listing("parent", json!({ "documents": ["x"], "files": ["y"] }));
        let cache = ListingCache::new(mock.clone(), RemoteRoot::new(BASE));

        assert!(cache.classify("parent/x").await.unwrap());
        assert!(!cache.classify("parent/y").await.unwrap());
        assert!(cache.classify("").await.unwrap());

        let url = mock.root().dir_url("parent");
        assert_eq!(mock.count(Method::Get, &url), 1);
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_listing_not_cached() {
        let mock = Arc::new(MockTransport::new(BASE));
        mock.add_listing("", json!({ "collections": ["austalk"] }));
        let url = mock.root().dir_url("");
        mock.set_status(Method::Get, &url, 503);
        let cache = ListingCache::new(mock.clone(), RemoteRoot::new(BASE));

        let err = cache.get("").await.unwrap_err();
        assert!(err.is_io());
        assert!(cache.is_empty());

        mock.clear_status(Method::Get, &url);
        let listing = cache.get("").await.unwrap();
        assert_eq!(names(&listing), vec!["austalk"]);
        assert_eq!(mock.count(Method::Get, &url), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_is_remote_unavailable() {
        let mock = Arc::new(MockTransport::new(BASE));
        mock.add_raw_listing("broken", "<html>502 Bad Gateway</html>");
        let cache = ListingCache::new(mock, RemoteRoot::new(BASE));

        let err = cache.get("broken").await.unwrap_err();
        assert!(matches!(err, VfsError::RemoteUnavailable { .. }));
    }
}
