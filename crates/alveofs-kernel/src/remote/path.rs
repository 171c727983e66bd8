//! Remote path handling.
//!
//! Filesystem paths are normalized to `/`-joined strings relative to the
//! catalog root (`""` is the root). URLs are built from the configured base
//! URL plus percent-encoded segments.

use std::path::{Component, Path};

use crate::vfs::{VfsError, VfsResult};

/// Normalize a filesystem path into a root-relative remote path.
///
/// Leading `/` and `.` components are dropped. `..` is rejected: the
/// remote has no parent of its root and the FUSE layer never sends it.
pub fn normalize(path: &Path) -> VfsResult<String> {
    let mut segments: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(VfsError::invalid_path(path.display().to_string()));
            }
            Component::Normal(s) => {
                let s = s
                    .to_str()
                    .ok_or_else(|| VfsError::invalid_path(path.display().to_string()))?;
                segments.push(s);
            }
        }
    }
    Ok(segments.join("/"))
}

/// Split a normalized path into `(parent, leaf)`.
///
/// The root splits into `("", "")`.
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Final segment of a normalized path.
pub fn leaf(path: &str) -> &str {
    split(path).1
}

/// Join a child name onto a normalized parent path.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Filesystem-visible name of a raw identifier from a listing document.
///
/// Identifiers may be bare names, paths or full URLs; only the text after
/// the final `/` is significant. Returns `None` when that text is empty.
pub fn identifier_name(identifier: &str) -> Option<&str> {
    let trimmed = identifier.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if name.is_empty() { None } else { Some(name) }
}

/// Base URL of the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRoot {
    base: String,
}

impl RemoteRoot {
    /// Create a root from a base URL. A trailing `/` is stripped.
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// The base URL, without trailing separator.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// URL of a resource. Directory URLs carry a trailing `/`.
    pub fn url(&self, path: &str, is_dir: bool) -> String {
        let mut url = self.base.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        if is_dir {
            url.push('/');
        }
        url
    }

    /// URL of a file resource.
    pub fn file_url(&self, path: &str) -> String {
        self.url(path, false)
    }

    /// URL of a directory resource.
    pub fn dir_url(&self, path: &str) -> String {
        self.url(path, true)
    }
}
