//! VFS error types.

use std::io;
use thiserror::Error;

/// VFS error type.
///
/// Only [`VfsError::NotFound`] and the I/O family ([`VfsError::RemoteUnavailable`],
/// [`VfsError::RangeFetch`], [`VfsError::Transport`], [`VfsError::Io`]) come out
/// of the remote core. The rest are produced by the outer layers.
#[derive(Debug, Error)]
pub enum VfsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A listing or metadata request did not succeed.
    #[error("remote unavailable for {path}: {reason}")]
    RemoteUnavailable { path: String, reason: String },

    /// A ranged GET returned neither 200 nor 206.
    #[error("range fetch of {url} failed with status {status}")]
    RangeFetch { url: String, status: u16 },

    /// The transport could not complete the request at all.
    #[error("transport error: {0}")]
    Transport(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Filesystem is read-only.
    #[error("filesystem is read-only")]
    ReadOnly,

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a RemoteUnavailable error.
    pub fn remote_unavailable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a RangeFetch error.
    pub fn range_fetch(url: impl Into<String>, status: u16) -> Self {
        Self::RangeFetch {
            url: url.into(),
            status,
        }
    }

    /// Create a Transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns true for the "no such entry" kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for every error the host should see as EIO.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable { .. }
                | Self::RangeFetch { .. }
                | Self::Transport(_)
                | Self::Io(_)
                | Self::Other(_)
        )
    }
}

impl From<reqwest::Error> for VfsError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            VfsError::ReadOnly => {
                io::Error::new(io::ErrorKind::ReadOnlyFilesystem, "filesystem is read-only")
            }
            VfsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Io(e) => e,
            other => io::Error::other(other.to_string()),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(VfsError::not_found("a/b").is_not_found());
        assert!(!VfsError::not_found("a/b").is_io());
        assert!(VfsError::range_fetch("http://x/a", 500).is_io());
        assert!(VfsError::remote_unavailable("a", "status 503").is_io());
        assert!(VfsError::transport("connection refused").is_io());
        assert!(!VfsError::ReadOnly.is_io());
    }

    #[test]
    fn test_io_conversion() {
        let e: io::Error = VfsError::not_found("x").into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);

        let e: io::Error = VfsError::range_fetch("http://x", 500).into();
        assert_eq!(e.kind(), io::ErrorKind::Other);
        assert!(e.to_string().contains("500"));
    }
}
