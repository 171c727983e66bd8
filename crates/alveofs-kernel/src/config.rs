//! Mount configuration.
//!
//! Loaded from `$XDG_CONFIG_HOME/alveofs/config.toml` (or an explicit path)
//! and then overridden by command-line flags. Every field has a default, so
//! an empty or missing file yields a usable configuration.
//!
//! ```toml
//! [remote]
//! url = "https://app.alveo.edu.au/catalog"
//! api_key = "..."
//! timeout_secs = 60
//!
//! [mount]
//! fsname = "alveofs"
//! allow_other = false
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::remote::RemoteRoot;

/// Default catalog base URL.
pub const DEFAULT_URL: &str = "https://app.alveo.edu.au/catalog";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Remote catalog settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Catalog base URL.
    pub url: String,
    /// Value of the `X-API-Key` header.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// `User-Agent` header.
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("alveofs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// FUSE mount settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Filesystem name shown by `mount`.
    pub fsname: String,
    /// Let other users see the mount.
    pub allow_other: bool,
    /// Unmount when the process exits.
    pub auto_unmount: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            fsname: "alveofs".to_string(),
            allow_other: false,
            auto_unmount: true,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlveoConfig {
    pub remote: RemoteConfig,
    pub mount: MountConfig,
}

impl AlveoConfig {
    /// `$XDG_CONFIG_HOME/alveofs/config.toml`, if a config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("alveofs").join("config.toml"))
    }

    /// Parse a TOML document.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Load `explicit` if given (it must exist), else the default path if
    /// it exists, else built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Check values that would only fail later, at mount time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.remote.url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "remote.url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::Invalid("remote.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Catalog root built from `remote.url`.
    pub fn root(&self) -> RemoteRoot {
        RemoteRoot::new(self.remote.url.as_str())
    }
}
