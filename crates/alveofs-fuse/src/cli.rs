//! Command-line arguments.

use std::path::PathBuf;

use alveofs_kernel::{AlveoConfig, ConfigError};
use clap::Parser;

/// Mount the Alveo catalog as a read-only filesystem.
#[derive(Parser, Debug)]
#[command(name = "alveofs", version)]
#[command(about = "Mount the Alveo catalog as a read-only filesystem")]
pub struct Args {
    /// Directory to mount on
    pub mountpoint: PathBuf,

    /// Catalog base URL
    #[arg(long, env = "ALVEO_URL")]
    pub url: Option<String>,

    /// API key sent as X-API-Key
    #[arg(long, env = "ALVEO_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Config file (default: $XDG_CONFIG_HOME/alveofs/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Let other users see the mount
    #[arg(long)]
    pub allow_other: bool,

    /// Keep the mount after the process exits
    #[arg(long)]
    pub no_auto_unmount: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Default log filter for the verbosity level.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Load the config file and apply flag overrides.
    pub fn config(&self) -> Result<AlveoConfig, ConfigError> {
        let config = AlveoConfig::load_or_default(self.config.as_deref())?;
        self.apply(config)
    }

    /// Apply flag overrides to `config`.
    pub fn apply(&self, mut config: AlveoConfig) -> Result<AlveoConfig, ConfigError> {
        if let Some(url) = &self.url {
            config.remote.url = url.clone();
        }
        if let Some(key) = &self.api_key {
            config.remote.api_key = Some(key.clone());
        }
        if let Some(timeout) = self.timeout {
            config.remote.timeout_secs = timeout;
        }
        if self.allow_other {
            config.mount.allow_other = true;
        }
        if self.no_auto_unmount {
            config.mount.auto_unmount = false;
        }
        config.validate()?;
        Ok(config)
    }
}
