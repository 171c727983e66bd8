//! alveofs binary
//!
//! ## Usage
//!
//! ```bash
//! alveofs --api-key "$KEY" /mnt/alveo
//! ALVEO_URL=http://localhost:3000/catalog alveofs -v /mnt/alveo
//! fusermount -u /mnt/alveo
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use alveofs_fuse::cli::Args;
use alveofs_fuse::{AlveoFs, MountOptions, mount};
use alveofs_kernel::{HttpTransport, RemoteBackend};

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = args.config().context("loading configuration")?;
    if config.remote.api_key.is_none() {
        tracing::warn!("no API key configured; protected collections will not be readable");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("alveofs-io")
        .build()
        .context("building tokio runtime")?;

    let transport = HttpTransport::new(&config.remote).context("building HTTP client")?;
    let backend = Arc::new(RemoteBackend::new(config.root(), Arc::new(transport)));
    let fs = AlveoFs::new(backend, runtime.handle().clone());

    tracing::info!(
        url = %config.remote.url,
        mountpoint = %args.mountpoint.display(),
        "mounting catalog"
    );
    mount(fs, &args.mountpoint, &MountOptions::from(&config.mount))
        .with_context(|| format!("mounting at {}", args.mountpoint.display()))?;

    tracing::info!("unmounted");
    Ok(())
}
