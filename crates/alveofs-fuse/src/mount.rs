//! Mounting.

use std::io;
use std::path::Path;

use alveofs_kernel::MountConfig;
use fuser::MountOption;

use crate::fuse::AlveoFs;

/// Options for [`mount`]. The mount is always read-only with kernel
/// permission checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// Filesystem name shown by `mount`.
    pub fsname: String,
    /// Let other users see the mount.
    pub allow_other: bool,
    /// Unmount when the process exits.
    pub auto_unmount: bool,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self::from(&MountConfig::default())
    }
}

impl From<&MountConfig> for MountOptions {
    fn from(config: &MountConfig) -> Self {
        Self {
            fsname: config.fsname.clone(),
            allow_other: config.allow_other,
            auto_unmount: config.auto_unmount,
        }
    }
}

impl MountOptions {
    /// The `fuser` option list.
    pub fn to_fuser(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::FSName(self.fsname.clone()),
            MountOption::Subtype("alveofs".to_string()),
            MountOption::RO,
            MountOption::DefaultPermissions,
        ];
        if self.allow_other {
            options.push(MountOption::AllowOther);
        }
        if self.auto_unmount {
            options.push(MountOption::AutoUnmount);
        }
        options
    }
}

/// Mount `fs` at `mountpoint` and serve until unmounted.
pub fn mount(fs: AlveoFs, mountpoint: &Path, options: &MountOptions) -> io::Result<()> {
    fuser::mount2(fs, mountpoint, &options.to_fuser())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = MountOptions::default().to_fuser();
        assert!(options.contains(&MountOption::RO));
        assert!(options.contains(&MountOption::DefaultPermissions));
        assert!(options.contains(&MountOption::AutoUnmount));
        assert!(options.contains(&MountOption::FSName("alveofs".into())));
        assert!(!options.contains(&MountOption::AllowOther));
    }

    #[test]
    fn test_from_config() {
        let config = MountConfig {
            fsname: "catalog".into(),
            allow_other: true,
            auto_unmount: false,
        };
        let options = MountOptions::from(&config).to_fuser();
        assert!(options.contains(&MountOption::AllowOther));
        assert!(!options.contains(&MountOption::AutoUnmount));
        assert!(options.contains(&MountOption::FSName("catalog".into())));
        assert!(options.contains(&MountOption::RO));
    }
}
