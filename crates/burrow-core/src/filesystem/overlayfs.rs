//! `OverlayFS` union mounts for layered container roots.
//!
//! Stacks read-only lower layers under a single writable upper layer. Reads
//! fall through to the lower layers; every write lands in the upper layer.

use std::path::PathBuf;

use burrow_common::error::{BurrowError, Result};

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Read-only lower layers, topmost first.
    pub lower_dirs: Vec<PathBuf>,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`, on the same filesystem as `upper_dir`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlayConfig {
    /// Renders the `lowerdir=…,upperdir=…,workdir=…` mount data.
    #[must_use]
    pub fn mount_options(&self) -> String {
        let lowers = self
            .lower_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        format!(
            "lowerdir={},upperdir={},workdir={}",
            lowers,
            self.upper_dir.display(),
            self.work_dir.display()
        )
    }
}

/// Mounts an `OverlayFS` with the given configuration.
///
/// All directories must already exist.
///
/// # Errors
///
/// Returns an error if no lower layer is given or the mount syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_overlay(config: &OverlayConfig) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    if config.lower_dirs.is_empty() {
        return Err(BurrowError::Config {
            message: "overlay mount needs at least one lower layer".into(),
        });
    }
    let opts = config.mount_options();
    mount(
        Some("overlay"),
        &config.merged_dir,
        Some("overlay"),
        MsFlags::empty(),
        Some(opts.as_str()),
    )
    .map_err(|e| BurrowError::Mount {
        target: config.merged_dir.clone(),
        message: format!("overlay mount ({opts}): {e}"),
    })?;

    tracing::info!(merged = %config.merged_dir.display(), "overlayfs mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: `OverlayFS` mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_overlay(_config: &OverlayConfig) -> Result<()> {
    Err(BurrowError::Config {
        message: "Linux required for native container operations".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_options_list_writable_layer_as_upper() {
        let config = OverlayConfig {
            lower_dirs: vec![PathBuf::from("/root/busybox")],
            upper_dir: PathBuf::from("/root/write_layer"),
            work_dir: PathBuf::from("/root/work"),
            merged_dir: PathBuf::from("/root/mnt"),
        };
        assert_eq!(
            config.mount_options(),
            "lowerdir=/root/busybox,upperdir=/root/write_layer,workdir=/root/work"
        );
    }

    #[test]
    fn multiple_lower_layers_are_colon_separated() {
        let config = OverlayConfig {
            lower_dirs: vec![PathBuf::from("/l/top"), PathBuf::from("/l/base")],
            upper_dir: PathBuf::from("/u"),
            work_dir: PathBuf::from("/w"),
            merged_dir: PathBuf::from("/m"),
        };
        assert!(config.mount_options().starts_with("lowerdir=/l/top:/l/base,"));
    }
}
