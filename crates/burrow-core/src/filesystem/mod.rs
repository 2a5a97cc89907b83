//! Filesystem management for container isolation.
//!
//! Provides base image extraction, `OverlayFS` workspaces, mount wrappers,
//! and `pivot_root` for switching into the container root.

pub mod layer;
pub mod mount;
pub mod overlayfs;
pub mod pivot_root;
pub mod workspace;

use std::path::Path;

use burrow_common::error::{BurrowError, Result};

/// Creates `path` empty: an existing directory is removed with all of its
/// content first, so no stale files survive.
///
/// # Errors
///
/// Returns an error if removal or creation fails.
pub fn recreate_dir(path: &Path) -> Result<()> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "clearing existing directory");
        std::fs::remove_dir_all(path).map_err(|e| BurrowError::io(path, e))?;
    }
    std::fs::create_dir_all(path).map_err(|e| BurrowError::io(path, e))?;
    Ok(())
}

/// Removes a directory tree; a tree that is already gone counts as removed.
///
/// # Errors
///
/// Returns an error if removal fails for any other reason.
pub fn remove_tree(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BurrowError::io(path, e)),
    }
}
