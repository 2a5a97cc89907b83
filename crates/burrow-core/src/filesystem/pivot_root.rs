//! Root filesystem switching via `pivot_root(2)`.
//!
//! More thorough than `chroot`: the old root is moved aside and detached,
//! so nothing of the host filesystem stays reachable from the container.

use std::path::Path;

use burrow_common::constants::PIVOT_OLD_ROOT_DIR;
use burrow_common::error::{BurrowError, Result};

use super::mount;

/// Makes `new_root` the process root and drops the old root.
///
/// `new_root` is first bind-mounted onto itself, since `pivot_root(2)`
/// requires the new root to be a mount point distinct from the current one.
/// The old root is parked in `new_root/.pivot_root`, the working directory
/// moves to `/`, and the old root is lazily unmounted and its directory
/// removed.
///
/// # Errors
///
/// Returns an error if the bind mount, `pivot_root(2)`, `chdir(2)`, or the
/// old-root unmount fails. Failure to remove the emptied old-root directory
/// is only logged.
#[cfg(target_os = "linux")]
pub fn pivot_root(new_root: &Path) -> Result<()> {
    mount::bind_mount(new_root, new_root)?;

    let put_old = new_root.join(PIVOT_OLD_ROOT_DIR);
    std::fs::create_dir_all(&put_old).map_err(|e| BurrowError::io(&put_old, e))?;

    nix::unistd::pivot_root(new_root, &put_old).map_err(|e| BurrowError::Mount {
        target: new_root.to_path_buf(),
        message: format!("pivot_root: {e}"),
    })?;
    nix::unistd::chdir("/").map_err(|e| BurrowError::Syscall {
        op: "chdir",
        message: e.to_string(),
    })?;
    tracing::info!(new_root = %new_root.display(), "root switched");

    let old_root = Path::new("/").join(PIVOT_OLD_ROOT_DIR);
    mount::unmount(&old_root)?;
    if let Err(e) = std::fs::remove_dir(&old_root) {
        tracing::warn!(path = %old_root.display(), error = %e, "old root directory left behind");
    }
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: `pivot_root(2)` requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn pivot_root(_new_root: &Path) -> Result<()> {
    Err(BurrowError::Config {
        message: "Linux required for native container operations".into(),
    })
}
