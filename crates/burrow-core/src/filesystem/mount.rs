//! Mount utilities for container filesystem setup.
//!
//! Thin wrappers over `mount(2)`/`umount2(2)` that attach the target path
//! to every failure.

use std::path::Path;

use burrow_common::error::{BurrowError, Result};

#[cfg(target_os = "linux")]
fn mount_error(target: &Path, op: &str, e: nix::Error) -> BurrowError {
    BurrowError::Mount {
        target: target.to_path_buf(),
        message: format!("{op}: {e}"),
    }
}

/// Marks every mount under `/` private so later mounts do not propagate to
/// the host (`mount --make-rprivate /`).
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn make_root_private() -> Result<()> {
    use nix::mount::{MsFlags, mount};

    let root = Path::new("/");
    mount(
        None::<&str>,
        root,
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| mount_error(root, "make rprivate", e))?;
    tracing::debug!("root mount propagation set to private");
    Ok(())
}

/// Creates a recursive bind mount from `source` to `target`.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn bind_mount(source: &Path, target: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount(
        Some(source),
        target,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| mount_error(target, "bind mount", e))?;
    tracing::debug!(
        source = %source.display(),
        target = %target.display(),
        "bind mount created"
    );
    Ok(())
}

/// Mounts a fresh `proc` filesystem at `target` with `noexec,nosuid,nodev`.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_proc(target: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount(
        Some("proc"),
        target,
        Some("proc"),
        MsFlags::MS_NOEXEC | MsFlags::MS_NOSUID | MsFlags::MS_NODEV,
        None::<&str>,
    )
    .map_err(|e| mount_error(target, "mount proc", e))?;
    tracing::debug!(target = %target.display(), "proc mounted");
    Ok(())
}

/// Mounts a `tmpfs` at `target` with `nosuid,strictatime` and mode 0755.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_dev_tmpfs(target: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount(
        Some("tmpfs"),
        target,
        Some("tmpfs"),
        MsFlags::MS_NOSUID | MsFlags::MS_STRICTATIME,
        Some("mode=755"),
    )
    .map_err(|e| mount_error(target, "mount tmpfs", e))?;
    tracing::debug!(target = %target.display(), "tmpfs mounted");
    Ok(())
}

/// Lazily detaches the filesystem mounted at `target` (`MNT_DETACH`).
///
/// Once this returns the mount is gone from the namespace, so the directory
/// beneath it can be removed without reaching into the mounted content.
///
/// # Errors
///
/// Returns an error if the `umount2(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn unmount(target: &Path) -> Result<()> {
    use nix::mount::{MntFlags, umount2};

    umount2(target, MntFlags::MNT_DETACH).map_err(|e| mount_error(target, "unmount", e))?;
    tracing::debug!(target = %target.display(), "unmounted");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn unsupported() -> BurrowError {
    BurrowError::Config {
        message: "Linux required for native container operations".into(),
    }
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn make_root_private() -> Result<()> {
    Err(unsupported())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn bind_mount(_source: &Path, _target: &Path) -> Result<()> {
    Err(unsupported())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_proc(_target: &Path) -> Result<()> {
    Err(unsupported())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_dev_tmpfs(_target: &Path) -> Result<()> {
    Err(unsupported())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: unmounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn unmount(_target: &Path) -> Result<()> {
    Err(unsupported())
}
