//! Linux namespace selection for the container process.
//!
//! The PID namespace is special: `unshare(CLONE_NEWPID)` does not move the
//! caller, only its future children. The launcher therefore unshares it in
//! the parent right before spawning, and unshares every other namespace in
//! the child between `fork` and `exec`.

use burrow_common::error::{BurrowError, Result};

/// Which namespaces the container process gets.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceConfig {
    /// Isolate hostname and domain name.
    pub uts: bool,
    /// Isolate the process ID space; the container process becomes PID 1.
    pub pid: bool,
    /// Isolate the mount table.
    pub mount: bool,
    /// Give the container a fresh, empty network stack.
    pub network: bool,
    /// Isolate System V IPC objects and POSIX message queues.
    pub ipc: bool,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            uts: true,
            pid: true,
            mount: true,
            network: true,
            ipc: true,
        }
    }
}

#[cfg(target_os = "linux")]
impl NamespaceConfig {
    /// Flags for every namespace except PID.
    #[must_use]
    pub fn child_flags(&self) -> nix::sched::CloneFlags {
        use nix::sched::CloneFlags;

        let mut flags = CloneFlags::empty();
        flags.set(CloneFlags::CLONE_NEWUTS, self.uts);
        flags.set(CloneFlags::CLONE_NEWNS, self.mount);
        flags.set(CloneFlags::CLONE_NEWNET, self.network);
        flags.set(CloneFlags::CLONE_NEWIPC, self.ipc);
        flags
    }

    /// Moves the calling process into fresh namespaces per
    /// [`NamespaceConfig::child_flags`].
    ///
    /// Meant for the child between `fork` and `exec`: it only performs one
    /// system call and allocates nothing.
    ///
    /// # Errors
    ///
    /// Returns the raw `errno` if `unshare(2)` fails.
    pub fn unshare_child(&self) -> nix::Result<()> {
        let flags = self.child_flags();
        if flags.is_empty() {
            return Ok(());
        }
        nix::sched::unshare(flags)
    }

    /// Places the caller's future children in a new PID namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if `unshare(CLONE_NEWPID)` fails.
    pub fn unshare_pid_for_children(&self) -> Result<()> {
        if !self.pid {
            return Ok(());
        }
        nix::sched::unshare(nix::sched::CloneFlags::CLONE_NEWPID).map_err(|e| {
            BurrowError::Syscall {
                op: "unshare(CLONE_NEWPID)",
                message: e.to_string(),
            }
        })?;
        tracing::debug!("PID namespace prepared for children");
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
impl NamespaceConfig {
    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error: namespaces require Linux.
    pub fn unshare_pid_for_children(&self) -> Result<()> {
        Err(BurrowError::Config {
            message: "Linux required for native container operations".into(),
        })
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use nix::sched::CloneFlags;

    use super::*;

    #[test]
    fn default_requests_every_child_namespace() {
        let flags = NamespaceConfig::default().child_flags();
        assert!(flags.contains(CloneFlags::CLONE_NEWUTS));
        assert!(flags.contains(CloneFlags::CLONE_NEWNS));
        assert!(flags.contains(CloneFlags::CLONE_NEWNET));
        assert!(flags.contains(CloneFlags::CLONE_NEWIPC));
        assert!(!flags.contains(CloneFlags::CLONE_NEWPID));
    }

    #[test]
    fn disabled_namespaces_are_left_out() {
        let config = NamespaceConfig {
            network: false,
            ipc: false,
            ..NamespaceConfig::default()
        };
        let flags = config.child_flags();
        assert!(!flags.contains(CloneFlags::CLONE_NEWNET));
        assert!(!flags.contains(CloneFlags::CLONE_NEWIPC));
        assert!(flags.contains(CloneFlags::CLONE_NEWNS));
    }
}
