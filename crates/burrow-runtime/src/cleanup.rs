//! Scoped teardown of container resources.
//!
//! Filesystem and cgroup resources fail independently, so each gets its own
//! guard. A guard releases its resource when dropped, on every exit path of
//! the run workflow including early returns. Release failures are logged and
//! never escalate.

use std::ops::{Deref, DerefMut};

use burrow_core::cgroup::CgroupManager;
use burrow_core::filesystem::workspace::Workspace;

/// Deletes the workspace when dropped.
#[derive(Debug)]
pub struct WorkspaceGuard {
    workspace: Workspace,
}

impl WorkspaceGuard {
    /// Takes ownership of `workspace`; it is deleted when the guard drops.
    #[must_use]
    pub const fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

impl Deref for WorkspaceGuard {
    type Target = Workspace;

    fn deref(&self) -> &Workspace {
        &self.workspace
    }
}

impl DerefMut for WorkspaceGuard {
    fn deref_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        if let Err(e) = self.workspace.delete() {
            tracing::error!(error = %e, "workspace teardown incomplete");
        }
    }
}

/// Removes the cgroup from every hierarchy when dropped.
#[derive(Debug)]
pub struct CgroupGuard<'r> {
    manager: CgroupManager<'r>,
}

impl<'r> CgroupGuard<'r> {
    /// Takes ownership of `manager`; its cgroups are removed when the guard drops.
    #[must_use]
    pub const fn new(manager: CgroupManager<'r>) -> Self {
        Self { manager }
    }
}

impl<'r> Deref for CgroupGuard<'r> {
    type Target = CgroupManager<'r>;

    fn deref(&self) -> &CgroupManager<'r> {
        &self.manager
    }
}

impl Drop for CgroupGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.manager.remove_all() {
            tracing::error!(cgroup = self.manager.path(), error = %e, "cgroup teardown incomplete");
        }
    }
}
