//! The capability set every cgroup subsystem plugin implements.
//!
//! Plugins are stateless. Attaching and removing work the same way for every
//! subsystem, so only the limit file and the `ResourceConfig` field it reads
//! differ between implementations.

use std::fmt;
use std::io::Write;

use burrow_common::error::{BurrowError, Result};
use burrow_common::types::ResourceConfig;

use super::path::CgroupPathResolver;

/// Task membership file of a cgroup v1 directory.
pub const TASKS_FILE: &str = "tasks";

/// A cgroup subsystem that translates one resource limit into control-file writes.
pub trait Subsystem: fmt::Debug + Send + Sync {
    /// Subsystem name, used for hierarchy lookup (e.g. `memory`).
    fn name(&self) -> &'static str;

    /// Control file receiving the limit (e.g. `memory.limit_in_bytes`).
    fn limit_file(&self) -> &'static str;

    /// The requested limit for this subsystem, if any.
    fn limit<'a>(&self, resources: &'a ResourceConfig) -> Option<&'a str>;

    /// Creates the cgroup in this hierarchy and writes the limit if one is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the hierarchy cannot be resolved, or
    /// [`BurrowError::ResourceLimit`] if the write fails.
    fn set(
        &self,
        resolver: &CgroupPathResolver,
        cgroup: &str,
        resources: &ResourceConfig,
    ) -> Result<()> {
        let dir = resolver.resolve(self.name(), cgroup, true)?;
        let Some(value) = self.limit(resources) else {
            return Ok(());
        };
        let file = dir.join(self.limit_file());
        std::fs::write(&file, value).map_err(|source| BurrowError::ResourceLimit {
            subsystem: self.name(),
            source,
        })?;
        tracing::info!(subsystem = self.name(), path = %file.display(), value, "limit written");
        Ok(())
    }

    /// Adds `pid` to the cgroup's task list.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Attach`] if the cgroup does not exist or the
    /// write fails.
    fn apply(&self, resolver: &CgroupPathResolver, cgroup: &str, pid: u32) -> Result<()> {
        let attach_error = |message: String| BurrowError::Attach {
            subsystem: self.name(),
            pid,
            message,
        };
        let dir = resolver
            .resolve(self.name(), cgroup, false)
            .map_err(|e| attach_error(e.to_string()))?;
        let tasks = dir.join(TASKS_FILE);
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&tasks)
            .and_then(|mut file| writeln!(file, "{pid}"))
            .map_err(|e| attach_error(format!("{}: {e}", tasks.display())))?;
        tracing::debug!(subsystem = self.name(), pid, "process attached");
        Ok(())
    }

    /// Deletes the cgroup directory from this hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Cleanup`] if the directory cannot be resolved or
    /// removed (for instance while it still has member processes).
    fn remove(&self, resolver: &CgroupPathResolver, cgroup: &str) -> Result<()> {
        let dir = resolver
            .resolve(self.name(), cgroup, false)
            .map_err(|e| cleanup_error(self.name(), cgroup, &e.to_string()))?;
        // cgroupfs directories go with rmdir; their control files cannot be unlinked.
        std::fs::remove_dir(&dir)
            .map_err(|e| cleanup_error(self.name(), cgroup, &format!("{}: {e}", dir.display())))?;
        tracing::debug!(subsystem = self.name(), path = %dir.display(), "cgroup removed");
        Ok(())
    }
}

fn cleanup_error(subsystem: &str, cgroup: &str, message: &str) -> BurrowError {
    BurrowError::Cleanup {
        target: format!("{subsystem} cgroup {cgroup}"),
        message: message.to_string(),
    }
}
