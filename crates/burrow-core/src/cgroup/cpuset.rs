//! CPU pinning via the cgroup v1 `cpuset` subsystem.
//!
//! Writes the CPU list into `cpuset.cpus`. A fresh cpuset cgroup starts with
//! empty `cpuset.cpus` and `cpuset.mems` and refuses tasks until both are
//! populated, so `set` also copies the parent's memory nodes when the new
//! cgroup has none.

use std::path::Path;

use burrow_common::error::{BurrowError, Result};
use burrow_common::types::ResourceConfig;

use super::path::CgroupPathResolver;
use super::subsystem::Subsystem;

const MEMS_FILE: &str = "cpuset.mems";

/// The `cpuset` subsystem plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpusetSubsystem;

impl Subsystem for CpusetSubsystem {
    fn name(&self) -> &'static str {
        "cpuset"
    }

    fn limit_file(&self) -> &'static str {
        "cpuset.cpus"
    }

    fn limit<'a>(&self, resources: &'a ResourceConfig) -> Option<&'a str> {
        resources.cpu_set()
    }

    fn set(
        &self,
        resolver: &CgroupPathResolver,
        cgroup: &str,
        resources: &ResourceConfig,
    ) -> Result<()> {
        let dir = resolver.resolve(self.name(), cgroup, true)?;
        let Some(cpus) = self.limit(resources) else {
            return Ok(());
        };
        write_limit(self.name(), &dir.join(self.limit_file()), cpus)?;
        inherit_mems(self.name(), &dir)?;
        tracing::info!(subsystem = self.name(), cpus, "cpuset written");
        Ok(())
    }
}

fn write_limit(subsystem: &'static str, file: &Path, value: &str) -> Result<()> {
    std::fs::write(file, value).map_err(|source| BurrowError::ResourceLimit { subsystem, source })
}

/// Copies `cpuset.mems` from the parent cgroup when the child's is empty.
fn inherit_mems(subsystem: &'static str, dir: &Path) -> Result<()> {
    let own = dir.join(MEMS_FILE);
    let current = std::fs::read_to_string(&own).unwrap_or_default();
    if !current.trim().is_empty() {
        return Ok(());
    }
    let Some(parent) = dir.parent() else {
        return Ok(());
    };
    let inherited = std::fs::read_to_string(parent.join(MEMS_FILE))
        .map_err(|source| BurrowError::ResourceLimit { subsystem, source })?;
    let inherited = inherited.trim();
    if inherited.is_empty() {
        return Ok(());
    }
    write_limit(subsystem, &own, inherited)?;
    tracing::debug!(mems = inherited, "cpuset memory nodes inherited");
    Ok(())
}
