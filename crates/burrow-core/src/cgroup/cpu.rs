//! CPU resource control via the cgroup v1 `cpu` subsystem.
//!
//! Writes the relative weight into `cpu.shares`. The kernel default is 1024;
//! a cgroup with 512 receives half the CPU time of a default one under
//! contention.

use burrow_common::types::ResourceConfig;

use super::subsystem::Subsystem;

/// The `cpu` subsystem plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuSubsystem;

impl Subsystem for CpuSubsystem {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn limit_file(&self) -> &'static str {
        "cpu.shares"
    }

    fn limit<'a>(&self, resources: &'a ResourceConfig) -> Option<&'a str> {
        resources.cpu_share()
    }
}
