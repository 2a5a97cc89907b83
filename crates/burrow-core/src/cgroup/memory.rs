//! Memory resource control via the cgroup v1 `memory` subsystem.
//!
//! Writes the ceiling into `memory.limit_in_bytes`.

use burrow_common::types::ResourceConfig;

use super::subsystem::Subsystem;

/// The `memory` subsystem plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySubsystem;

impl Subsystem for MemorySubsystem {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn limit_file(&self) -> &'static str {
        "memory.limit_in_bytes"
    }

    fn limit<'a>(&self, resources: &'a ResourceConfig) -> Option<&'a str> {
        resources.memory_limit()
    }
}
