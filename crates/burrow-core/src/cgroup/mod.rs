//! Cgroup v1 resource management.
//!
//! A [`CgroupManager`] owns one named cgroup (a path relative to each
//! subsystem's hierarchy root) and fans every operation out over a fixed
//! [`SubsystemRegistry`]. The registry is built once at startup and shared
//! by reference; nothing mutates it afterwards.

pub mod cpu;
pub mod cpuset;
pub mod memory;
pub mod path;
pub mod subsystem;

use burrow_common::error::Result;
use burrow_common::types::ResourceConfig;

pub use self::path::CgroupPathResolver;
pub use self::subsystem::Subsystem;

/// Ordered, immutable set of subsystem plugins.
#[derive(Debug)]
pub struct SubsystemRegistry {
    subsystems: Vec<Box<dyn Subsystem>>,
}

impl SubsystemRegistry {
    /// The `cpu` and `memory` subsystems, in that order.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_subsystems(vec![
            Box::new(cpu::CpuSubsystem),
            Box::new(memory::MemorySubsystem),
        ])
    }

    /// The standard subsystems plus `cpuset` when the configuration pins CPUs.
    ///
    /// An unconfigured cpuset cgroup rejects tasks, so the hierarchy is only
    /// joined when it will actually be populated.
    #[must_use]
    pub fn for_resources(resources: &ResourceConfig) -> Self {
        let mut registry = Self::standard();
        if resources.cpu_set().is_some() {
            registry.subsystems.push(Box::new(cpuset::CpusetSubsystem));
        }
        registry
    }

    /// Builds a registry from explicit plugins, kept in the given order.
    #[must_use]
    pub fn from_subsystems(subsystems: Vec<Box<dyn Subsystem>>) -> Self {
        Self { subsystems }
    }

    /// Iterates the plugins in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Subsystem> {
        self.subsystems.iter().map(|s| s.as_ref() as &dyn Subsystem)
    }

    /// Names of the registered subsystems.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Subsystem::name).collect()
    }
}

/// Handle to one named cgroup across every registered subsystem.
#[derive(Debug)]
pub struct CgroupManager<'r> {
    path: String,
    resources: ResourceConfig,
    registry: &'r SubsystemRegistry,
    resolver: CgroupPathResolver,
}

impl<'r> CgroupManager<'r> {
    /// Creates a manager for the cgroup at `path` under each hierarchy.
    pub fn new(
        path: impl Into<String>,
        resources: ResourceConfig,
        registry: &'r SubsystemRegistry,
        resolver: CgroupPathResolver,
    ) -> Self {
        Self {
            path: path.into(),
            resources,
            registry,
            resolver,
        }
    }

    /// Cgroup path relative to each hierarchy root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Limits this manager enforces.
    #[must_use]
    pub const fn resources(&self) -> &ResourceConfig {
        &self.resources
    }

    /// Creates the cgroup in every hierarchy and writes the configured limits.
    ///
    /// Stops at the first failing subsystem; later subsystems are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first subsystem error.
    pub fn set_all(&self) -> Result<()> {
        for subsystem in self.registry.iter() {
            subsystem.set(&self.resolver, &self.path, &self.resources)?;
        }
        tracing::info!(cgroup = %self.path, subsystems = ?self.registry.names(), "limits set");
        Ok(())
    }

    /// Adds `pid` to the cgroup in every hierarchy.
    ///
    /// Stops at the first failing subsystem. Membership is additive: earlier
    /// members stay in the task list.
    ///
    /// # Errors
    ///
    /// Returns the first [`burrow_common::error::BurrowError::Attach`].
    pub fn apply_all(&self, pid: u32) -> Result<()> {
        for subsystem in self.registry.iter() {
            subsystem.apply(&self.resolver, &self.path, pid)?;
        }
        tracing::info!(cgroup = %self.path, pid, "process attached to cgroups");
        Ok(())
    }

    /// Removes the cgroup from every hierarchy.
    ///
    /// Every subsystem is attempted even after a failure. Each failure is
    /// logged and the first one is returned. Safe to call after a partial
    /// `set_all`/`apply_all` or a previous removal.
    ///
    /// # Errors
    ///
    /// Returns the first [`burrow_common::error::BurrowError::Cleanup`].
    pub fn remove_all(&self) -> Result<()> {
        let mut first_error = None;
        for subsystem in self.registry.iter() {
            if let Err(e) = subsystem.remove(&self.resolver, &self.path) {
                tracing::warn!(subsystem = subsystem.name(), error = %e, "cgroup removal failed");
                let _ = first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!(cgroup = %self.path, "cgroups removed");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use burrow_common::error::BurrowError;

    use super::*;

    /// Builds a fake cgroup v1 tree with one directory per subsystem and a
    /// mount table pointing at them.
    fn fake_hierarchy(root: &Path, subsystems: &[&str]) -> CgroupPathResolver {
        let mut table = String::new();
        for (i, name) in subsystems.iter().enumerate() {
            let dir = root.join(name);
            std::fs::create_dir_all(&dir).expect("hierarchy dir");
            table.push_str(&format!(
                "{} 35 0:{} / {} rw,relatime shared:{i} - cgroup cgroup rw,{name}\n",
                40 + i,
                30 + i,
                dir.display()
            ));
        }
        let mountinfo = root.join("mountinfo");
        std::fs::write(&mountinfo, table).expect("mountinfo");
        CgroupPathResolver::new(mountinfo)
    }

    fn cgroup_dir(root: &Path, subsystem: &str) -> PathBuf {
        root.join(subsystem).join("burrow")
    }

    #[test]
    fn standard_registry_order() {
        assert_eq!(SubsystemRegistry::standard().names(), ["cpu", "memory"]);
    }

    #[test]
    fn cpuset_joins_registry_only_when_requested() {
        let without = SubsystemRegistry::for_resources(&ResourceConfig::default());
        assert!(!without.names().contains(&"cpuset"));

        let with = SubsystemRegistry::for_resources(&ResourceConfig::new("", "", "0-1"));
        assert_eq!(with.names(), ["cpu", "memory", "cpuset"]);
    }

    #[test]
    fn empty_limits_create_cgroups_without_writing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = fake_hierarchy(dir.path(), &["cpu", "memory"]);
        let registry = SubsystemRegistry::standard();
        let manager = CgroupManager::new("burrow", ResourceConfig::default(), &registry, resolver);

        manager.set_all().expect("set_all");

        for subsystem in ["cpu", "memory"] {
            let cgroup = cgroup_dir(dir.path(), subsystem);
            assert!(cgroup.is_dir());
            assert_eq!(std::fs::read_dir(&cgroup).expect("read").count(), 0);
        }
    }

    #[test]
    fn memory_only_limit_touches_memory_file_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = fake_hierarchy(dir.path(), &["cpu", "memory"]);
        let registry = SubsystemRegistry::standard();
        let resources = ResourceConfig::new("104857600", "", "");
        let manager = CgroupManager::new("burrow", resources, &registry, resolver);

        manager.set_all().expect("set_all");

        let limit = cgroup_dir(dir.path(), "memory").join("memory.limit_in_bytes");
        assert_eq!(std::fs::read_to_string(limit).expect("limit"), "104857600");
        assert!(!cgroup_dir(dir.path(), "cpu").join("cpu.shares").exists());
    }

    #[test]
    fn cpu_share_is_written_to_cpu_shares() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = fake_hierarchy(dir.path(), &["cpu", "memory"]);
        let registry = SubsystemRegistry::standard();
        let manager = CgroupManager::new(
            "burrow",
            ResourceConfig::new("", "512", ""),
            &registry,
            resolver,
        );

        manager.set_all().expect("set_all");

        let shares = cgroup_dir(dir.path(), "cpu").join("cpu.shares");
        assert_eq!(std::fs::read_to_string(shares).expect("shares"), "512");
        assert!(!cgroup_dir(dir.path(), "memory").join("memory.limit_in_bytes").exists());
    }

    #[test]
    fn cpuset_inherits_parent_memory_nodes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = fake_hierarchy(dir.path(), &["cpu", "memory", "cpuset"]);
        std::fs::write(dir.path().join("cpuset").join("cpuset.mems"), "0\n").expect("mems");
        let resources = ResourceConfig::new("", "", "0-1");
        let registry = SubsystemRegistry::for_resources(&resources);
        let manager = CgroupManager::new("burrow", resources, &registry, resolver);

        manager.set_all().expect("set_all");

        let cgroup = cgroup_dir(dir.path(), "cpuset");
        assert_eq!(std::fs::read_to_string(cgroup.join("cpuset.cpus")).expect("cpus"), "0-1");
        assert_eq!(std::fs::read_to_string(cgroup.join("cpuset.mems")).expect("mems"), "0");
    }

    #[test]
    fn set_all_stops_at_first_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = fake_hierarchy(dir.path(), &["memory"]);
        let registry = SubsystemRegistry::standard();
        let manager = CgroupManager::new(
            "burrow",
            ResourceConfig::new("1048576", "", ""),
            &registry,
            resolver,
        );

        let result = manager.set_all();

        assert!(matches!(result, Err(BurrowError::NotFound { .. })));
        assert!(!cgroup_dir(dir.path(), "memory").exists());
    }

    #[test]
    fn apply_all_is_additive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = fake_hierarchy(dir.path(), &["cpu", "memory"]);
        let registry = SubsystemRegistry::standard();
        let manager = CgroupManager::new("burrow", ResourceConfig::default(), &registry, resolver);
        manager.set_all().expect("set_all");

        manager.apply_all(4242).expect("first pid");
        manager.apply_all(4343).expect("second pid");

        for subsystem in ["cpu", "memory"] {
            let tasks = std::fs::read_to_string(cgroup_dir(dir.path(), subsystem).join("tasks"))
                .expect("tasks");
            let pids: Vec<&str> = tasks.lines().collect();
            assert_eq!(pids, ["4242", "4343"]);
        }
    }

    #[test]
    fn apply_without_cgroup_is_attach_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = fake_hierarchy(dir.path(), &["cpu", "memory"]);
        let registry = SubsystemRegistry::standard();
        let manager = CgroupManager::new("burrow", ResourceConfig::default(), &registry, resolver);

        let result = manager.apply_all(1);

        assert!(matches!(result, Err(BurrowError::Attach { subsystem: "cpu", pid: 1, .. })));
    }

    #[test]
    fn second_remove_all_reports_missing_cgroups() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = fake_hierarchy(dir.path(), &["cpu", "memory"]);
        let registry = SubsystemRegistry::standard();
        let manager = CgroupManager::new("burrow", ResourceConfig::default(), &registry, resolver);
        manager.set_all().expect("set_all");

        manager.remove_all().expect("first removal");
        assert!(!cgroup_dir(dir.path(), "cpu").exists());
        assert!(!cgroup_dir(dir.path(), "memory").exists());

        let second = manager.remove_all();
        assert!(matches!(second, Err(BurrowError::Cleanup { .. })));
    }

    #[test]
    fn remove_all_continues_past_a_failing_subsystem() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = fake_hierarchy(dir.path(), &["cpu", "memory"]);
        let registry = SubsystemRegistry::standard();
        let manager = CgroupManager::new("burrow", ResourceConfig::default(), &registry, resolver);
        manager.set_all().expect("set_all");
        // A member left in the cpu cgroup keeps its directory busy.
        std::fs::write(cgroup_dir(dir.path(), "cpu").join("tasks"), "99\n").expect("tasks");

        let result = manager.remove_all();

        match result {
            Err(BurrowError::Cleanup { target, .. }) => assert!(target.starts_with("cpu")),
            other => panic!("expected cleanup error, got {other:?}"),
        }
        assert!(cgroup_dir(dir.path(), "cpu").exists());
        assert!(!cgroup_dir(dir.path(), "memory").exists());
    }
}
