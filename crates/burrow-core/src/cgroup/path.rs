//! Locating cgroup v1 hierarchies and the named cgroups beneath them.
//!
//! A hierarchy is found by scanning the mount table for an entry whose
//! filesystem-specific options name the subsystem, e.g.
//!
//! ```text
//! 40 35 0:34 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid shared:9 - cgroup cgroup rw,cpu,cpuacct
//! ```
//!
//! resolves `cpu` to `/sys/fs/cgroup/cpu,cpuacct`.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use burrow_common::constants::PROC_MOUNTINFO;
use burrow_common::error::{BurrowError, Result};

/// Resolves subsystem hierarchies from a mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupPathResolver {
    mountinfo: PathBuf,
}

impl Default for CgroupPathResolver {
    fn default() -> Self {
        Self::new(PROC_MOUNTINFO)
    }
}

impl CgroupPathResolver {
    /// Creates a resolver reading the given mountinfo file.
    pub fn new(mountinfo: impl Into<PathBuf>) -> Self {
        Self {
            mountinfo: mountinfo.into(),
        }
    }

    /// Returns the mount table this resolver reads.
    #[must_use]
    pub fn mountinfo(&self) -> &Path {
        &self.mountinfo
    }

    /// Finds the host mount point of the subsystem's hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::NotFound`] if no mounted hierarchy carries the
    /// subsystem, or an I/O error if the mount table cannot be read.
    pub fn hierarchy_root(&self, subsystem: &str) -> Result<PathBuf> {
        let file = std::fs::File::open(&self.mountinfo)
            .map_err(|e| BurrowError::io(&self.mountinfo, e))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| BurrowError::io(&self.mountinfo, e))?;
            if let Some(mount_point) = match_subsystem(&line, subsystem) {
                return Ok(PathBuf::from(mount_point));
            }
        }
        Err(BurrowError::NotFound {
            kind: "cgroup hierarchy",
            id: subsystem.to_string(),
        })
    }

    /// Resolves `cgroup` beneath the subsystem's hierarchy.
    ///
    /// An existing directory is returned as is. A missing one is created when
    /// `auto_create` is set.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::NotFound`] if the hierarchy is not mounted or the
    /// directory is missing and `auto_create` is false, and
    /// [`BurrowError::Io`] if creating it fails.
    pub fn resolve(&self, subsystem: &str, cgroup: &str, auto_create: bool) -> Result<PathBuf> {
        let root = self.hierarchy_root(subsystem)?;
        let path = root.join(cgroup.trim_start_matches('/'));
        if path.is_dir() {
            return Ok(path);
        }
        if !auto_create {
            return Err(BurrowError::NotFound {
                kind: "cgroup",
                id: path.display().to_string(),
            });
        }
        std::fs::create_dir_all(&path).map_err(|e| BurrowError::io(&path, e))?;
        tracing::debug!(subsystem, path = %path.display(), "cgroup created");
        Ok(path)
    }
}

/// Returns the mount point of a mountinfo line if its super options name the
/// subsystem.
fn match_subsystem<'a>(line: &'a str, subsystem: &str) -> Option<&'a str> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let mount_point = fields.get(4)?;
    let super_options = fields.last()?;
    super_options
        .split(',')
        .any(|option| option == subsystem)
        .then_some(*mount_point)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUNTINFO: &str = "\
25 30 0:23 / /sys rw,nosuid,nodev,noexec,relatime shared:7 - sysfs sysfs rw
35 25 0:30 / /sys/fs/cgroup ro,nosuid,nodev,noexec shared:9 - tmpfs tmpfs ro,mode=755
40 35 0:34 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid,nodev,noexec,relatime shared:16 - cgroup cgroup rw,cpu,cpuacct
41 35 0:35 / /sys/fs/cgroup/memory rw,nosuid,nodev,noexec,relatime shared:17 - cgroup cgroup rw,memory
";

    fn resolver_with(dir: &Path, content: &str) -> CgroupPathResolver {
        let path = dir.join("mountinfo");
        std::fs::write(&path, content).expect("write mountinfo");
        CgroupPathResolver::new(path)
    }

    #[test]
    fn match_subsystem_reads_super_options() {
        let line = MOUNTINFO.lines().nth(2).expect("cpu line");
        assert_eq!(match_subsystem(line, "cpu"), Some("/sys/fs/cgroup/cpu,cpuacct"));
        assert_eq!(match_subsystem(line, "cpuacct"), Some("/sys/fs/cgroup/cpu,cpuacct"));
        assert_eq!(match_subsystem(line, "memory"), None);
    }

    #[test]
    fn match_subsystem_requires_whole_option() {
        let line = "30 25 0:26 / /sys/fs/cgroup rw shared:4 - cgroup2 cgroup2 rw,memory_recursiveprot";
        assert_eq!(match_subsystem(line, "memory"), None);
    }

    #[test]
    fn hierarchy_root_finds_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_with(dir.path(), MOUNTINFO);
        let root = resolver.hierarchy_root("memory").expect("memory mounted");
        assert_eq!(root, PathBuf::from("/sys/fs/cgroup/memory"));
    }

    #[test]
    fn unmounted_subsystem_is_not_found_and_creates_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_with(dir.path(), MOUNTINFO);
        let result = resolver.resolve("pids", "burrow", true);
        assert!(matches!(result, Err(BurrowError::NotFound { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 1);
    }

    #[test]
    fn resolve_creates_missing_cgroup_when_asked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let hierarchy = dir.path().join("memory");
        std::fs::create_dir(&hierarchy).expect("hierarchy");
        let table = format!(
            "41 35 0:35 / {} rw,relatime shared:17 - cgroup cgroup rw,memory\n",
            hierarchy.display()
        );
        let resolver = resolver_with(dir.path(), &table);

        let missing = resolver.resolve("memory", "burrow", false);
        assert!(matches!(missing, Err(BurrowError::NotFound { .. })));

        let created = resolver.resolve("memory", "burrow", true).expect("created");
        assert_eq!(created, hierarchy.join("burrow"));
        assert!(created.is_dir());

        let existing = resolver.resolve("memory", "burrow", false).expect("exists");
        assert_eq!(existing, created);
    }

    #[test]
    fn missing_mount_table_is_an_io_error() {
        let resolver = CgroupPathResolver::new("/nonexistent/mountinfo");
        assert!(matches!(
            resolver.hierarchy_root("cpu"),
            Err(BurrowError::Io { .. })
        ));
    }
}
