//! The `run` workflow.
//!
//! Sequences one container from start to finish:
//!
//! 1. validate the request (nothing is touched if it is rejected),
//! 2. build the workspace and launch the init process into it,
//! 3. create the cgroup, write its limits, and attach the init process,
//! 4. send the command line and wait for the container to exit,
//! 5. remove the cgroup, then the workspace.
//!
//! Teardown is owned by two guards, so it also runs when a setup step fails.

use burrow_common::config::RuntimeConfig;
use burrow_common::error::Result;
use burrow_common::types::{CommandLine, ContainerId, ResourceConfig};
use burrow_core::cgroup::{CgroupManager, CgroupPathResolver, SubsystemRegistry};
use burrow_core::filesystem::workspace::{Workspace, WorkspaceLayout};

use crate::cleanup::{CgroupGuard, WorkspaceGuard};
use crate::process::{self, ParentProcess};

/// Everything the caller asks of one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Connect the container to the caller's terminal.
    pub tty: bool,
    /// Program and arguments to run inside the container.
    pub command: Vec<String>,
    /// Cgroup limits.
    pub resources: ResourceConfig,
    /// Optional `<host-path>:<container-path>` volume.
    pub volume: Option<String>,
}

/// Result of a finished container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Identifier of this run, as it appears in the logs.
    pub container_id: ContainerId,
    /// Host PID the container process had.
    pub pid: u32,
    /// Exit code of the container process; `128 + n` after signal `n`.
    pub exit_code: i32,
}

/// Runs a container to completion.
///
/// Failing to set or attach cgroup limits is logged and the container runs
/// unconstrained. Teardown failures are logged and do not change the result.
///
/// # Errors
///
/// Returns [`burrow_common::error::BurrowError::EmptyCommand`] or a
/// configuration error before anything is created, or the first setup error
/// after teardown has run.
pub fn run(request: &RunRequest, config: &RuntimeConfig) -> Result<RunOutcome> {
    config.validate()?;
    let command = CommandLine::new(request.command.clone())?;

    let container_id = ContainerId::generate();
    let span = tracing::info_span!("container", id = %container_id);
    let _entered = span.enter();
    tracing::info!(command = %command, tty = request.tty, "running container");

    let registry = SubsystemRegistry::for_resources(&request.resources);
    let mut workspace = WorkspaceGuard::new(Workspace::new(
        WorkspaceLayout::from_config(config),
        request.volume.as_deref(),
    ));

    let mut container = ParentProcess::spawn(request.tty, &mut workspace)?.start()?;
    let pid = container.pid();

    let cgroups = CgroupGuard::new(CgroupManager::new(
        config.cgroup_name.clone(),
        request.resources.clone(),
        &registry,
        CgroupPathResolver::new(&config.mountinfo_path),
    ));
    enforce_limits(&cgroups, pid);

    let sent = container.send_command(&command);
    let status = container.wait()?;
    sent?;

    let exit_code = process::exit_code(status);
    tracing::info!(pid, exit_code, "container finished");
    Ok(RunOutcome {
        container_id,
        pid,
        exit_code,
    })
}

/// Applies limits before the command is sent, while the init process is
/// still blocked on its channel.
fn enforce_limits(cgroups: &CgroupManager<'_>, pid: u32) {
    if let Err(e) = cgroups.set_all() {
        tracing::warn!(error = %e, "cgroup limits not fully set");
    }
    if let Err(e) = cgroups.apply_all(pid) {
        tracing::warn!(pid, error = %e, "container process runs outside its cgroups");
    }
}

#[cfg(test)]
mod tests {
    use burrow_common::error::BurrowError;

    use super::*;

    fn config_in(root: &std::path::Path) -> RuntimeConfig {
        RuntimeConfig {
            root_path: root.to_path_buf(),
            mount_path: root.join("mnt"),
            ..RuntimeConfig::default()
        }
    }

    #[test]
    fn empty_command_is_rejected_before_any_setup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = RunRequest::default();

        let result = run(&request, &config_in(dir.path()));

        assert!(matches!(result, Err(BurrowError::EmptyCommand)));
        assert_eq!(std::fs::read_dir(dir.path()).expect("read").count(), 0);
    }

    #[test]
    fn blank_program_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = RunRequest {
            command: vec![String::new(), "-l".into()],
            ..RunRequest::default()
        };

        let result = run(&request, &config_in(dir.path()));

        assert!(matches!(result, Err(BurrowError::EmptyCommand)));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RuntimeConfig {
            cgroup_name: String::new(),
            ..config_in(dir.path())
        };
        let request = RunRequest {
            command: vec!["sh".into()],
            ..RunRequest::default()
        };

        let result = run(&request, &config);

        assert!(matches!(result, Err(BurrowError::Config { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).expect("read").count(), 0);
    }
}
