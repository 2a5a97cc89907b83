//! `burrow run` — run a command in a new container.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use burrow_common::config::RuntimeConfig;
use burrow_common::constants::EXIT_RUNTIME_DONE;
use burrow_common::types::ResourceConfig;
use burrow_runtime::container::{self, RunRequest};
use clap::Args;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Connect the container to this terminal.
    #[arg(short = 't', long = "tty", visible_alias = "it")]
    pub tty: bool,

    /// Memory limit, written verbatim to `memory.limit_in_bytes` (e.g. 100m).
    #[arg(short = 'm', long = "mem", default_value = "")]
    pub memory: String,

    /// CPU share weight, written to `cpu.shares`.
    #[arg(long = "cpushare", default_value = "")]
    pub cpu_share: String,

    /// CPUs the container may run on (e.g. 0-1), written to `cpuset.cpus`.
    #[arg(long = "cpuset", default_value = "")]
    pub cpu_set: String,

    /// Host directory to mount in the container, as `<host-path>:<container-path>`.
    #[arg(short = 'v', long = "volume")]
    pub volume: Option<String>,

    /// JSON runtime configuration file.
    #[arg(long, env = "BURROW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the image archive and the layers.
    #[arg(long, env = "BURROW_ROOT")]
    pub root: Option<PathBuf>,

    /// Mount point used as the container root.
    #[arg(long, env = "BURROW_MNT")]
    pub mnt: Option<PathBuf>,

    /// Cgroup name created under every subsystem hierarchy.
    #[arg(long, env = "BURROW_CGROUP")]
    pub cgroup: Option<String>,

    /// Exit with the container's exit code instead of 255.
    #[arg(long)]
    pub propagate_exit_code: bool,

    /// Command to run and its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Configuration file values (or defaults) overridden by explicit flags.
    fn runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RuntimeConfig::default(),
        };
        if let Some(root) = &self.root {
            config.root_path.clone_from(root);
        }
        if let Some(mnt) = &self.mnt {
            config.mount_path.clone_from(mnt);
        }
        if let Some(cgroup) = &self.cgroup {
            config.cgroup_name.clone_from(cgroup);
        }
        config.validate()?;
        Ok(config)
    }

    fn request(&self) -> RunRequest {
        RunRequest {
            tty: self.tty,
            command: self.command.clone(),
            resources: ResourceConfig::new(&self.memory, &self.cpu_share, &self.cpu_set),
            volume: self.volume.clone(),
        }
    }
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the container cannot
/// be set up.
pub fn execute(args: RunArgs) -> anyhow::Result<ExitCode> {
    let config = args.runtime_config()?;

    // SIGINT reaches the container too; the runtime stays alive to tear down.
    ctrlc::set_handler(|| tracing::info!("interrupt received, waiting for the container to exit"))
        .context("failed to set Ctrl+C handler")?;

    let outcome = container::run(&args.request(), &config).context("container run failed")?;
    tracing::info!(
        container = %outcome.container_id,
        exit_code = outcome.exit_code,
        "container exited"
    );

    let code = if args.propagate_exit_code {
        outcome.exit_code
    } else {
        EXIT_RUNTIME_DONE
    };
    Ok(super::exit_code(code))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::commands::{Cli, Command};

    fn parse(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(args).expect("parse");
        match cli.command {
            Command::Run(run) => run,
            Command::Init => unreachable!("parsed init"),
        }
    }

    #[test]
    fn trailing_command_keeps_its_own_flags() {
        let args = parse(&["burrow", "run", "-t", "-m", "100m", "sh", "-c", "echo hi"]);
        assert!(args.tty);
        assert_eq!(args.memory, "100m");
        assert_eq!(args.command, ["sh", "-c", "echo hi"]);
    }

    #[test]
    fn legacy_it_flag_is_accepted() {
        let args = parse(&["burrow", "run", "--it", "sh"]);
        assert!(args.tty);
    }

    #[test]
    fn missing_command_is_rejected() {
        assert!(Cli::try_parse_from(["burrow", "run", "-t"]).is_err());
    }

    #[test]
    fn limits_flow_into_the_request() {
        let args = parse(&[
            "burrow", "run", "--cpushare", "512", "--cpuset", "0-1", "-v", "/h:/c", "ls",
        ]);
        let request = args.request();
        assert_eq!(request.resources.memory_limit(), None);
        assert_eq!(request.resources.cpu_share(), Some("512"));
        assert_eq!(request.resources.cpu_set(), Some("0-1"));
        assert_eq!(request.volume.as_deref(), Some("/h:/c"));
        assert_eq!(request.command, ["ls"]);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("burrow.json");
        std::fs::write(&file, r#"{"root_path": "/srv/burrow", "cgroup_name": "from-file"}"#)
            .expect("config");
        let file_arg = file.to_string_lossy().into_owned();

        let args = parse(&[
            "burrow", "run", "--config", &file_arg, "--cgroup", "from-flag", "ls",
        ]);
        let config = args.runtime_config().expect("config");

        assert_eq!(config.root_path, PathBuf::from("/srv/burrow"));
        assert_eq!(config.cgroup_name, "from-flag");
        assert_eq!(config.mount_path, PathBuf::from("/root/mnt"));
    }

    #[test]
    fn mount_point_equal_to_root_is_rejected() {
        let args = parse(&["burrow", "run", "--root", "/srv", "--mnt", "/srv", "ls"]);
        assert!(args.runtime_config().is_err());
    }
}
