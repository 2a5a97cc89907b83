//! Container init: the first program inside the new namespaces.
//!
//! Runs in the re-executed runtime. It waits for the command line on the
//! inherited channel, switches the mount namespace into the workspace, and
//! replaces itself with the requested program. It never returns on success.

use std::convert::Infallible;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use burrow_common::constants::{
    EXIT_COMMAND_NOT_FOUND, EXIT_EXEC_FAILED, EXIT_INIT_FAILED, INIT_PIPE_FD,
};
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::CommandLine;
use burrow_core::filesystem::{mount, pivot_root};

/// Entry point of the `init` sub-command.
///
/// # Errors
///
/// Every error is fatal for the container; map it with [`failure_exit_code`].
pub fn run_init() -> Result<Infallible> {
    // SAFETY: the launcher hands this process exactly one inherited
    // descriptor at INIT_PIPE_FD, and nothing else in the process owns it.
    let receiver = unsafe { crate::channel::CommandReceiver::from_raw_fd(INIT_PIPE_FD) };
    let command = receiver.recv()?;
    tracing::info!(command = %command, "container init received command");

    setup_mounts()?;
    exec(&command)
}

/// Switches into the working directory as the new root and mounts `/proc`
/// and `/dev` inside it.
fn setup_mounts() -> Result<()> {
    mount::make_root_private()?;
    let new_root = std::env::current_dir().map_err(|e| BurrowError::Syscall {
        op: "getcwd",
        message: e.to_string(),
    })?;
    pivot_root::pivot_root(&new_root)?;

    let proc_dir = Path::new("/proc");
    std::fs::create_dir_all(proc_dir).map_err(|e| BurrowError::io(proc_dir, e))?;
    mount::mount_proc(proc_dir)?;

    let dev_dir = Path::new("/dev");
    std::fs::create_dir_all(dev_dir).map_err(|e| BurrowError::io(dev_dir, e))?;
    mount::mount_dev_tmpfs(dev_dir)?;
    Ok(())
}

/// Resolves the program on `PATH`.
///
/// # Errors
///
/// Returns [`BurrowError::NotFound`] if no executable of that name exists.
pub fn resolve_program(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|e| BurrowError::NotFound {
        kind: "executable",
        id: format!("{program} ({e})"),
    })
}

fn exec(command: &CommandLine) -> Result<Infallible> {
    let path = resolve_program(command.program())?;
    let program = CString::new(path.as_os_str().as_bytes()).map_err(|e| exec_error(&e))?;
    let args = command
        .tokens()
        .iter()
        .map(|token| CString::new(token.as_bytes()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| exec_error(&e))?;

    tracing::debug!(path = %path.display(), "replacing init with command");
    nix::unistd::execv(&program, &args).map_err(|e| exec_error(&e))
}

fn exec_error(e: &dyn std::fmt::Display) -> BurrowError {
    BurrowError::Syscall {
        op: "execv",
        message: e.to_string(),
    }
}

/// Exit status the init process ends with after `err`.
///
/// A missing executable and a failed `execv` get their own statuses, so the
/// parent can tell them apart from bootstrap failures.
#[must_use]
pub fn failure_exit_code(err: &BurrowError) -> i32 {
    match err {
        BurrowError::NotFound {
            kind: "executable", ..
        } => EXIT_COMMAND_NOT_FOUND,
        BurrowError::Syscall { op: "execv", .. } => EXIT_EXEC_FAILED,
        _ => EXIT_INIT_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_programs_on_path() {
        let path = resolve_program("sh").expect("sh on PATH");
        assert!(path.is_absolute());
    }

    #[test]
    fn unknown_program_is_not_found() {
        let err = resolve_program("burrow-no-such-program").expect_err("missing");
        assert_eq!(failure_exit_code(&err), EXIT_COMMAND_NOT_FOUND);
    }

    #[test]
    fn exit_codes_distinguish_failures() {
        assert_eq!(failure_exit_code(&BurrowError::EmptyCommand), EXIT_INIT_FAILED);
        let mount = BurrowError::Mount {
            target: PathBuf::from("/proc"),
            message: "EPERM".into(),
        };
        assert_eq!(failure_exit_code(&mount), EXIT_INIT_FAILED);
        assert_eq!(failure_exit_code(&exec_error(&"ENOEXEC")), EXIT_EXEC_FAILED);
    }
}
