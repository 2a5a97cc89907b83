//! `burrow init` — container-side bootstrap.

use std::process::ExitCode;

use burrow_runtime::init;

/// Runs the container init. Only returns if the bootstrap failed; on success
/// the process has been replaced by the container command.
pub fn execute() -> ExitCode {
    let Err(e) = init::run_init();
    tracing::error!(error = %e, "container init failed");
    super::exit_code(init::failure_exit_code(&e))
}
