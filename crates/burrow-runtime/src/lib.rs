//! Container run workflow for the Burrow runtime.
//!
//! The parent side ([`container::run`]) builds the workspace, re-executes the
//! current binary into fresh namespaces, hands it the command over a one-shot
//! pipe, enforces cgroup limits, waits, and tears everything down. The child
//! side ([`init::run_init`]) reads the command, switches into the container
//! root, and `exec`s the target program.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod channel;
pub mod cleanup;
pub mod container;
pub mod init;
pub mod process;
