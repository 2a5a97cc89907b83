//! # burrow-core
//!
//! Linux isolation primitives for the Burrow runtime.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: UTS, PID, mount, network, and IPC isolation.
//! - **Cgroups v1**: pluggable memory, cpu, and cpuset subsystems.
//! - **Filesystem**: layered `OverlayFS` workspaces, bind-mounted volumes, and `pivot_root`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
