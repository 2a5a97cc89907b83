//! Unified error types for the burrow workspace.
//!
//! Variants follow the runtime's failure domains: configuration problems are
//! rejected before any kernel resource is touched, resource and attachment
//! errors abort or degrade setup, and cleanup errors are reported during
//! teardown without escalating.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum BurrowError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Writing a resource limit into a cgroup control file failed.
    #[error("failed to set {subsystem} limit: {source}")]
    ResourceLimit {
        /// Name of the cgroup subsystem.
        subsystem: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Adding a process to a cgroup failed.
    #[error("failed to attach pid {pid} to {subsystem} cgroup: {message}")]
    Attach {
        /// Name of the cgroup subsystem.
        subsystem: &'static str,
        /// Process that could not be attached.
        pid: u32,
        /// Description of the failure.
        message: String,
    },

    /// Releasing a resource during teardown failed.
    #[error("cleanup of {target} failed: {message}")]
    Cleanup {
        /// Resource being released (cgroup directory, mount point, layer).
        target: String,
        /// Description of the failure.
        message: String,
    },

    /// The init process received no command to run.
    #[error("no command received for the container init process")]
    EmptyCommand,

    /// A mount, unmount, or root switch failed.
    #[error("mount operation on {target} failed: {message}")]
    Mount {
        /// Mount target path.
        target: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// A system call outside the mount family failed.
    #[error("{op} failed: {message}")]
    Syscall {
        /// Name of the failing operation.
        op: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl BurrowError {
    /// Builds a [`BurrowError::Io`] for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BurrowError>;
