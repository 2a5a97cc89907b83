//! Domain primitive types used across the burrow workspace.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BurrowError, Result};

/// Unique identifier for a single container invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resource limits for a container cgroup.
///
/// Values are passed verbatim to the kernel control files. An empty string
/// means the limit is not set and the control file is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Memory ceiling as accepted by `memory.limit_in_bytes` (e.g. `104857600`).
    pub memory_limit: String,
    /// Relative CPU weight as accepted by `cpu.shares`.
    pub cpu_share: String,
    /// CPU list as accepted by `cpuset.cpus` (e.g. `0-1`).
    pub cpu_set: String,
}

impl ResourceConfig {
    /// Creates a resource configuration from raw limit strings.
    #[must_use]
    pub fn new(
        memory_limit: impl Into<String>,
        cpu_share: impl Into<String>,
        cpu_set: impl Into<String>,
    ) -> Self {
        Self {
            memory_limit: memory_limit.into(),
            cpu_share: cpu_share.into(),
            cpu_set: cpu_set.into(),
        }
    }

    /// Returns the memory limit if one was requested.
    #[must_use]
    pub fn memory_limit(&self) -> Option<&str> {
        non_empty(&self.memory_limit)
    }

    /// Returns the CPU share weight if one was requested.
    #[must_use]
    pub fn cpu_share(&self) -> Option<&str> {
        non_empty(&self.cpu_share)
    }

    /// Returns the CPU set if one was requested.
    #[must_use]
    pub fn cpu_set(&self) -> Option<&str> {
        non_empty(&self.cpu_set)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// A host directory mounted into the container, parsed from `<host>:<container>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Directory on the host.
    pub host_path: PathBuf,
    /// Mount point inside the container root.
    pub container_path: PathBuf,
}

impl VolumeSpec {
    /// Parses a `<host-path>:<container-path>` specification.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Config`] unless the input splits on `:` into
    /// exactly two non-empty parts.
    pub fn parse(spec: &str) -> Result<Self> {
        let parts: Vec<&str> = spec.split(':').collect();
        match parts.as_slice() {
            [host, container] if !host.is_empty() && !container.is_empty() => Ok(Self {
                host_path: PathBuf::from(host),
                container_path: PathBuf::from(container),
            }),
            _ => Err(BurrowError::Config {
                message: format!("volume must be <host-path>:<container-path>, got {spec:?}"),
            }),
        }
    }

    /// Resolves the container-side path beneath the given container root.
    #[must_use]
    pub fn target_under(&self, root: &Path) -> PathBuf {
        let relative = self
            .container_path
            .strip_prefix("/")
            .unwrap_or(&self.container_path);
        root.join(relative)
    }
}

impl fmt::Display for VolumeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.host_path.display(),
            self.container_path.display()
        )
    }
}

/// The command executed inside the container: program followed by arguments.
///
/// Always holds at least one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine(Vec<String>);

impl CommandLine {
    /// Creates a command line from its tokens.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::EmptyCommand`] if no non-empty token is given.
    pub fn new(tokens: Vec<String>) -> Result<Self> {
        if tokens.first().is_none_or(String::is_empty) {
            return Err(BurrowError::EmptyCommand);
        }
        Ok(Self(tokens))
    }

    /// Decodes the space-joined wire form sent to the init process.
    ///
    /// Runs of spaces produce no empty tokens.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::EmptyCommand`] if the message holds no tokens.
    pub fn from_wire(message: &str) -> Result<Self> {
        let tokens = message
            .split(' ')
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .collect();
        Self::new(tokens)
    }

    /// Encodes the tokens joined by single spaces.
    #[must_use]
    pub fn to_wire(&self) -> String {
        self.0.join(" ")
    }

    /// Returns the program name (first token).
    #[must_use]
    pub fn program(&self) -> &str {
        &self.0[0]
    }

    /// Returns all tokens, program included.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}
