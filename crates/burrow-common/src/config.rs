//! Runtime configuration model.
//!
//! Loaded from an optional JSON file; any field left out takes its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{BurrowError, Result};

/// Root configuration for the burrow runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory holding the image archive and the layer directories.
    pub root_path: PathBuf,
    /// Mount point that becomes the container's root.
    pub mount_path: PathBuf,
    /// Cgroup name created under every subsystem hierarchy.
    pub cgroup_name: String,
    /// Base image archive file name, relative to `root_path`.
    pub image_archive: String,
    /// Mount table used to locate cgroup hierarchies.
    pub mountinfo_path: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from(constants::DEFAULT_ROOT_PATH),
            mount_path: PathBuf::from(constants::DEFAULT_MOUNT_PATH),
            cgroup_name: constants::DEFAULT_CGROUP_NAME.to_string(),
            image_archive: constants::DEFAULT_IMAGE_ARCHIVE.to_string(),
            mountinfo_path: PathBuf::from(constants::PROC_MOUNTINFO),
        }
    }
}

impl RuntimeConfig {
    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`RuntimeConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BurrowError::io(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can describe a workspace.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Config`] for empty names or a mount point that
    /// coincides with the root path.
    pub fn validate(&self) -> Result<()> {
        if self.cgroup_name.trim().is_empty() {
            return Err(BurrowError::Config {
                message: "cgroup name must not be empty".into(),
            });
        }
        if self.image_archive.trim().is_empty() {
            return Err(BurrowError::Config {
                message: "image archive name must not be empty".into(),
            });
        }
        if self.mount_path == self.root_path {
            return Err(BurrowError::Config {
                message: format!(
                    "mount path {} must differ from root path",
                    self.mount_path.display()
                ),
            });
        }
        Ok(())
    }
}
