//! Layered container workspaces.
//!
//! A workspace is assembled from a read-only base layer (the extracted image
//! archive), an empty writable layer, and an overlay mount joining both at
//! the mount point. An optional host volume is bind-mounted inside it.
//!
//! ```text
//! Absent ── create ──▶ Layered ── overlay mount ──▶ Mounted ── delete ──▶ Absent
//! ```
//!
//! Teardown runs in the reverse order of creation: volume, overlay root,
//! mount point directory, writable layer. The base layer stays on disk.

use std::path::{Path, PathBuf};

use burrow_common::config::RuntimeConfig;
use burrow_common::constants::{OVERLAY_WORK_DIR, WRITE_LAYER_DIR};
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::VolumeSpec;

use super::overlayfs::{self, OverlayConfig};
use super::{layer, mount, recreate_dir, remove_tree};

/// Filesystem locations of a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    /// Base image archive.
    pub image_archive: PathBuf,
    /// Extracted read-only base layer.
    pub read_only_layer: PathBuf,
    /// Writable layer receiving every change made inside the container.
    pub write_layer: PathBuf,
    /// Overlay work directory.
    pub work_dir: PathBuf,
    /// Union mount point that becomes the container root.
    pub mount_point: PathBuf,
}

impl WorkspaceLayout {
    /// Derives the layout from a root path, a mount point, and the archive name.
    ///
    /// The base layer directory is named after the archive without its
    /// extension: `busybox.tar` unpacks into `<root>/busybox`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>, mount_point: impl Into<PathBuf>, archive: &str) -> Self {
        let root = root.as_ref();
        Self {
            image_archive: root.join(archive),
            read_only_layer: root.join(archive_stem(archive)),
            write_layer: root.join(WRITE_LAYER_DIR),
            work_dir: root.join(OVERLAY_WORK_DIR),
            mount_point: mount_point.into(),
        }
    }

    /// Derives the layout from the runtime configuration.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            &config.root_path,
            config.mount_path.clone(),
            &config.image_archive,
        )
    }

    fn overlay(&self) -> OverlayConfig {
        OverlayConfig {
            lower_dirs: vec![self.read_only_layer.clone()],
            upper_dir: self.write_layer.clone(),
            work_dir: self.work_dir.clone(),
            merged_dir: self.mount_point.clone(),
        }
    }
}

fn archive_stem(archive: &str) -> &str {
    [".tar.gz", ".tgz", ".tar"]
        .iter()
        .find_map(|ext| archive.strip_suffix(ext))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(archive)
}

/// Lifecycle state of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    /// Nothing has been materialised yet, or everything was torn down.
    Absent,
    /// Layer directories exist; the overlay is not mounted.
    Layered,
    /// The overlay root (and the volume, if any) is mounted.
    Mounted,
}

/// A container root filesystem built from layers.
#[derive(Debug)]
pub struct Workspace {
    layout: WorkspaceLayout,
    volume: Option<VolumeSpec>,
    state: WorkspaceState,
    volume_mounted: bool,
}

impl Workspace {
    /// Creates an unbuilt workspace.
    ///
    /// A malformed volume specification is logged and ignored; it never
    /// prevents the workspace from being built.
    #[must_use]
    pub fn new(layout: WorkspaceLayout, volume: Option<&str>) -> Self {
        let volume = volume
            .filter(|spec| !spec.is_empty())
            .and_then(|spec| match VolumeSpec::parse(spec) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(volume = spec, error = %e, "ignoring malformed volume");
                    None
                }
            });
        Self {
            layout,
            volume,
            state: WorkspaceState::Absent,
            volume_mounted: false,
        }
    }

    /// Filesystem locations of this workspace.
    #[must_use]
    pub const fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// The well-formed volume, if one was requested.
    #[must_use]
    pub const fn volume(&self) -> Option<&VolumeSpec> {
        self.volume.as_ref()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> WorkspaceState {
        self.state
    }

    /// Directory that becomes the container root.
    #[must_use]
    pub fn mount_point(&self) -> &Path {
        &self.layout.mount_point
    }

    /// Builds the workspace: base layer, writable layer, overlay root, volume.
    ///
    /// Stops at the first failing step. Whatever was created before the
    /// failure stays in place for [`Workspace::delete`] to remove.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing step.
    pub fn create(&mut self) -> Result<()> {
        self.create_layers()?;
        self.mount_root()?;
        if let Some(volume) = self.volume.clone() {
            self.mount_volume(&volume)?;
        }
        tracing::info!(mount_point = %self.layout.mount_point.display(), "workspace ready");
        Ok(())
    }

    /// Materialises the base layer, the writable layer, and an empty mount point.
    fn create_layers(&mut self) -> Result<()> {
        let layout = &self.layout;
        recreate_dir(&layout.read_only_layer)?;
        self.state = WorkspaceState::Layered;
        layer::extract_layer(&layout.image_archive, &layout.read_only_layer)?;
        recreate_dir(&layout.write_layer)?;
        recreate_dir(&layout.work_dir)?;
        recreate_dir(&layout.mount_point)?;
        tracing::debug!(
            read_only = %layout.read_only_layer.display(),
            writable = %layout.write_layer.display(),
            "layers materialised"
        );
        Ok(())
    }

    fn mount_root(&mut self) -> Result<()> {
        overlayfs::mount_overlay(&self.layout.overlay())?;
        self.state = WorkspaceState::Mounted;
        Ok(())
    }

    fn mount_volume(&mut self, volume: &VolumeSpec) -> Result<()> {
        std::fs::create_dir_all(&volume.host_path)
            .map_err(|e| BurrowError::io(&volume.host_path, e))?;
        let target = volume.target_under(&self.layout.mount_point);
        std::fs::create_dir_all(&target).map_err(|e| BurrowError::io(&target, e))?;
        mount::bind_mount(&volume.host_path, &target)?;
        self.volume_mounted = true;
        tracing::info!(volume = %volume, "volume mounted");
        Ok(())
    }

    /// Tears the workspace down in reverse order of creation.
    ///
    /// Unmounts the volume, then the overlay root, then removes the mount
    /// point and the writable layer. Every step is attempted even if an
    /// earlier one fails; each failure is logged and the first is returned.
    /// The base layer is kept for later containers.
    ///
    /// # Errors
    ///
    /// Returns the first [`BurrowError::Cleanup`] encountered.
    pub fn delete(&mut self) -> Result<()> {
        let mut failures = Vec::new();

        if self.volume_mounted
            && let Some(volume) = &self.volume
        {
            let target = volume.target_under(&self.layout.mount_point);
            match mount::unmount(&target) {
                Ok(()) => self.volume_mounted = false,
                Err(e) => failures.push(e),
            }
        }
        if self.state == WorkspaceState::Mounted
            && let Err(e) = mount::unmount(&self.layout.mount_point)
        {
            failures.push(e);
        }
        for dir in [
            &self.layout.mount_point,
            &self.layout.write_layer,
            &self.layout.work_dir,
        ] {
            if let Err(e) = remove_tree(dir) {
                failures.push(e);
            }
        }
        self.state = WorkspaceState::Absent;

        for e in &failures {
            tracing::warn!(error = %e, "workspace teardown step failed");
        }
        match failures.into_iter().next() {
            Some(first) => Err(BurrowError::Cleanup {
                target: format!("workspace {}", self.layout.mount_point.display()),
                message: first.to_string(),
            }),
            None => {
                tracing::info!(mount_point = %self.layout.mount_point.display(), "workspace removed");
                Ok(())
            }
        }
    }
}
