//! System-wide constants and default paths.

/// Default directory holding the base image archive and the layer directories.
pub const DEFAULT_ROOT_PATH: &str = "/root";

/// Default mount point that becomes the container's root filesystem.
pub const DEFAULT_MOUNT_PATH: &str = "/root/mnt";

/// Default base image archive name, relative to the root path.
pub const DEFAULT_IMAGE_ARCHIVE: &str = "busybox.tar";

/// Writable layer directory name, relative to the root path.
pub const WRITE_LAYER_DIR: &str = "write_layer";

/// Overlay work directory name, relative to the root path.
pub const OVERLAY_WORK_DIR: &str = "work";

/// Default cgroup name created under every subsystem hierarchy.
pub const DEFAULT_CGROUP_NAME: &str = "burrow";

/// Mount table consulted to locate cgroup v1 hierarchies.
pub const PROC_MOUNTINFO: &str = "/proc/self/mountinfo";

/// Hidden sub-command the runtime re-executes itself with.
pub const INIT_SUBCOMMAND: &str = "init";

/// File descriptor number carrying the command pipe into the init process.
///
/// The first descriptor after stdin, stdout, and stderr.
pub const INIT_PIPE_FD: i32 = 3;

/// Directory (relative to the new root) that temporarily holds the old root.
pub const PIVOT_OLD_ROOT_DIR: &str = ".pivot_root";

/// Exit status of the init process when its bootstrap fails.
pub const EXIT_INIT_FAILED: i32 = 125;

/// Exit status of the init process when the command cannot be executed.
pub const EXIT_EXEC_FAILED: i32 = 126;

/// Exit status of the init process when the command is not on the search path.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Exit status of the runtime after a container finishes, unless the child's
/// status is propagated.
pub const EXIT_RUNTIME_DONE: i32 = 255;

/// Application name used in logs.
pub const APP_NAME: &str = "burrow";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "burrow";
