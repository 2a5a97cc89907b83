//! Process launcher for the container init.
//!
//! The runtime re-executes its own binary with the hidden `init` sub-command.
//! A [`ParentProcess`] is the launch descriptor: command line, namespaces,
//! working directory, stdio wiring, and the read end of the command channel,
//! which the child inherits as file descriptor 3. [`ParentProcess::start`]
//! turns it into a [`RunningProcess`] that holds the write end.

use std::ffi::OsStr;
use std::os::fd::RawFd;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use burrow_common::constants::{INIT_PIPE_FD, INIT_SUBCOMMAND};
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::CommandLine;
use burrow_core::filesystem::workspace::Workspace;
use burrow_core::namespace::NamespaceConfig;

use crate::channel::{self, CommandReceiver, CommandSender};

/// Binary path that always refers to the running executable.
const SELF_EXE: &str = "/proc/self/exe";

/// How the child is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaunchOptions {
    /// Connect the child's stdio to the runtime's own.
    pub tty: bool,
    /// Namespaces the child is placed in.
    pub namespaces: NamespaceConfig,
}

/// A configured, not yet started, child process.
#[derive(Debug)]
pub struct ParentProcess {
    command: Command,
    namespaces: NamespaceConfig,
    sender: CommandSender,
    receiver: CommandReceiver,
}

impl ParentProcess {
    /// Builds the workspace and prepares a re-exec of the runtime into it.
    ///
    /// The child gets fresh UTS, PID, mount, network, and IPC namespaces and
    /// starts in the workspace mount point.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be built or the command
    /// channel cannot be created. A partially built workspace is left for
    /// the caller to tear down.
    pub fn spawn(tty: bool, workspace: &mut Workspace) -> Result<Self> {
        workspace.create()?;
        let options = LaunchOptions {
            tty,
            namespaces: NamespaceConfig::default(),
        };
        Self::new(SELF_EXE, [INIT_SUBCOMMAND], workspace.mount_point(), options)
    }

    /// Prepares an arbitrary program to be launched with the channel on fd 3.
    ///
    /// # Errors
    ///
    /// Returns an error if the command channel cannot be created.
    pub fn new<I, S>(
        program: impl AsRef<OsStr>,
        args: I,
        working_dir: &Path,
        options: LaunchOptions,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (sender, receiver) = channel::channel()?;

        let mut command = Command::new(program);
        let _ = command.args(args).current_dir(working_dir);
        if options.tty {
            let _ = command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            let _ = command
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
        }

        let read_fd = receiver.as_raw_fd();
        let namespaces = options.namespaces;
        // SAFETY: the hook runs between fork and exec. It only issues
        // unshare(2), fcntl(2), and dup2(2), all async-signal-safe, and
        // allocates nothing.
        unsafe {
            let _ = command.pre_exec(move || {
                #[cfg(target_os = "linux")]
                namespaces.unshare_child()?;
                inherit_fd(read_fd, INIT_PIPE_FD)
            });
        }

        Ok(Self {
            command,
            namespaces,
            sender,
            receiver,
        })
    }

    /// Starts the child without waiting for it.
    ///
    /// The PID namespace is requested here, in the parent, so that the child
    /// becomes PID 1 of a new namespace. The parent's copy of the read end is
    /// closed once the child holds its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the PID namespace or the fork/exec fails.
    pub fn start(mut self) -> Result<RunningProcess> {
        self.namespaces.unshare_pid_for_children()?;
        let child = self.command.spawn().map_err(|e| BurrowError::Syscall {
            op: "spawn container process",
            message: e.to_string(),
        })?;
        drop(self.receiver);
        tracing::info!(pid = child.id(), "container process started");
        Ok(RunningProcess {
            child,
            sender: Some(self.sender),
        })
    }
}

/// Places `fd` at descriptor number `target` in the calling process, without
/// close-on-exec.
fn inherit_fd(fd: RawFd, target: RawFd) -> std::io::Result<()> {
    if fd == target {
        // SAFETY: plain fcntl(2) calls on a descriptor we own.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) } < 0 {
            return Err(std::io::Error::last_os_error());
        }
    } else if unsafe { libc::dup2(fd, target) } < 0 {
        // dup2(2) leaves the new descriptor without FD_CLOEXEC.
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// A started child process and the write end of its command channel.
#[derive(Debug)]
pub struct RunningProcess {
    child: Child,
    sender: Option<CommandSender>,
}

impl RunningProcess {
    /// Host PID of the child.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Sends the command line to the child and closes the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the command was already sent or the write fails.
    pub fn send_command(&mut self, command: &CommandLine) -> Result<()> {
        let sender = self.sender.take().ok_or_else(|| BurrowError::Config {
            message: "command already sent to the container process".into(),
        })?;
        sender.send(command)
    }

    /// Blocks until the child exits.
    ///
    /// An unsent channel is closed first, so a child still waiting for its
    /// command sees end of input instead of blocking forever.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        drop(self.sender.take());
        let status = self.child.wait().map_err(|e| BurrowError::Syscall {
            op: "wait",
            message: e.to_string(),
        })?;
        tracing::info!(pid = self.child.id(), %status, "container process exited");
        Ok(status)
    }
}

/// Exit code of a finished process; death by signal `n` maps to `128 + n`.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_namespaces() -> LaunchOptions {
        LaunchOptions {
            tty: false,
            namespaces: NamespaceConfig {
                uts: false,
                pid: false,
                mount: false,
                network: false,
                ipc: false,
            },
        }
    }

    fn shell(script: &str, dir: &Path) -> ParentProcess {
        ParentProcess::new("/bin/sh", ["-c", script], dir, no_namespaces()).expect("descriptor")
    }

    #[test]
    fn child_reads_command_from_fd_3() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = r#"read -r line <&3; [ "$line" = "echo hello world" ]"#;
        let mut process = shell(script, dir.path()).start().expect("start");
        assert!(process.pid() > 0);

        let command = CommandLine::from_wire("echo hello world").expect("command");
        process.send_command(&command).expect("send");
        let status = process.wait().expect("wait");

        assert_eq!(exit_code(status), 0);
    }

    #[test]
    fn child_starts_in_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = "[ -e marker ]";
        std::fs::write(dir.path().join("marker"), "").expect("marker");
        let mut process = shell(script, dir.path()).start().expect("start");

        let status = process.wait().expect("wait");

        assert_eq!(exit_code(status), 0);
    }

    #[test]
    fn unsent_channel_is_closed_on_wait() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = "cat <&3 >/dev/null; exit 7";
        let mut process = shell(script, dir.path()).start().expect("start");

        let status = process.wait().expect("wait");

        assert_eq!(exit_code(status), 7);
    }

    #[test]
    fn command_can_only_be_sent_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut process = shell("cat <&3 >/dev/null", dir.path()).start().expect("start");
        let command = CommandLine::from_wire("true").expect("command");

        process.send_command(&command).expect("first send");
        let second = process.send_command(&command);
        let _ = process.wait().expect("wait");

        assert!(matches!(second, Err(BurrowError::Config { .. })));
    }

    #[test]
    fn signal_death_maps_above_128() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut process = shell("kill -9 $$", dir.path()).start().expect("start");

        let status = process.wait().expect("wait");

        assert_eq!(exit_code(status), 128 + 9);
    }
}
