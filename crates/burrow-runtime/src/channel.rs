//! One-shot command channel between the runtime and the container init.
//!
//! The channel carries exactly one message: the space-joined command line.
//! The sender writes it and closes its end; the receiver reads until end of
//! stream. Both halves are consumed by use, so a second message cannot be
//! expressed.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use burrow_common::error::{BurrowError, Result};
use burrow_common::types::CommandLine;

/// Write half, kept by the parent.
#[derive(Debug)]
pub struct CommandSender {
    pipe: File,
}

/// Read half, inherited by the container init.
#[derive(Debug)]
pub struct CommandReceiver {
    pipe: File,
}

/// Opens a new channel. Both descriptors are close-on-exec.
///
/// # Errors
///
/// Returns an error if the pipe cannot be created.
pub fn channel() -> Result<(CommandSender, CommandReceiver)> {
    let (read, write) = open_pipe()?;
    Ok((
        CommandSender {
            pipe: File::from(write),
        },
        CommandReceiver {
            pipe: File::from(read),
        },
    ))
}

#[cfg(target_os = "linux")]
fn open_pipe() -> Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC).map_err(|e| BurrowError::Syscall {
        op: "pipe2",
        message: e.to_string(),
    })
}

#[cfg(not(target_os = "linux"))]
fn open_pipe() -> Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe().map_err(|e| BurrowError::Syscall {
        op: "pipe",
        message: e.to_string(),
    })
}

impl CommandSender {
    /// Writes the command line and closes the pipe, signalling end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails, e.g. because the reader is gone.
    pub fn send(mut self, command: &CommandLine) -> Result<()> {
        let message = command.to_wire();
        self.pipe
            .write_all(message.as_bytes())
            .map_err(|e| BurrowError::Syscall {
                op: "write command pipe",
                message: e.to_string(),
            })?;
        tracing::debug!(command = %message, "command sent to container init");
        Ok(())
    }
}

impl CommandReceiver {
    /// Adopts an inherited read end.
    ///
    /// # Safety
    ///
    /// `fd` must be an open descriptor owned by nobody else in this process.
    pub unsafe fn from_raw_fd(fd: RawFd) -> Self {
        // SAFETY: ownership of `fd` is transferred by the caller's contract.
        let owned = unsafe { OwnedFd::from_raw_fd(fd) };
        Self {
            pipe: File::from(owned),
        }
    }

    /// Raw descriptor, for handing the read end to a child process.
    #[must_use]
    pub fn as_raw_fd(&self) -> RawFd {
        self.pipe.as_raw_fd()
    }

    /// Blocks until the sender closes, then parses the command line.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::EmptyCommand`] if nothing but separators was
    /// received, or an error if the read fails.
    pub fn recv(mut self) -> Result<CommandLine> {
        let mut message = String::new();
        let _ = self
            .pipe
            .read_to_string(&mut message)
            .map_err(|e| BurrowError::Syscall {
                op: "read command pipe",
                message: e.to_string(),
            })?;
        CommandLine::from_wire(&message)
    }
}
