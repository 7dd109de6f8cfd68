// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! PTY (pseudo-terminal) handling.
//!
//! Creates a PTY pair sized to the transcript, spawns the entrypoint on the
//! slave side, and exposes async read/write on the master plus signal and
//! exit-status operations on the child's process group.

use std::ffi::CString;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::time::Duration;

use nix::errno::Errno;
use nix::pty::{forkpty, Winsize};
use nix::sys::signal::{killpg, signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{ForkResult, Pid};
use tokio::io::unix::AsyncFd;
use tokio::time::Instant;

use crate::error::{PtyError, SpawnError};
use crate::nbio::{self, Transfer};
use crate::transcript::Geometry;

/// How often `wait_until` re-checks a child that has not exited yet.
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Lifecycle of the child as seen from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Spawned,
    Running,
    Exited(i32),
}

/// A running PTY session with a child process.
pub struct Pty {
    master_fd: AsyncFd<OwnedFd>,
    child_pid: Pid,
    state: ProcessState,
}

impl Pty {
    /// Spawn `command` (argv form) in a new PTY of the given size.
    ///
    /// The executable is resolved against `PATH` before forking so that a
    /// missing program is reported here instead of as an exit code.
    pub fn spawn(
        command: &[String],
        env: &[(String, String)],
        geometry: Geometry,
    ) -> Result<Self, SpawnError> {
        let program = command.first().ok_or(SpawnError::EmptyCommand)?;
        let path = which::which(program).map_err(|source| SpawnError::NotFound {
            program: program.clone(),
            source,
        })?;

        // Everything the child needs is allocated before the fork.
        let path = c_string(path.as_os_str().as_bytes())?;
        let args = command
            .iter()
            .map(|arg| c_string(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let envp = child_environment(env)
            .iter()
            .map(|entry| c_string(entry.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;

        let winsize = Winsize {
            ws_row: geometry.rows,
            ws_col: geometry.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        // SAFETY: forkpty creates a new PTY and forks. The child only calls
        // async-signal-safe functions (signal, execve, _exit) on data
        // prepared above.
        let result = unsafe { forkpty(&winsize, None)? };

        match result.fork_result {
            ForkResult::Child => {
                // SAFETY: Restoring SIGPIPE to default is safe in the child process
                // before exec. The child has no other threads at this point.
                unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl).ok() };
                let _ = nix::unistd::execve(&path, &args, &envp);
                // SAFETY: _exit skips atexit handlers and stdio flushing, which
                // must not run in a child forked from a multi-threaded process.
                unsafe { nix::libc::_exit(127) }
            }
            ForkResult::Parent { child } => {
                let master_fd = register_master(result.master).inspect_err(|_| abandon_child(child))?;

                tracing::debug!(pid = child.as_raw(), ?geometry, "spawned entrypoint");
                Ok(Self {
                    master_fd,
                    child_pid: child,
                    state: ProcessState::Spawned,
                })
            }
        }
    }

    pub fn pid(&self) -> Pid {
        self.child_pid
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// The master descriptor, for terminal attribute queries.
    pub fn master(&self) -> BorrowedFd<'_> {
        self.master_fd.get_ref().as_fd()
    }

    /// Read output from the PTY. Returns 0 once the slave side has closed.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, PtyError> {
        loop {
            let mut guard = self.master_fd.readable().await?;
            match nbio::read(self.master_fd.get_ref(), buf)? {
                Transfer::Done(n) => return Ok(n),
                Transfer::Closed => return Ok(0),
                Transfer::WouldBlock => guard.clear_ready(),
            }
        }
    }

    /// Read whatever is available right now without waiting.
    ///
    /// `None` means nothing is pending; `Some(0)` means the slave closed.
    pub fn try_read(&self, buf: &mut [u8]) -> Result<Option<usize>, PtyError> {
        match nbio::read(self.master_fd.get_ref(), buf)? {
            Transfer::Done(n) => Ok(Some(n)),
            Transfer::Closed => Ok(Some(0)),
            Transfer::WouldBlock => Ok(None),
        }
    }

    /// Write input to the PTY (sends to the child's stdin).
    ///
    /// Fails with [`PtyError::Closed`] when the child side is gone.
    pub async fn write(&self, data: &[u8]) -> Result<(), PtyError> {
        let mut written = 0;
        while written < data.len() {
            let mut guard = self.master_fd.writable().await?;
            match nbio::write(self.master_fd.get_ref(), &data[written..])? {
                Transfer::Done(n) => written += n,
                Transfer::WouldBlock => guard.clear_ready(),
                Transfer::Closed => return Err(PtyError::Closed),
            }
        }
        Ok(())
    }

    /// Send a signal to the child's process group, reaching its descendants.
    pub fn signal(&self, signal: Signal) -> Result<(), PtyError> {
        match killpg(self.child_pid, signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reap the child if it has exited, without blocking.
    pub fn try_wait(&mut self) -> Result<Option<i32>, PtyError> {
        if let ProcessState::Exited(code) = self.state {
            return Ok(Some(code));
        }

        let code = match waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG))? {
            WaitStatus::Exited(_, code) => code,
            WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
            _ => {
                self.state = ProcessState::Running;
                return Ok(None);
            }
        };

        tracing::debug!(pid = self.child_pid.as_raw(), code, "entrypoint exited");
        self.state = ProcessState::Exited(code);
        Ok(Some(code))
    }

    /// Wait for the child to exit, giving up at `deadline` if one is set.
    pub async fn wait_until(&mut self, deadline: Option<Instant>) -> Result<Option<i32>, PtyError> {
        loop {
            if let Some(code) = self.try_wait()? {
                return Ok(Some(code));
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    WAIT_POLL.min(deadline - now)
                }
                None => WAIT_POLL,
            };
            tokio::time::sleep(pause).await;
        }
    }
}

/// Make the master non-blocking and hand it to the runtime.
fn register_master(master: OwnedFd) -> Result<AsyncFd<OwnedFd>, SpawnError> {
    nbio::set_non_blocking(&master)?;
    Ok(AsyncFd::new(master)?)
}

/// Kill and reap a child whose session could not be set up.
fn abandon_child(child: Pid) {
    tracing::debug!(pid = child.as_raw(), "abandoning entrypoint after failed setup");
    let _ = killpg(child, Signal::SIGKILL);
    let _ = waitpid(child, None);
}

fn c_string(bytes: &[u8]) -> Result<CString, SpawnError> {
    CString::new(bytes).map_err(|_| SpawnError::NulByte(String::from_utf8_lossy(bytes).into_owned()))
}

/// The parent's environment with `TERM=vt100` and the caller's overrides.
fn child_environment(extra: &[(String, String)]) -> Vec<String> {
    let mut vars: Vec<(String, String)> = std::env::vars()
        .filter(|(key, _)| key != "TERM")
        .collect();
    vars.push(("TERM".to_string(), "vt100".to_string()));
    for (key, value) in extra {
        vars.retain(|(existing, _)| existing != key);
        vars.push((key.clone(), value.clone()));
    }
    vars.into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect()
}

#[cfg(test)]
#[path = "pty_tests.rs"]
mod tests;
