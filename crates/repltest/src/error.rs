// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared across the session driver.

use std::io;

use nix::errno::Errno;
use thiserror::Error;

/// Exit codes for the `repltest` binary.
pub mod exit_codes {
    /// The session matched the transcript.
    pub const SUCCESS: i32 = 0;
    /// Mismatch, timeout, or nonzero exit of the entrypoint.
    pub const FAILURE: i32 = 1;
    /// The transcript could not be read or parsed.
    pub const USAGE: i32 = 2;
    /// The entrypoint could not be spawned; no session was started.
    pub const SPAWN_FAILURE: i32 = 127;
}

/// The entrypoint could not be started. Fatal, nothing to clean up.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("no command given")]
    EmptyCommand,

    #[error("cannot resolve executable {program:?}: {source}")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("argument or environment entry contains a NUL byte: {0:?}")]
    NulByte(String),

    #[error("failed to allocate a pseudo-terminal: {0}")]
    Pty(#[from] Errno),

    #[error("failed to register the terminal with the runtime: {0}")]
    Io(#[from] io::Error),
}

/// Failures on an already-spawned PTY.
#[derive(Debug, Error)]
pub enum PtyError {
    /// The slave side is gone (EIO/EPIPE). Treated as end of output.
    #[error("terminal closed")]
    Closed,

    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("system call failed: {0}")]
    Sys(#[from] Errno),
}

/// A transcript fixture could not be turned into a document.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("transcript is empty")]
    Empty,

    #[error("line {line}: more than one input marker")]
    DuplicateMarker { line: usize },

    #[error("transcript is {cols}x{rows}, larger than a terminal can be")]
    TooLarge { cols: usize, rows: usize },
}

/// Failures that abort a session after spawn.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Pty(#[from] PtyError),

    #[error("failed to write session recording: {0}")]
    Recording(#[source] io::Error),
}

impl SessionError {
    /// Whether the session never started.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, SessionError::Spawn(_))
    }
}
