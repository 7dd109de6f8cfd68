// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Readiness detection from the terminal's echo flag.
//!
//! Line editors switch the terminal to raw mode with echo off while they
//! read a line, and back to cooked mode with echo on while the program
//! works. An Echoing → NotEchoing edge is therefore the moment the
//! entrypoint starts waiting for input, whatever its prompt looks like.
//!
//! The flag is sampled, not watched, so a window shorter than the poll
//! interval can be missed. The poll interval is the minimum time an
//! entrypoint must stay in its reading state to be observed reliably.

use std::os::fd::AsFd;

use nix::sys::termios::{tcgetattr, LocalFlags};

/// Local-echo state of the terminal line discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoState {
    Echoing,
    NotEchoing,
}

/// Sample the echo flag of the terminal behind `fd`.
///
/// On the master side of a PTY this reports the slave's settings.
pub fn current_echo_state<Fd: AsFd>(fd: Fd) -> nix::Result<EchoState> {
    let termios = tcgetattr(fd)?;
    if termios.local_flags.contains(LocalFlags::ECHO) {
        Ok(EchoState::Echoing)
    } else {
        Ok(EchoState::NotEchoing)
    }
}

/// Turns a series of echo samples into readiness edges.
///
/// A fresh terminal is in cooked mode, so the tracker starts as if the last
/// sample was `Echoing`: an entrypoint that disables echo before the first
/// sample still produces an edge.
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    last: EchoState,
    edge_seen: bool,
}

impl Default for ReadinessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessTracker {
    pub fn new() -> Self {
        Self {
            last: EchoState::Echoing,
            edge_seen: false,
        }
    }

    /// Record a sample. Returns true if it completes an Echoing → NotEchoing edge.
    ///
    /// An `Echoing` sample disarms any earlier edge: echo went back on, so
    /// the entrypoint is no longer in that read.
    pub fn observe(&mut self, state: EchoState) -> bool {
        let edge = self.last == EchoState::Echoing && state == EchoState::NotEchoing;
        if edge {
            self.edge_seen = true;
        } else if state == EchoState::Echoing {
            self.edge_seen = false;
        }
        self.last = state;
        edge
    }

    /// Whether echo went off and has stayed off since the last
    /// [`consume`](Self::consume).
    pub fn is_armed(&self) -> bool {
        self.edge_seen
    }

    /// Spend the pending edge after input has been written.
    ///
    /// The entrypoint passes through cooked mode while it handles the line,
    /// so the next prompt must show up as a new edge. If it re-enters raw
    /// mode faster than one poll, that intermediate state is never sampled;
    /// treating the last state as `Echoing` lets the next raw sample count.
    pub fn consume(&mut self) {
        self.edge_seen = false;
        self.last = EchoState::Echoing;
    }
}

#[cfg(test)]
#[path = "readiness_tests.rs"]
mod tests;
