// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! repltest
//!
//! Drives an interactive program through a pseudo-terminal, typing the input
//! recorded in a transcript each time the program waits for a line, and
//! checks that the emulated screen ends up exactly as the transcript shows.
//!
//! Readiness is detected from the terminal's echo flag, never from prompt
//! text, so the program must disable echo while it reads (any readline-style
//! line editor does).

pub mod cli;
pub mod diff;
pub mod duration;
pub mod error;
pub mod output_diagnostic;
pub mod pty;
pub mod readiness;
pub mod recording;
pub mod screen;
pub mod session;
pub mod supervisor;
pub mod transcript;

mod nbio;

pub use error::{exit_codes, SessionError, SpawnError, TranscriptError};
pub use session::{run, Config, Outcome, Verdict};
pub use transcript::TranscriptDocument;
