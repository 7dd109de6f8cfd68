// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Shared helpers for driving the repltest binary.

#![allow(dead_code)]

use std::io::Write;
use std::time::Duration;

use assert_cmd::Command;
use tempfile::NamedTempFile;

/// Upper bound for any single test session.
pub const SAFETY_TIMEOUT: &str = "--timeout=10s";

/// Write a transcript fixture to a temporary file.
pub fn write_transcript(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// The repltest binary with a hard wall-clock limit.
pub fn repltest() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_repltest"));
    cmd.timeout(Duration::from_secs(30));
    cmd
}

/// Path of the toy REPL used as an entrypoint.
pub fn toy_repl() -> &'static str {
    env!("CARGO_BIN_EXE_toy-repl")
}
