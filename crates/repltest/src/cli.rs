// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::duration::parse_duration;
use crate::session::{Config, DEFAULT_POLL_INTERVAL};
use crate::supervisor::TimeoutPolicy;

/// Verify that a REPL reproduces a transcript.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "repltest",
    version,
    about = "Verify that an interactive program reproduces a transcript",
    after_help = "Durations are <count><unit> with unit one of us, ms, s, m, h, d, w."
)]
pub struct Cli {
    /// Transcript fixture; mark typed input with «
    #[arg(value_name = "TRANSCRIPT")]
    pub transcript: PathBuf,

    /// Entrypoint to run, with its arguments
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,

    /// How long the test session is allowed to run
    #[arg(long, env = "REPLTEST_TIMEOUT", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// How long to wait after SIGHUP before sending SIGTERM
    #[arg(long, env = "REPLTEST_CLEANUP_TERM_AFTER", value_parser = parse_duration, default_value = "1s")]
    pub cleanup_term_after: Duration,

    /// How long to wait after SIGTERM before sending SIGKILL
    #[arg(long, env = "REPLTEST_CLEANUP_KILL_AFTER", value_parser = parse_duration, default_value = "1s")]
    pub cleanup_kill_after: Duration,

    /// How often to sample the terminal's echo flag.
    /// The entrypoint must wait for input at least this long to be noticed.
    #[arg(long, env = "REPLTEST_POLL_INTERVAL", value_parser = parse_poll_interval, default_value = "20ms")]
    pub poll_interval: Duration,

    /// Fail if the entrypoint exits with a nonzero code
    #[arg(long, env = "REPLTEST_CHECK_EXIT_CODE")]
    pub check_exit_code: bool,

    /// Extra environment for the entrypoint (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_entry)]
    pub env: Vec<(String, String)>,

    /// Record raw output and session events into this directory
    #[arg(long, env = "REPLTEST_RECORD", value_name = "DIR")]
    pub record: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn session_config(&self) -> Config {
        Config {
            command: self.command.clone(),
            env: self.env.clone(),
            policy: TimeoutPolicy {
                session_timeout: self.timeout,
                cleanup_term_after: self.cleanup_term_after,
                cleanup_kill_after: self.cleanup_kill_after,
            },
            poll_interval: self.poll_interval,
            check_exit_code: self.check_exit_code,
            record_dir: self.record.clone(),
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn parse_poll_interval(value: &str) -> Result<Duration, String> {
    let interval = parse_duration(value).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err(format!(
            "poll interval must be positive (default {DEFAULT_POLL_INTERVAL:?})"
        ));
    }
    Ok(interval)
}

fn parse_env_entry(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {value:?}")),
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
