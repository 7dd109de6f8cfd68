// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! repltest binary entry point.

use std::io::IsTerminal;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use repltest::cli::Cli;
use repltest::exit_codes;
use repltest::output_diagnostic::print_error;
use repltest::session;
use repltest::TranscriptDocument;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let transcript = match load_transcript(&cli) {
        Ok(transcript) => transcript,
        Err(e) => {
            print_error(format_args!("{e:#}"));
            std::process::exit(exit_codes::USAGE);
        }
    };

    let verdict = match session::run(&cli.session_config(), &transcript).await {
        Ok(verdict) => verdict,
        Err(e) if e.is_spawn_failure() => {
            print_error(e);
            std::process::exit(exit_codes::SPAWN_FAILURE);
        }
        Err(e) => {
            print_error(e);
            std::process::exit(exit_codes::FAILURE);
        }
    };

    if verdict.is_success() {
        println!("Success! The test session matched the transcript.");
    } else {
        print_error(verdict.report());
    }
    std::process::exit(verdict.exit_code());
}

fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn load_transcript(cli: &Cli) -> anyhow::Result<TranscriptDocument> {
    let path = &cli.transcript;
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read transcript {}", path.display()))?;
    TranscriptDocument::parse(&source)
        .with_context(|| format!("invalid transcript {}", path.display()))
}
