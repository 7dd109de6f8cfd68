// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! A tiny line-editing REPL for exercising repltest.
//!
//! Prints the prompt, then reads one line with echo off, echoing keystrokes
//! itself the way readline does. Each line is printed back. `exit [N]`
//! leaves with code N, Ctrl-D on an empty line leaves with code 0.

use std::io::{self, Read, Write};
use std::os::fd::AsFd;

use clap::Parser;
use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg, SpecialCharacterIndices, Termios};

#[derive(Parser, Debug)]
#[command(name = "toy-repl", about = "Echoing line-editor REPL for tests")]
struct Args {
    /// Prompt printed before each line
    #[arg(long, default_value = "> ")]
    prompt: String,

    /// Lines printed once before the first prompt
    #[arg(long)]
    banner: Vec<String>,
}

enum ReadLine {
    Line(String),
    Eof,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut stdout = io::stdout();
    let cooked = tcgetattr(io::stdin().as_fd())?;

    for line in &args.banner {
        writeln!(stdout, "{line}")?;
    }

    loop {
        write!(stdout, "{}", args.prompt)?;
        stdout.flush()?;

        let line = read_line(&cooked, &mut stdout);
        tcsetattr(io::stdin().as_fd(), SetArg::TCSANOW, &cooked)?;
        let line = match line? {
            ReadLine::Line(line) => line,
            ReadLine::Eof => {
                writeln!(stdout)?;
                return Ok(());
            }
        };

        let mut words = line.split_whitespace();
        if words.next() == Some("exit") {
            let code = words.next().and_then(|n| n.parse().ok()).unwrap_or(0);
            stdout.flush()?;
            std::process::exit(code);
        }
        if !line.is_empty() {
            writeln!(stdout, "{line}")?;
        }
    }
}

/// Read one line in raw mode, echoing printable input.
fn read_line(cooked: &Termios, stdout: &mut io::Stdout) -> anyhow::Result<ReadLine> {
    let mut raw = cooked.clone();
    raw.local_flags.remove(LocalFlags::ECHO | LocalFlags::ICANON);
    raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
    tcsetattr(io::stdin().as_fd(), SetArg::TCSANOW, &raw)?;

    let mut line = String::new();
    let mut byte = [0u8; 1];
    loop {
        if io::stdin().read(&mut byte)? == 0 {
            return Ok(ReadLine::Eof);
        }
        match byte[0] {
            b'\r' | b'\n' => {
                writeln!(stdout)?;
                return Ok(ReadLine::Line(line));
            }
            // Ctrl-D
            0x04 if line.is_empty() => return Ok(ReadLine::Eof),
            0x7f | 0x08 => {
                if line.pop().is_some() {
                    write!(stdout, "\x08 \x08")?;
                }
            }
            b if b.is_ascii_graphic() || b == b' ' => {
                line.push(b as char);
                write!(stdout, "{}", b as char)?;
            }
            _ => {}
        }
        stdout.flush()?;
    }
}
