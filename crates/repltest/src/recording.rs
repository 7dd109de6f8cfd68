// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Recording of a session: raw PTY dump plus a JSONL event log.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::session::OutputSink;

/// One line of `session.jsonl`, without its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Output { bytes: usize },
    Ready,
    Send { input: String },
    End { reason: String },
    Signal { signal: String },
    Exit { code: i32 },
}

#[derive(Serialize)]
struct Entry<'a> {
    ms: u64,
    #[serde(flatten)]
    event: &'a Event,
}

pub struct Recording {
    start: Instant,
    jsonl: BufWriter<File>,
    raw: BufWriter<File>,
}

impl Recording {
    /// Create `dir` if needed and open fresh `session.jsonl` and `raw.bin` in it.
    pub fn new(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            start: Instant::now(),
            jsonl: BufWriter::new(create(&dir.join("session.jsonl"))?),
            raw: BufWriter::new(create(&dir.join("raw.bin"))?),
        })
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn log(&mut self, event: &Event) -> io::Result<()> {
        let entry = Entry {
            ms: self.elapsed_ms(),
            event,
        };
        serde_json::to_writer(&mut self.jsonl, &entry)?;
        self.jsonl.write_all(b"\n")
    }

    pub fn log_send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.log(&Event::Send {
            input: String::from_utf8_lossy(bytes).into_owned(),
        })
    }

    pub fn append_raw(&mut self, data: &[u8]) -> io::Result<()> {
        self.raw.write_all(data)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.jsonl.flush()?;
        self.raw.flush()
    }
}

impl OutputSink for Recording {
    fn accept(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.append_raw(chunk)?;
        self.log(&Event::Output { bytes: chunk.len() })
    }
}

fn create(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
#[path = "recording_tests.rs"]
mod tests;
