// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript documents and their fixture format.
//!
//! A fixture is the terminal screen exactly as it should look at the end of
//! the session, one row per line. Rows that contain typed input mark where
//! the input starts with `«`:
//!
//! ```text
//! $ «echo hiya
//! hiya
//! $ «<C-d>
//! ```
//!
//! The marker is not part of the screen. `««` is a literal `«`. If the input
//! is a single key name such as `<C-d>` or `<Up>`, its bytes are sent without
//! a newline and nothing is expected on screen for it.

use std::collections::VecDeque;
use std::fmt;

use crate::error::TranscriptError;
use crate::screen::{Snapshot, CURSOR_MARKER};
use crate::session::InputSource;

/// Marks the start of typed input within a row.
pub const INPUT_MARKER: char = '«';

/// Terminal size derived from a transcript. Fixed for a whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

/// A named key sent as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    name: String,
    bytes: Vec<u8>,
}

impl Key {
    /// Look up a key by the name used between angle brackets.
    pub fn named(name: &str) -> Option<Self> {
        parse_special_key(name).map(|bytes| Self {
            name: name.to_string(),
            bytes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// What gets typed on an input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A line of text, submitted with a newline and echoed by the entrypoint.
    Text(String),
    /// A single key, not echoed.
    Key(Key),
}

impl Input {
    /// Bytes written to the terminal for this input.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Input::Text(text) => {
                let mut bytes = text.as_bytes().to_vec();
                bytes.push(b'\n');
                bytes
            }
            Input::Key(key) => key.bytes().to_vec(),
        }
    }
}

/// One row of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Content the entrypoint is expected to print.
    Output(String),
    /// A row where the entrypoint prints `prompt` and then waits for `input`.
    Input { prompt: String, input: Input },
}

impl Line {
    /// The row as it should appear on screen.
    pub fn rendered(&self) -> String {
        match self {
            Line::Output(text) => text.clone(),
            Line::Input {
                prompt,
                input: Input::Text(text),
            } => format!("{prompt}{text}"),
            Line::Input {
                prompt,
                input: Input::Key(_),
            } => prompt.clone(),
        }
    }
}

/// An ordered transcript: scripted input plus the expected final screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptDocument {
    lines: Vec<Line>,
    geometry: Geometry,
}

impl TranscriptDocument {
    /// Build a document from already-tagged lines.
    pub fn new(lines: Vec<Line>) -> Result<Self, TranscriptError> {
        if lines.is_empty() {
            return Err(TranscriptError::Empty);
        }

        let cols = lines
            .iter()
            .map(|line| line.rendered().chars().count())
            .max()
            .unwrap_or(0)
            .max(1);
        let rows = lines.len();
        let too_large = || TranscriptError::TooLarge { cols, rows };
        let geometry = Geometry {
            cols: u16::try_from(cols).map_err(|_| too_large())?,
            rows: u16::try_from(rows).map_err(|_| too_large())?,
        };

        Ok(Self { lines, geometry })
    }

    /// Parse fixture text.
    pub fn parse(source: &str) -> Result<Self, TranscriptError> {
        let lines = source
            .lines()
            .enumerate()
            .map(|(index, row)| parse_row(row, index + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(lines)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// The scripted inputs, in order.
    pub fn inputs(&self) -> TranscriptInputs {
        let queue = self
            .lines
            .iter()
            .filter_map(|line| match line {
                Line::Input { input, .. } => Some(input.bytes()),
                Line::Output(_) => None,
            })
            .collect();
        TranscriptInputs { queue }
    }

    /// The screen the session must end on.
    pub fn expected_snapshot(&self) -> Snapshot {
        let rows: Vec<String> = self.lines.iter().map(Line::rendered).collect();
        Snapshot::from_rows(self.geometry.cols as usize, &rows)
    }

    /// Whether the transcript pins the cursor position with a block marker.
    pub fn expects_cursor(&self) -> bool {
        self.lines
            .iter()
            .any(|line| line.rendered().contains(CURSOR_MARKER))
    }
}

impl fmt::Display for TranscriptDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            match line {
                Line::Output(text) => writeln!(f, "{}", escape(text))?,
                Line::Input { prompt, input } => {
                    let typed = match input {
                        Input::Text(text) => escape(text),
                        Input::Key(key) => format!("<{}>", key.name()),
                    };
                    writeln!(f, "{}{INPUT_MARKER}{typed}", escape(prompt))?;
                }
            }
        }
        Ok(())
    }
}

/// Queue of input lines, released one per readiness edge.
#[derive(Debug, Clone, Default)]
pub struct TranscriptInputs {
    queue: VecDeque<Vec<u8>>,
}

impl InputSource for TranscriptInputs {
    fn next_input(&mut self) -> Option<Vec<u8>> {
        self.queue.pop_front()
    }
}

fn parse_row(row: &str, lineno: usize) -> Result<Line, TranscriptError> {
    let mut prompt = String::new();
    let mut typed: Option<String> = None;
    let mut chars = row.chars().peekable();

    while let Some(c) = chars.next() {
        if c == INPUT_MARKER {
            if chars.peek() == Some(&INPUT_MARKER) {
                chars.next();
            } else if typed.is_some() {
                return Err(TranscriptError::DuplicateMarker { line: lineno });
            } else {
                typed = Some(String::new());
                continue;
            }
        }
        match typed.as_mut() {
            Some(text) => text.push(c),
            None => prompt.push(c),
        }
    }

    let Some(text) = typed else {
        return Ok(Line::Output(prompt));
    };

    let input = text
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .and_then(Key::named)
        .map(Input::Key)
        .unwrap_or(Input::Text(text));

    Ok(Line::Input { prompt, input })
}

fn escape(text: &str) -> String {
    text.replace(INPUT_MARKER, "««")
}

fn parse_special_key(key: &str) -> Option<Vec<u8>> {
    let bytes: &[u8] = match key {
        // Arrow keys
        "Up" => b"\x1b[A",
        "Down" => b"\x1b[B",
        "Right" => b"\x1b[C",
        "Left" => b"\x1b[D",

        // Common keys
        "Enter" => b"\r",
        "Tab" => b"\t",
        "Esc" => b"\x1b",
        "Backspace" => b"\x7f",
        "Space" => b" ",

        // Ctrl+letter
        _ => {
            let letter = key.strip_prefix("C-")?;
            let mut chars = letter.chars();
            let c = chars.next()?;
            if chars.next().is_some() || !c.is_ascii_alphabetic() {
                return None;
            }
            return Some(vec![c.to_ascii_lowercase() as u8 - b'a' + 1]);
        }
    };

    Some(bytes.to_vec())
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
