// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal screen model using avt.
//!
//! Wraps the avt virtual terminal and turns its state into immutable
//! [`Snapshot`]s. The screen never loses rows: anything scrolled off the top
//! is kept in scrollback and reappears above the visible rows in the
//! snapshot, so output taller than the transcript shows up as extra rows in
//! the comparison instead of vanishing.

use crate::transcript::Geometry;

/// Drawn over the cell under the cursor when rendering the actual screen.
pub const CURSOR_MARKER: char = '█';

/// Rows retained after scrolling off the top.
const SCROLLBACK_LIMIT: usize = 10_000;

/// One character cell with the attributes worth showing in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub bold: bool,
    pub underline: bool,
    pub inverse: bool,
}

impl Cell {
    pub fn blank() -> Self {
        Self::plain(' ')
    }

    pub fn plain(ch: char) -> Self {
        Self {
            ch,
            bold: false,
            underline: false,
            inverse: false,
        }
    }

    fn from_vt(cell: &avt::Cell) -> Self {
        let pen = cell.pen();
        Self {
            ch: cell.char(),
            bold: pen.is_bold(),
            underline: pen.is_underline(),
            inverse: pen.is_inverse(),
        }
    }
}

/// Zero-based cursor position, counted from the first retained row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

/// Immutable copy of a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    cols: usize,
    cells: Vec<Vec<Cell>>,
    cursor: Option<Cursor>,
}

impl Snapshot {
    /// Build a cursorless snapshot from text rows, padding each to `cols`.
    pub fn from_rows<S: AsRef<str>>(cols: usize, rows: &[S]) -> Self {
        let cells = rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Cell> = row.as_ref().chars().map(Cell::plain).collect();
                if cells.len() < cols {
                    cells.resize(cols, Cell::blank());
                }
                cells
            })
            .collect();
        Self {
            cols,
            cells,
            cursor: None,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|cells| cells.get(col))
    }

    /// Text of one row, full width. Rows past the end read as empty.
    pub fn row_text(&self, row: usize) -> String {
        self.cells
            .get(row)
            .map(|cells| cells.iter().map(|cell| cell.ch).collect())
            .unwrap_or_default()
    }

    /// Every row with trailing blanks removed.
    pub fn text_rows(&self) -> Vec<String> {
        (0..self.rows())
            .map(|row| self.row_text(row).trim_end().to_string())
            .collect()
    }

    /// A copy with the cursor cell replaced by [`CURSOR_MARKER`].
    ///
    /// A cursor parked past the last column (pending wrap) has no cell and
    /// leaves the snapshot unchanged.
    pub fn with_cursor_marker(&self) -> Snapshot {
        let mut marked = self.clone();
        if let Some(cursor) = self.cursor {
            if let Some(cell) = marked
                .cells
                .get_mut(cursor.row)
                .and_then(|cells| cells.get_mut(cursor.col))
            {
                *cell = Cell::plain(CURSOR_MARKER);
            }
        }
        marked
    }
}

/// Terminal screen state fed by raw output bytes.
pub struct Screen {
    vt: avt::Vt,
    cols: usize,
    rows: usize,
    /// Trailing bytes of an incomplete UTF-8 sequence split across reads.
    pending: Vec<u8>,
}

impl Screen {
    /// Create a new screen buffer.
    pub fn new(geometry: Geometry) -> Self {
        let vt = avt::Vt::builder()
            .size(geometry.cols as usize, geometry.rows as usize)
            .scrollback_limit(SCROLLBACK_LIMIT)
            .build();
        Self {
            vt,
            cols: geometry.cols as usize,
            rows: geometry.rows as usize,
            pending: Vec::new(),
        }
    }

    /// Feed raw terminal output through the parser.
    ///
    /// Invalid bytes become U+FFFD. An incomplete sequence at the end is
    /// held back until the next read completes it.
    pub fn feed(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
        let mut text = String::new();
        let mut rest = self.pending.as_slice();
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        let held = rest.len();
        let consumed = self.pending.len() - held;
        self.pending.drain(..consumed);
        if !text.is_empty() {
            self.vt.feed_str(&text);
        }
    }

    /// Number of rows scrolled into scrollback so far.
    fn scrolled(&self) -> usize {
        self.vt.lines().count().saturating_sub(self.rows)
    }

    /// Cursor position counted from the first retained row.
    pub fn cursor(&self) -> Cursor {
        let cursor = self.vt.cursor();
        Cursor {
            row: self.scrolled() + cursor.row,
            col: cursor.col,
        }
    }

    /// Immutable copy of everything on screen plus scrollback.
    pub fn snapshot(&self) -> Snapshot {
        let cells = self
            .vt
            .lines()
            .map(|line| line.cells().iter().map(Cell::from_vt).collect())
            .collect();
        Snapshot {
            cols: self.cols,
            cells,
            cursor: Some(self.cursor()),
        }
    }
}

#[cfg(test)]
#[path = "screen_tests.rs"]
mod tests;
