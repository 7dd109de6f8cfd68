// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Side-by-side screen diffs.
//!
//! ```text
//! +-- Expected -+    +--- Actual --+
//! |$ echo hiya  |    |$ echo hiya  |
//! |this is wrong|    |hiya         |
//!  -----------          +
//! |$            |    |$ █          |
//! +-------------+    +-------------+
//! ```
//!
//! Rows are paired by index. Within a row that differs, characters are
//! aligned with a Myers diff: `-` marks characters missing from the actual
//! row, `+` marks characters that are new or changed in it.

use std::fmt;
use std::ops::Range;

use similar::{capture_diff_slices, Algorithm, DiffOp};

use crate::screen::Snapshot;

const GUTTER: &str = "    ";

/// How much of the screen a comparison covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Only cells before the actual cursor, in reading order.
    UntilCursor,
    /// Every cell.
    FullScreen,
}

/// Expected and actual content of one row, with the ranges that differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDiff {
    pub expected: String,
    pub actual: String,
    /// Character ranges of `expected` missing from `actual`.
    pub removed: Vec<Range<usize>>,
    /// Character ranges of `actual` not in `expected`.
    pub inserted: Vec<Range<usize>>,
}

impl RowDiff {
    pub fn is_match(&self) -> bool {
        self.removed.is_empty() && self.inserted.is_empty()
    }
}

/// A failed comparison, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenDiff {
    width: usize,
    rows: Vec<RowDiff>,
}

impl ScreenDiff {
    pub fn rows(&self) -> &[RowDiff] {
        &self.rows
    }

    /// Rows that differ.
    pub fn mismatched_rows(&self) -> impl Iterator<Item = (usize, &RowDiff)> {
        self.rows.iter().enumerate().filter(|(_, row)| !row.is_match())
    }
}

/// Compare two screens. Returns `None` when they match.
///
/// Trailing blanks are insignificant and a row missing on one side reads as
/// blank. The actual column is always rendered with the cursor marker.
pub fn compare(expected: &Snapshot, actual: &Snapshot, check: Check) -> Option<ScreenDiff> {
    let height = expected.rows().max(actual.rows());
    let width = expected.cols().max(actual.cols());
    let shown = actual.with_cursor_marker();
    let cursor = match check {
        Check::UntilCursor => actual.cursor(),
        Check::FullScreen => None,
    };

    let rows: Vec<RowDiff> = (0..height)
        .map(|row| {
            let limit = match cursor {
                Some(cursor) if row < cursor.row => usize::MAX,
                Some(cursor) if row == cursor.row => cursor.col,
                Some(_) => 0,
                None => usize::MAX,
            };
            let old = compared(&expected.row_text(row), limit);
            let new = compared(&actual.row_text(row), limit);
            let (removed, inserted) = changed_ranges(&old, &new);
            RowDiff {
                expected: expected.row_text(row),
                actual: shown.row_text(row),
                removed,
                inserted,
            }
        })
        .collect();

    if rows.iter().all(RowDiff::is_match) {
        return None;
    }
    Some(ScreenDiff { width, rows })
}

/// The part of a row that takes part in the comparison.
fn compared(text: &str, limit: usize) -> Vec<char> {
    let mut chars: Vec<char> = text.chars().take(limit).collect();
    while chars.last() == Some(&' ') {
        chars.pop();
    }
    chars
}

fn changed_ranges(old: &[char], new: &[char]) -> (Vec<Range<usize>>, Vec<Range<usize>>) {
    let mut removed = Vec::new();
    let mut inserted = Vec::new();
    if old == new {
        return (removed, inserted);
    }
    for op in capture_diff_slices(Algorithm::Myers, old, new) {
        match op {
            DiffOp::Equal { .. } => {}
            DiffOp::Delete {
                old_index, old_len, ..
            } => removed.push(old_index..old_index + old_len),
            DiffOp::Insert {
                new_index, new_len, ..
            } => inserted.push(new_index..new_index + new_len),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                removed.push(old_index..old_index + old_len);
                inserted.push(new_index..new_index + new_len);
            }
        }
    }
    (removed, inserted)
}

impl fmt::Display for ScreenDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.width;
        let mut lines = vec![format!(
            "{}{GUTTER}{}",
            border(Some("Expected"), width),
            border(Some("Actual"), width)
        )];

        for row in &self.rows {
            lines.push(format!(
                "{}{GUTTER}{}",
                boxed_row(&row.expected, width),
                boxed_row(&row.actual, width)
            ));
            if !row.is_match() {
                lines.push(format!(
                    " {} {GUTTER} {} ",
                    marker_line(&row.removed, '-', width),
                    marker_line(&row.inserted, '+', width)
                ));
            }
        }

        lines.push(format!("{}{GUTTER}{}", border(None, width), border(None, width)));
        write!(f, "{}", lines.join("\n"))
    }
}

/// Render a single screen in an untitled box with the cursor marker.
pub fn render_screen(snapshot: &Snapshot) -> String {
    let width = snapshot.cols();
    let shown = snapshot.with_cursor_marker();
    let mut lines = vec![border(None, width)];
    lines.extend((0..shown.rows()).map(|row| boxed_row(&shown.row_text(row), width)));
    lines.push(border(None, width));
    lines.join("\n")
}

/// `+-- Title --+`, or a plain rule without a title.
fn border(title: Option<&str>, width: usize) -> String {
    let label = match title {
        Some(title) => {
            let room = width.saturating_sub(2);
            format!(" {} ", title.chars().take(room).collect::<String>())
        }
        None => String::new(),
    };
    let pad = width.saturating_sub(label.chars().count());
    let left = (pad + 1) / 2;
    format!("+{}{}{}+", "-".repeat(left), label, "-".repeat(pad - left))
}

fn boxed_row(text: &str, width: usize) -> String {
    let mut cells: Vec<char> = text.chars().take(width).collect();
    cells.resize(width, ' ');
    format!("|{}|", cells.into_iter().collect::<String>())
}

fn marker_line(ranges: &[Range<usize>], mark: char, width: usize) -> String {
    let mut cells = vec![' '; width];
    for range in ranges {
        for col in range.clone() {
            if let Some(cell) = cells.get_mut(col) {
                *cell = mark;
            }
        }
    }
    cells.into_iter().collect()
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
