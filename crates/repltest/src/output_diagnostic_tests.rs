// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn error_plain_text_when_not_terminal() {
    let mut buf = Vec::new();
    write_error(&mut buf, "session timed out", false);
    let output = String::from_utf8(buf).unwrap();
    assert_eq!(output, "Error: session timed out\n");
}

#[test]
fn error_colours_only_the_prefix_on_a_terminal() {
    let mut buf = Vec::new();
    write_error(&mut buf, "session timed out", true);
    let output = String::from_utf8(buf).unwrap();
    assert_eq!(output, "\x1b[31mError:\x1b[0m session timed out\n");
}

#[test]
fn warning_plain_text_when_not_terminal() {
    let mut buf = Vec::new();
    write_warning(&mut buf, "Sent SIGTERM to process 42", false);
    let output = String::from_utf8(buf).unwrap();
    assert_eq!(output, "Warning: Sent SIGTERM to process 42\n");
}

#[test]
fn warning_colours_only_the_prefix_on_a_terminal() {
    let mut buf = Vec::new();
    write_warning(&mut buf, "Sent SIGKILL to process 42", true);
    let output = String::from_utf8(buf).unwrap();
    assert_eq!(output, "\x1b[33mWarning:\x1b[0m Sent SIGKILL to process 42\n");
}

#[test]
fn multi_line_error_keeps_body_intact() {
    let mut buf = Vec::new();
    write_error(&mut buf, "Found a discrepancy.\n+--+\n|ab|\n+--+", false);
    let output = String::from_utf8(buf).unwrap();
    assert_eq!(output, "Error: Found a discrepancy.\n+--+\n|ab|\n+--+\n");
}
