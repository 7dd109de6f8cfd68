// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use tempfile::TempDir;

fn events(dir: &TempDir) -> Vec<serde_json::Value> {
    std::fs::read_to_string(dir.path().join("session.jsonl"))
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn recording_creates_files() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a/b");
    let _rec = Recording::new(&nested).unwrap();

    assert!(nested.join("session.jsonl").exists());
    assert!(nested.join("raw.bin").exists());
}

#[test]
fn output_is_teed_to_raw_and_logged() {
    let dir = TempDir::new().unwrap();
    let mut rec = Recording::new(dir.path()).unwrap();

    rec.accept(b"hello").unwrap();
    rec.accept(b" world\r\n").unwrap();
    rec.flush().unwrap();

    let raw = std::fs::read(dir.path().join("raw.bin")).unwrap();
    assert_eq!(raw, b"hello world\r\n");
    let events = events(&dir);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "output");
    assert_eq!(events[1]["bytes"], 8);
    assert!(events[0]["ms"].is_u64());
}

#[test]
fn send_is_escaped_as_json() {
    let dir = TempDir::new().unwrap();
    let mut rec = Recording::new(dir.path()).unwrap();

    rec.log_send(b"say \"hi\"\n").unwrap();
    rec.log_send(&[0x04]).unwrap();
    rec.flush().unwrap();

    let events = events(&dir);
    assert_eq!(events[0]["event"], "send");
    assert_eq!(events[0]["input"], "say \"hi\"\n");
    assert_eq!(events[1]["input"], "\u{4}");
}

#[test]
fn lifecycle_events_are_tagged() {
    let dir = TempDir::new().unwrap();
    let mut rec = Recording::new(dir.path()).unwrap();

    rec.log(&Event::Ready).unwrap();
    rec.log(&Event::End {
        reason: "timed_out".to_string(),
    })
    .unwrap();
    rec.log(&Event::Signal {
        signal: "SIGHUP".to_string(),
    })
    .unwrap();
    rec.log(&Event::Exit { code: 129 }).unwrap();
    rec.flush().unwrap();

    let events = events(&dir);
    let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["ready", "end", "signal", "exit"]);
    assert_eq!(events[1]["reason"], "timed_out");
    assert_eq!(events[3]["code"], 129);
}
