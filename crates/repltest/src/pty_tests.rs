// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;

const GEOMETRY: Geometry = Geometry { cols: 40, rows: 5 };

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

async fn read_to_end(pty: &Pty) -> String {
    let mut output = Vec::new();
    let mut buf = [0u8; 1024];
    let read_all = async {
        loop {
            let n = pty.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            output.extend_from_slice(&buf[..n]);
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read_all)
        .await
        .unwrap();
    String::from_utf8_lossy(&output).into_owned()
}

#[tokio::test]
async fn empty_command_is_rejected() {
    assert!(matches!(
        Pty::spawn(&[], &[], GEOMETRY),
        Err(SpawnError::EmptyCommand)
    ));
}

#[tokio::test]
async fn unknown_executable_fails_before_fork() {
    let command = vec!["repltest-no-such-program".to_string()];
    assert!(matches!(
        Pty::spawn(&command, &[], GEOMETRY),
        Err(SpawnError::NotFound { .. })
    ));
}

#[tokio::test]
async fn nul_in_argument_is_rejected() {
    assert!(matches!(
        Pty::spawn(&sh("echo \0"), &[], GEOMETRY),
        Err(SpawnError::NulByte(_))
    ));
}

#[tokio::test]
async fn output_is_read_until_the_slave_closes() {
    let mut pty = Pty::spawn(&sh("printf 'hello\\n'"), &[], GEOMETRY).unwrap();
    assert_eq!(pty.state(), ProcessState::Spawned);

    assert_eq!(read_to_end(&pty).await, "hello\r\n");
    assert_eq!(pty.wait_until(None).await.unwrap(), Some(0));
    assert_eq!(pty.state(), ProcessState::Exited(0));
}

#[tokio::test]
async fn terminal_has_the_requested_size() {
    let mut pty = Pty::spawn(&sh("stty size"), &[], GEOMETRY).unwrap();
    assert_eq!(read_to_end(&pty).await.trim(), "5 40");
    pty.wait_until(None).await.unwrap();
}

#[tokio::test]
async fn child_sees_term_and_extra_environment() {
    let env = vec![("REPLTEST_GREETING".to_string(), "hi".to_string())];
    let mut pty = Pty::spawn(&sh("printf '%s %s' \"$TERM\" \"$REPLTEST_GREETING\""), &env, GEOMETRY).unwrap();
    assert_eq!(read_to_end(&pty).await, "vt100 hi");
    pty.wait_until(None).await.unwrap();
}

#[tokio::test]
async fn written_input_reaches_the_child() {
    let mut pty = Pty::spawn(&sh("read line; echo \"got $line\""), &[], GEOMETRY).unwrap();
    pty.write(b"ping\n").await.unwrap();
    let output = read_to_end(&pty).await;
    assert!(output.ends_with("got ping\r\n"), "{output:?}");
    pty.wait_until(None).await.unwrap();
}

#[tokio::test]
async fn exit_code_is_reported() {
    let mut pty = Pty::spawn(&sh("exit 3"), &[], GEOMETRY).unwrap();
    read_to_end(&pty).await;
    assert_eq!(pty.wait_until(None).await.unwrap(), Some(3));
    // Reaping is idempotent.
    assert_eq!(pty.try_wait().unwrap(), Some(3));
}

#[tokio::test]
async fn deadline_bounds_the_wait() {
    let mut pty = Pty::spawn(&sh("sleep 5"), &[], GEOMETRY).unwrap();
    let deadline = Instant::now() + Duration::from_millis(50);
    assert_eq!(pty.wait_until(Some(deadline)).await.unwrap(), None);
    assert_eq!(pty.state(), ProcessState::Running);

    pty.signal(Signal::SIGKILL).unwrap();
    assert_eq!(pty.wait_until(None).await.unwrap(), Some(128 + Signal::SIGKILL as i32));
}

#[test]
fn child_environment_overrides_term_and_appends_extras() {
    let extra = vec![
        ("TERM".to_string(), "dumb".to_string()),
        ("REPLTEST_A".to_string(), "1".to_string()),
        ("REPLTEST_A".to_string(), "2".to_string()),
    ];
    let vars = child_environment(&extra);
    assert_eq!(vars.iter().filter(|v| v.starts_with("TERM=")).count(), 1);
    assert!(vars.contains(&"TERM=dumb".to_string()));
    assert!(vars.contains(&"REPLTEST_A=2".to_string()));
    assert!(!vars.contains(&"REPLTEST_A=1".to_string()));
}

#[tokio::test]
async fn abandoned_child_is_killed_and_reaped() {
    let pty = Pty::spawn(&sh("sleep 5"), &[], GEOMETRY).unwrap();
    let pid = pty.pid();

    abandon_child(pid);

    assert_eq!(
        waitpid(pid, Some(WaitPidFlag::WNOHANG)),
        Err(Errno::ECHILD)
    );
}

#[tokio::test]
async fn failed_exec_exits_127() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::TempDir::new().unwrap();
    let program = dir.path().join("not-a-program");
    std::fs::write(&program, [0u8, 1, 2, 3]).unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

    let command = vec![program.to_string_lossy().into_owned()];
    let mut pty = Pty::spawn(&command, &[], GEOMETRY).unwrap();
    read_to_end(&pty).await;
    assert_eq!(pty.wait_until(None).await.unwrap(), Some(127));
}
