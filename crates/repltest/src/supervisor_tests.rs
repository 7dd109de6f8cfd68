// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::cell::{Cell, RefCell};

use super::*;

/// A child that dies on chosen signals, driven by tokio's paused clock.
struct FakeChild {
    fatal: Vec<Signal>,
    exit: Cell<Option<(Instant, i32)>>,
    sent: RefCell<Vec<(Signal, Instant)>>,
}

impl FakeChild {
    fn dying_on(fatal: &[Signal]) -> Self {
        Self {
            fatal: fatal.to_vec(),
            exit: Cell::new(None),
            sent: RefCell::new(Vec::new()),
        }
    }

    fn exited(code: i32) -> Self {
        let child = Self::dying_on(&[]);
        child.exit.set(Some((Instant::now(), code)));
        child
    }

    fn signals(&self) -> Vec<Signal> {
        self.sent.borrow().iter().map(|(signal, _)| *signal).collect()
    }
}

impl ChildProcess for FakeChild {
    fn id(&self) -> i32 {
        4242
    }

    fn signal(&self, signal: Signal) -> Result<(), PtyError> {
        let now = Instant::now();
        self.sent.borrow_mut().push((signal, now));
        if self.exit.get().is_none() && (self.fatal.contains(&signal) || signal == Signal::SIGKILL) {
            self.exit.set(Some((now, 128 + signal as i32)));
        }
        Ok(())
    }

    fn try_wait(&mut self) -> Result<Option<i32>, PtyError> {
        Ok(self
            .exit
            .get()
            .filter(|(at, _)| *at <= Instant::now())
            .map(|(_, code)| code))
    }

    async fn wait_until(&mut self, deadline: Option<Instant>) -> Result<Option<i32>, PtyError> {
        if let Some(code) = self.try_wait()? {
            return Ok(Some(code));
        }
        match (self.exit.get(), deadline) {
            (Some((at, code)), Some(deadline)) if at <= deadline => {
                tokio::time::sleep_until(at).await;
                Ok(Some(code))
            }
            (Some((at, code)), None) => {
                tokio::time::sleep_until(at).await;
                Ok(Some(code))
            }
            (_, Some(deadline)) => {
                tokio::time::sleep_until(deadline).await;
                Ok(None)
            }
            (None, None) => std::future::pending().await,
        }
    }
}

fn policy(term_after: u64, kill_after: u64) -> TimeoutPolicy {
    TimeoutPolicy {
        session_timeout: None,
        cleanup_term_after: Duration::from_millis(term_after),
        cleanup_kill_after: Duration::from_millis(kill_after),
    }
}

#[test]
fn default_policy_waits_a_second_per_step() {
    let policy = TimeoutPolicy::default();
    assert_eq!(policy.session_timeout, None);
    assert_eq!(policy.cleanup_term_after, Duration::from_secs(1));
    assert_eq!(policy.cleanup_kill_after, Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn exited_child_is_not_signalled() {
    let mut child = FakeChild::exited(3);
    let mut supervisor = Supervisor::new(policy(100, 100));

    let termination = supervisor.ensure_exited(&mut child).await.unwrap();

    assert_eq!(termination.exit_code, 3);
    assert!(!termination.hung_up);
    assert!(child.signals().is_empty());
    assert_eq!(supervisor.state, CleanupState::Exited(3));
}

#[tokio::test(start_paused = true)]
async fn hangup_is_enough_for_a_cooperative_child() {
    let mut child = FakeChild::dying_on(&[Signal::SIGHUP]);
    let mut supervisor = Supervisor::new(policy(100, 100));
    let start = Instant::now();

    let termination = supervisor.ensure_exited(&mut child).await.unwrap();

    assert_eq!(child.signals(), vec![Signal::SIGHUP]);
    assert_eq!(termination.exit_code, 128 + Signal::SIGHUP as i32);
    assert!(termination.hung_up);
    assert!(termination.escalations.is_empty());
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn term_follows_hangup_after_the_term_delay() {
    let mut child = FakeChild::dying_on(&[Signal::SIGTERM]);
    let mut supervisor = Supervisor::new(policy(300, 100));
    let start = Instant::now();

    let termination = supervisor.ensure_exited(&mut child).await.unwrap();

    assert_eq!(child.signals(), vec![Signal::SIGHUP, Signal::SIGTERM]);
    assert_eq!(child.sent.borrow()[1].1 - start, Duration::from_millis(300));
    assert_eq!(termination.exit_code, 128 + Signal::SIGTERM as i32);
    assert_eq!(termination.escalations.len(), 1);
    assert_eq!(termination.escalations[0].after, Signal::SIGHUP);
}

#[tokio::test(start_paused = true)]
async fn kill_ends_a_child_that_ignores_hangup_and_term() {
    let mut child = FakeChild::dying_on(&[]);
    let mut supervisor = Supervisor::new(policy(200, 500));
    let start = Instant::now();

    let termination = supervisor.ensure_exited(&mut child).await.unwrap();

    assert_eq!(
        child.signals(),
        vec![Signal::SIGHUP, Signal::SIGTERM, Signal::SIGKILL]
    );
    let sent = child.sent.borrow();
    // Each step is timed from the previous signal.
    assert_eq!(sent[1].1 - sent[0].1, Duration::from_millis(200));
    assert_eq!(sent[2].1 - sent[1].1, Duration::from_millis(500));
    assert_eq!(start.elapsed(), Duration::from_millis(700));
    assert_eq!(termination.exit_code, 128 + Signal::SIGKILL as i32);
    assert_eq!(supervisor.state, CleanupState::Exited(137));
}

#[tokio::test(start_paused = true)]
async fn zero_delays_escalate_immediately() {
    let mut child = FakeChild::dying_on(&[]);
    let mut supervisor = Supervisor::new(policy(0, 0));

    let termination = supervisor.ensure_exited(&mut child).await.unwrap();

    let signals: Vec<Signal> = termination.escalations.iter().map(|e| e.signal).collect();
    assert_eq!(signals, vec![Signal::SIGTERM, Signal::SIGKILL]);
}

#[tokio::test(start_paused = true)]
async fn finished_supervisor_reports_the_same_exit() {
    let mut child = FakeChild::dying_on(&[Signal::SIGHUP]);
    let mut supervisor = Supervisor::new(policy(100, 100));

    let first = supervisor.ensure_exited(&mut child).await.unwrap();
    let second = supervisor.ensure_exited(&mut child).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(child.signals(), vec![Signal::SIGHUP]);
}

#[test]
fn escalation_message_names_signal_and_reason() {
    let escalation = Escalation {
        pid: 7,
        signal: Signal::SIGKILL,
        after: Signal::SIGTERM,
        waited: Duration::from_millis(250),
    };
    assert_eq!(
        escalation.to_string(),
        "Sent SIGKILL to process 7: still running 250ms after SIGTERM"
    );
}
