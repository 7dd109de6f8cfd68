// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cleanup of the entrypoint once a session is over.
//!
//! The ladder is HUP, then TERM after `cleanup_term_after`, then KILL after
//! `cleanup_kill_after`, each delay measured from the signal before it.
//! KILL cannot be ignored, so [`Supervisor::ensure_exited`] always returns
//! an exit code.

use std::fmt;
use std::time::Duration;

use nix::sys::signal::Signal;
use tokio::time::Instant;

use crate::error::PtyError;
use crate::output_diagnostic::print_warning;
use crate::pty::Pty;

/// Session deadline and cleanup delays. Fixed for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Deadline for the whole session; `None` waits forever.
    pub session_timeout: Option<Duration>,
    /// How long to wait after SIGHUP before sending SIGTERM.
    pub cleanup_term_after: Duration,
    /// How long to wait after SIGTERM before sending SIGKILL.
    pub cleanup_kill_after: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            session_timeout: None,
            cleanup_term_after: Duration::from_secs(1),
            cleanup_kill_after: Duration::from_secs(1),
        }
    }
}

/// Where the supervisor is on the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupState {
    Alive,
    SentHup,
    SentTerm,
    SentKill,
    Exited(i32),
}

/// The operations the supervisor needs from a child process.
#[allow(async_fn_in_trait)]
pub trait ChildProcess {
    fn id(&self) -> i32;

    /// Deliver a signal to the child and its descendants.
    fn signal(&self, signal: Signal) -> Result<(), PtyError>;

    /// Exit code if the child has already exited.
    fn try_wait(&mut self) -> Result<Option<i32>, PtyError>;

    /// Wait for exit until `deadline`; `None` means wait as long as it takes.
    async fn wait_until(&mut self, deadline: Option<Instant>) -> Result<Option<i32>, PtyError>;
}

impl ChildProcess for Pty {
    fn id(&self) -> i32 {
        self.pid().as_raw()
    }

    fn signal(&self, signal: Signal) -> Result<(), PtyError> {
        Pty::signal(self, signal)
    }

    fn try_wait(&mut self) -> Result<Option<i32>, PtyError> {
        Pty::try_wait(self)
    }

    async fn wait_until(&mut self, deadline: Option<Instant>) -> Result<Option<i32>, PtyError> {
        Pty::wait_until(self, deadline).await
    }
}

/// A signal sent because the previous one did not work in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escalation {
    pub pid: i32,
    pub signal: Signal,
    pub after: Signal,
    pub waited: Duration,
}

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sent {} to process {}: still running {:?} after {}",
            self.signal.as_str(),
            self.pid,
            self.waited,
            self.after.as_str()
        )
    }
}

/// How the child ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    pub exit_code: i32,
    /// Whether the supervisor had to signal the child at all.
    pub hung_up: bool,
    pub escalations: Vec<Escalation>,
}

/// Runs the cleanup ladder for one child.
#[derive(Debug)]
pub struct Supervisor {
    policy: TimeoutPolicy,
    state: CleanupState,
    hung_up: bool,
    escalations: Vec<Escalation>,
}

impl Supervisor {
    pub fn new(policy: TimeoutPolicy) -> Self {
        Self {
            policy,
            state: CleanupState::Alive,
            hung_up: false,
            escalations: Vec::new(),
        }
    }

    /// Make sure the child is dead and return its exit code.
    pub async fn ensure_exited<P: ChildProcess>(
        &mut self,
        child: &mut P,
    ) -> Result<Termination, PtyError> {
        if let CleanupState::Exited(code) = self.state {
            return Ok(self.termination(code));
        }
        if let Some(code) = child.try_wait()? {
            return Ok(self.finish(code));
        }

        child.signal(Signal::SIGHUP)?;
        self.hung_up = true;
        self.transition(CleanupState::SentHup);
        let term_after = self.policy.cleanup_term_after;
        if let Some(code) = child.wait_until(Some(Instant::now() + term_after)).await? {
            return Ok(self.finish(code));
        }

        self.escalate(child, Signal::SIGTERM, Signal::SIGHUP, term_after)?;
        self.transition(CleanupState::SentTerm);
        let kill_after = self.policy.cleanup_kill_after;
        if let Some(code) = child.wait_until(Some(Instant::now() + kill_after)).await? {
            return Ok(self.finish(code));
        }

        self.escalate(child, Signal::SIGKILL, Signal::SIGTERM, kill_after)?;
        self.transition(CleanupState::SentKill);
        loop {
            if let Some(code) = child.wait_until(None).await? {
                return Ok(self.finish(code));
            }
        }
    }

    fn escalate<P: ChildProcess>(
        &mut self,
        child: &P,
        signal: Signal,
        after: Signal,
        waited: Duration,
    ) -> Result<(), PtyError> {
        let escalation = Escalation {
            pid: child.id(),
            signal,
            after,
            waited,
        };
        tracing::debug!(pid = escalation.pid, signal = signal.as_str(), ?waited, "escalating");
        print_warning(escalation);
        self.escalations.push(escalation);
        child.signal(signal)
    }

    fn transition(&mut self, next: CleanupState) {
        tracing::debug!(from = ?self.state, to = ?next, "cleanup state");
        self.state = next;
    }

    fn finish(&mut self, code: i32) -> Termination {
        self.transition(CleanupState::Exited(code));
        self.termination(code)
    }

    fn termination(&self, code: i32) -> Termination {
        Termination {
            exit_code: code,
            hung_up: self.hung_up,
            escalations: self.escalations.clone(),
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
