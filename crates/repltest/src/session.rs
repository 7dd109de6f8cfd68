// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript playback.
//!
//! One coordination loop per session multiplexes PTY output, periodic echo
//! samples and the session deadline. Output is fed to the screen in arrival
//! order. An input is written only on a poll tick that finds the entrypoint
//! reading: an Echoing → NotEchoing edge has been seen since the last write,
//! echo is still off, the cursor has left the row of the last input, and no
//! output arrived since the previous tick.
//!
//! The session ends when output closes, when the entrypoint asks for input
//! the transcript does not have, when the screen diverges from the
//! transcript at a prompt, or when the deadline fires. The child is then
//! handed to the [`Supervisor`] and the final screen is compared.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::diff::{self, Check, ScreenDiff};
use crate::error::{exit_codes, PtyError, SessionError};
use crate::pty::Pty;
use crate::readiness::{current_echo_state, EchoState, ReadinessTracker};
use crate::recording::{Event, Recording};
use crate::screen::{Screen, Snapshot};
use crate::supervisor::{Supervisor, Termination, TimeoutPolicy};
use crate::transcript::TranscriptDocument;

/// Default interval between echo samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

const READ_CHUNK: usize = 4096;

/// Supplies scripted input, one chunk per readiness release.
pub trait InputSource {
    /// The next chunk to write, or `None` once the script is exhausted.
    fn next_input(&mut self) -> Option<Vec<u8>>;
}

/// Receives output chunks in arrival order.
pub trait OutputSink {
    fn accept(&mut self, chunk: &[u8]) -> io::Result<()>;
}

/// Everything needed to run one session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Entrypoint argv; the first element is resolved against `PATH`.
    pub command: Vec<String>,
    /// Added to the inherited environment, after `TERM=vt100`.
    pub env: Vec<(String, String)>,
    pub policy: TimeoutPolicy,
    pub poll_interval: Duration,
    pub check_exit_code: bool,
    pub record_dir: Option<PathBuf>,
}

impl Config {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            env: Vec::new(),
            policy: TimeoutPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            check_exit_code: false,
            record_dir: None,
        }
    }
}

/// Player lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Spawning,
    Running,
    Succeeded,
    TimedOut,
    Mismatched,
}

/// Why the coordination loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// Every slave descriptor closed.
    OutputClosed,
    /// The entrypoint asked for input after the last scripted line.
    InputExhausted,
    /// The screen before the cursor stopped matching at a prompt.
    Diverged(ScreenDiff),
    TimedOut,
}

impl EndReason {
    fn label(&self) -> &'static str {
        match self {
            EndReason::OutputClosed => "output_closed",
            EndReason::InputExhausted => "input_exhausted",
            EndReason::Diverged(_) => "diverged",
            EndReason::TimedOut => "timed_out",
        }
    }
}

/// Result of the screen comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Mismatched(ScreenDiff),
    /// The deadline fired; the screen is not compared.
    TimedOut,
}

/// Final result of a session.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub outcome: Outcome,
    pub termination: Termination,
    pub final_screen: Snapshot,
    command: Vec<String>,
    check_exit_code: bool,
}

impl Verdict {
    pub fn state(&self) -> PlayerState {
        match self.outcome {
            Outcome::Succeeded => PlayerState::Succeeded,
            Outcome::Mismatched(_) => PlayerState::Mismatched,
            Outcome::TimedOut => PlayerState::TimedOut,
        }
    }

    pub fn exit_code_violation(&self) -> Option<i32> {
        let code = self.termination.exit_code;
        (self.check_exit_code && code != 0).then_some(code)
    }

    /// User-facing problems, in reporting order. Empty on success.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.outcome == Outcome::TimedOut {
            issues.push("session timed out".to_string());
        }
        if let Some(code) = self.exit_code_violation() {
            issues.push(format!(
                "`{}` exited with nonzero exit code: {code}",
                self.command.join(" ")
            ));
        }
        if let Outcome::Mismatched(diff) = &self.outcome {
            issues.push(format!("Found a discrepancy. See diff below:\n{diff}"));
        }
        issues
    }

    pub fn is_success(&self) -> bool {
        self.issues().is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            exit_codes::SUCCESS
        } else {
            exit_codes::FAILURE
        }
    }

    /// The failure report: issues, then the final screen.
    pub fn report(&self) -> String {
        format!(
            "{}\nFinal state of screen:\n{}",
            self.issues().join("\n"),
            diff::render_screen(&self.final_screen)
        )
    }
}

/// Run `transcript` against the configured entrypoint.
pub async fn run(config: &Config, transcript: &TranscriptDocument) -> Result<Verdict, SessionError> {
    let mut inputs = transcript.inputs();
    run_with(config, transcript, &mut inputs).await
}

/// Like [`run`], with the scripted input supplied by the caller.
pub async fn run_with<I: InputSource>(
    config: &Config,
    transcript: &TranscriptDocument,
    inputs: &mut I,
) -> Result<Verdict, SessionError> {
    let recording = config
        .record_dir
        .as_deref()
        .map(Recording::new)
        .transpose()
        .map_err(SessionError::Recording)?;

    let mut player = Player::new(config, transcript, recording);
    player.transition(PlayerState::Spawning);
    let mut pty = Pty::spawn(&config.command, &config.env, transcript.geometry())?;
    player.transition(PlayerState::Running);

    let deadline = config.policy.session_timeout.map(|t| Instant::now() + t);
    let end = player.play(&pty, inputs, deadline).await;

    // The child is reaped even when the loop failed.
    let termination = Supervisor::new(config.policy).ensure_exited(&mut pty).await?;
    let end = end?;
    player.log_termination(&end, &termination)?;

    let final_screen = player.screen.snapshot();
    let outcome = match end {
        EndReason::TimedOut => Outcome::TimedOut,
        EndReason::Diverged(diff) => Outcome::Mismatched(diff),
        EndReason::OutputClosed | EndReason::InputExhausted => {
            match player.compare(Check::FullScreen) {
                Some(diff) => Outcome::Mismatched(diff),
                None => Outcome::Succeeded,
            }
        }
    };

    let verdict = Verdict {
        outcome,
        termination,
        final_screen,
        command: config.command.clone(),
        check_exit_code: config.check_exit_code,
    };
    player.transition(verdict.state());
    Ok(verdict)
}

/// State owned by one session's coordination loop.
struct Player {
    state: PlayerState,
    poll_interval: Duration,
    screen: Screen,
    expected: Snapshot,
    expects_cursor: bool,
    readiness: ReadinessTracker,
    /// Cursor row when the last input was written.
    last_input_row: Option<usize>,
    recording: Option<Recording>,
}

impl Player {
    fn new(config: &Config, transcript: &TranscriptDocument, recording: Option<Recording>) -> Self {
        Self {
            state: PlayerState::Idle,
            poll_interval: config.poll_interval,
            screen: Screen::new(transcript.geometry()),
            expected: transcript.expected_snapshot(),
            expects_cursor: transcript.expects_cursor(),
            readiness: ReadinessTracker::new(),
            last_input_row: None,
            recording,
        }
    }

    fn transition(&mut self, next: PlayerState) {
        tracing::debug!(from = ?self.state, to = ?next, "player state");
        self.state = next;
    }

    async fn play<I: InputSource>(
        &mut self,
        pty: &Pty,
        inputs: &mut I,
        deadline: Option<Instant>,
    ) -> Result<EndReason, SessionError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut buf = [0u8; READ_CHUNK];
        let mut output_since_tick = false;

        loop {
            tokio::select! {
                biased;

                _ = deadline_reached(deadline) => return Ok(EndReason::TimedOut),

                read = pty.read(&mut buf) => {
                    let n = read?;
                    if n == 0 {
                        return Ok(EndReason::OutputClosed);
                    }
                    self.feed(&buf[..n])?;
                    output_since_tick = true;
                }

                _ = ticker.tick() => {
                    match self.drain(pty)? {
                        Drained::Closed => return Ok(EndReason::OutputClosed),
                        Drained::Output => output_since_tick = true,
                        Drained::Nothing => {}
                    }
                    let echo = current_echo_state(pty.master()).map_err(PtyError::from)?;
                    if self.readiness.observe(echo) {
                        tracing::debug!(cursor = ?self.screen.cursor(), "echo turned off");
                    }
                    let quiet = !std::mem::take(&mut output_since_tick);
                    if !(quiet && self.at_prompt(echo)) {
                        continue;
                    }
                    if let Some(end) = self.release(pty, inputs, deadline).await? {
                        return Ok(end);
                    }
                }
            }
        }
    }

    fn at_prompt(&self, echo: EchoState) -> bool {
        self.readiness.is_armed()
            && echo == EchoState::NotEchoing
            && self.last_input_row != Some(self.screen.cursor().row)
    }

    /// Check the screen so far and write the next input.
    async fn release<I: InputSource>(
        &mut self,
        pty: &Pty,
        inputs: &mut I,
        deadline: Option<Instant>,
    ) -> Result<Option<EndReason>, SessionError> {
        let cursor = self.screen.cursor();
        tracing::debug!(row = cursor.row, col = cursor.col, "entrypoint is reading");
        self.log(&Event::Ready)?;

        if let Some(diff) = self.compare(Check::UntilCursor) {
            return Ok(Some(EndReason::Diverged(diff)));
        }
        let Some(input) = inputs.next_input() else {
            return Ok(Some(EndReason::InputExhausted));
        };

        tracing::debug!(input = %String::from_utf8_lossy(&input).escape_debug(), "sending");
        if let Some(recording) = self.recording.as_mut() {
            recording.log_send(&input).map_err(SessionError::Recording)?;
        }
        let write = pty.write(&input);
        let written = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, write).await {
                Ok(written) => written,
                Err(_) => return Ok(Some(EndReason::TimedOut)),
            },
            None => write.await,
        };
        match written {
            Ok(()) => {}
            Err(PtyError::Closed) => return Ok(Some(EndReason::OutputClosed)),
            Err(e) => return Err(e.into()),
        }

        self.last_input_row = Some(cursor.row);
        self.readiness.consume();
        Ok(None)
    }

    /// Read everything already pending on the master.
    fn drain(&mut self, pty: &Pty) -> Result<Drained, SessionError> {
        let mut buf = [0u8; READ_CHUNK];
        let mut drained = Drained::Nothing;
        while let Some(n) = pty.try_read(&mut buf)? {
            if n == 0 {
                return Ok(Drained::Closed);
            }
            self.feed(&buf[..n])?;
            drained = Drained::Output;
        }
        Ok(drained)
    }

    fn feed(&mut self, chunk: &[u8]) -> Result<(), SessionError> {
        tracing::trace!(bytes = chunk.len(), "output");
        self.screen.feed(chunk);
        if let Some(recording) = self.recording.as_mut() {
            recording.accept(chunk).map_err(SessionError::Recording)?;
        }
        Ok(())
    }

    fn compare(&self, check: Check) -> Option<ScreenDiff> {
        let actual = self.screen.snapshot();
        let actual = if self.expects_cursor {
            actual.with_cursor_marker()
        } else {
            actual
        };
        diff::compare(&self.expected, &actual, check)
    }

    fn log(&mut self, event: &Event) -> Result<(), SessionError> {
        match self.recording.as_mut() {
            Some(recording) => recording.log(event).map_err(SessionError::Recording),
            None => Ok(()),
        }
    }

    fn log_termination(&mut self, end: &EndReason, termination: &Termination) -> Result<(), SessionError> {
        tracing::debug!(reason = end.label(), exit_code = termination.exit_code, "session over");
        let Some(recording) = self.recording.as_mut() else {
            return Ok(());
        };
        let mut events = vec![Event::End {
            reason: end.label().to_string(),
        }];
        if termination.hung_up {
            events.push(Event::Signal {
                signal: "SIGHUP".to_string(),
            });
        }
        events.extend(termination.escalations.iter().map(|escalation| Event::Signal {
            signal: escalation.signal.as_str().to_string(),
        }));
        events.push(Event::Exit {
            code: termination.exit_code,
        });
        for event in &events {
            recording.log(event).map_err(SessionError::Recording)?;
        }
        recording.flush().map_err(SessionError::Recording)
    }
}

enum Drained {
    Nothing,
    Output,
    Closed,
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
