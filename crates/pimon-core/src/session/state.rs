//! Session lifecycle state machines.
//!
//! # The two lifecycles
//!
//! ```text
//! Reporter:  Idle ─► Connecting ─► Connected ─► Sending ─► Closed
//! Monitor:   Listening ─► WaitingForClient ─► Connected ─► Receiving ─► Closed
//! ```
//!
//! In addition, every state except `Closed` may jump straight to `Closed`
//! (a stop request before connecting, a failed connect, a failed bind, ...).
//! `Closed` is terminal: a finished session is never resumed, a new run is
//! required.
//!
//! [`StateMachine`] enforces these rules for either role and remembers *why*
//! the session closed.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

/// Common behaviour of the reporter and monitor lifecycle enums.
pub trait SessionState: Copy + Eq + fmt::Debug + fmt::Display {
    /// The state a new session starts in.
    const INITIAL: Self;

    /// The terminal state.
    const CLOSED: Self;

    /// Returns `true` if `next` directly follows `self` in the forward
    /// lifecycle.  Transitions into `CLOSED` are handled separately by
    /// [`StateMachine::close`].
    fn can_advance_to(self, next: Self) -> bool;
}

/// Reporter-side lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReporterState {
    /// Created, not yet connecting.
    Idle,
    /// TCP connect in progress.
    Connecting,
    /// TCP connection established.
    Connected,
    /// Per-tick send loop running.
    Sending,
    /// Session finished; terminal.
    Closed,
}

impl SessionState for ReporterState {
    const INITIAL: Self = ReporterState::Idle;
    const CLOSED: Self = ReporterState::Closed;

    fn can_advance_to(self, next: Self) -> bool {
        use ReporterState::*;
        matches!(
            (self, next),
            (Idle, Connecting) | (Connecting, Connected) | (Connected, Sending)
        )
    }
}

impl fmt::Display for ReporterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReporterState::Idle => "idle",
            ReporterState::Connecting => "connecting",
            ReporterState::Connected => "connected",
            ReporterState::Sending => "sending",
            ReporterState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Monitor-side lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorState {
    /// Creating and binding the listening socket.
    Listening,
    /// Socket bound; polling accept with a bounded timeout.
    WaitingForClient,
    /// A reporter connected.
    Connected,
    /// Per-tick receive loop running.
    Receiving,
    /// Session finished; terminal.
    Closed,
}

impl SessionState for MonitorState {
    const INITIAL: Self = MonitorState::Listening;
    const CLOSED: Self = MonitorState::Closed;

    fn can_advance_to(self, next: Self) -> bool {
        use MonitorState::*;
        matches!(
            (self, next),
            (Listening, WaitingForClient) | (WaitingForClient, Connected) | (Connected, Receiving)
        )
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Listening => "listening",
            MonitorState::WaitingForClient => "waiting for client",
            MonitorState::Connected => "connected",
            MonitorState::Receiving => "receiving",
            MonitorState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a session reached `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The local operator asked to stop.
    UserStop,
    /// The reporter sent its configured number of readings.
    IterationLimit,
    /// The reporter closed the connection (zero-length read on the monitor).
    PeerClosed,
    /// A metric query failed or returned unparseable text.
    MetricSource(String),
    /// A connect, accept, send or receive failed.
    Transport(String),
    /// A received frame was malformed and the policy is to abort.
    Decode(String),
}

impl CloseReason {
    /// Returns `true` for reasons that represent a failure rather than a
    /// normal end of session.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CloseReason::MetricSource(_) | CloseReason::Transport(_) | CloseReason::Decode(_)
        )
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::UserStop => f.write_str("stopped by user"),
            CloseReason::IterationLimit => f.write_str("iteration limit reached"),
            CloseReason::PeerClosed => f.write_str("peer closed the connection"),
            CloseReason::MetricSource(msg) => write!(f, "metric source failure: {msg}"),
            CloseReason::Transport(msg) => write!(f, "transport failure: {msg}"),
            CloseReason::Decode(msg) => write!(f, "decode failure: {msg}"),
        }
    }
}

/// A transition the lifecycle does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid session transition from {from} to {to}")]
pub struct TransitionError<S: SessionState> {
    pub from: S,
    pub to: S,
}

/// Lifecycle tracker for one session.
///
/// # Examples
///
/// ```rust
/// use pimon_core::{CloseReason, ReporterState, StateMachine};
///
/// let mut machine = StateMachine::<ReporterState>::new();
/// machine.advance(ReporterState::Connecting).unwrap();
/// assert!(machine.advance(ReporterState::Sending).is_err());
///
/// machine.close(CloseReason::UserStop);
/// assert_eq!(machine.state(), ReporterState::Closed);
/// assert_eq!(machine.close_reason(), Some(&CloseReason::UserStop));
/// ```
#[derive(Debug, Clone)]
pub struct StateMachine<S: SessionState> {
    current: S,
    close_reason: Option<CloseReason>,
}

impl<S: SessionState> StateMachine<S> {
    /// Creates a machine in the role's initial state.
    pub fn new() -> Self {
        Self {
            current: S::INITIAL,
            close_reason: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> S {
        self.current
    }

    /// Returns `true` once the session has closed.
    pub fn is_closed(&self) -> bool {
        self.current == S::CLOSED
    }

    /// Moves one step forward along the lifecycle.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if `next` does not directly follow the
    /// current state.  Use [`close`](Self::close) to enter `Closed`.
    pub fn advance(&mut self, next: S) -> Result<(), TransitionError<S>> {
        if !self.current.can_advance_to(next) {
            return Err(TransitionError {
                from: self.current,
                to: next,
            });
        }
        debug!(from = %self.current, to = %next, "session transition");
        self.current = next;
        Ok(())
    }

    /// Closes the session for `reason`.
    ///
    /// Returns `false` (and keeps the original reason) if the session was
    /// already closed.
    pub fn close(&mut self, reason: CloseReason) -> bool {
        if self.is_closed() {
            return false;
        }
        info!(from = %self.current, reason = %reason, "session closed");
        self.current = S::CLOSED;
        self.close_reason = Some(reason);
        true
    }

    /// The reason the session closed, once it has.
    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.close_reason.as_ref()
    }
}

impl<S: SessionState> Default for StateMachine<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which end of the link a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Reporter,
    Monitor,
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionRole::Reporter => f.write_str("reporter"),
            SessionRole::Monitor => f.write_str("monitor"),
        }
    }
}

/// What a finished loop reports back to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub role: SessionRole,
    /// Frames sent (reporter) or successfully decoded (monitor).
    pub frames: u64,
    /// The last iteration sent or received.
    pub last_iteration: Option<u64>,
    pub close_reason: CloseReason,
}

impl SessionSummary {
    /// Returns `true` if the session ended without a failure.
    pub fn is_success(&self) -> bool {
        !self.close_reason.is_failure()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_machine_walks_full_lifecycle() {
        // Arrange
        let mut machine = StateMachine::<ReporterState>::new();
        assert_eq!(machine.state(), ReporterState::Idle);

        // Act
        machine.advance(ReporterState::Connecting).unwrap();
        machine.advance(ReporterState::Connected).unwrap();
        machine.advance(ReporterState::Sending).unwrap();
        let closed = machine.close(CloseReason::IterationLimit);

        // Assert
        assert!(closed);
        assert!(machine.is_closed());
        assert_eq!(machine.close_reason(), Some(&CloseReason::IterationLimit));
    }

    #[test]
    fn test_monitor_machine_walks_full_lifecycle() {
        let mut machine = StateMachine::<MonitorState>::new();
        assert_eq!(machine.state(), MonitorState::Listening);

        machine.advance(MonitorState::WaitingForClient).unwrap();
        machine.advance(MonitorState::Connected).unwrap();
        machine.advance(MonitorState::Receiving).unwrap();
        machine.close(CloseReason::PeerClosed);

        assert_eq!(machine.state(), MonitorState::Closed);
    }

    #[test]
    fn test_skipping_a_state_is_rejected() {
        let mut machine = StateMachine::<ReporterState>::new();

        let err = machine.advance(ReporterState::Sending).unwrap_err();

        assert_eq!(
            err,
            TransitionError {
                from: ReporterState::Idle,
                to: ReporterState::Sending
            }
        );
        assert_eq!(err.to_string(), "invalid session transition from idle to sending");
        assert_eq!(machine.state(), ReporterState::Idle, "state must not change");
    }

    #[test]
    fn test_advance_cannot_enter_closed() {
        let mut machine = StateMachine::<MonitorState>::new();
        assert!(machine.advance(MonitorState::Closed).is_err());
        assert!(!machine.is_closed());
    }

    #[test]
    fn test_any_open_state_may_close_directly() {
        // Stop requested while still waiting for a client.
        let mut machine = StateMachine::<MonitorState>::new();
        machine.advance(MonitorState::WaitingForClient).unwrap();

        assert!(machine.close(CloseReason::UserStop));
        assert_eq!(machine.close_reason(), Some(&CloseReason::UserStop));
    }

    #[test]
    fn test_closed_is_terminal_and_first_reason_wins() {
        // Arrange
        let mut machine = StateMachine::<ReporterState>::new();
        machine.close(CloseReason::Transport("connection refused".into()));

        // Act
        let closed_again = machine.close(CloseReason::UserStop);
        let advance = machine.advance(ReporterState::Connecting);

        // Assert
        assert!(!closed_again);
        assert!(advance.is_err());
        assert_eq!(
            machine.close_reason(),
            Some(&CloseReason::Transport("connection refused".into()))
        );
    }

    #[test]
    fn test_close_reason_failure_classification() {
        assert!(!CloseReason::UserStop.is_failure());
        assert!(!CloseReason::IterationLimit.is_failure());
        assert!(!CloseReason::PeerClosed.is_failure());
        assert!(CloseReason::MetricSource("x".into()).is_failure());
        assert!(CloseReason::Transport("x".into()).is_failure());
        assert!(CloseReason::Decode("x".into()).is_failure());
    }

    #[test]
    fn test_summary_success_follows_close_reason() {
        let summary = SessionSummary {
            role: SessionRole::Monitor,
            frames: 2,
            last_iteration: Some(2),
            close_reason: CloseReason::PeerClosed,
        };
        assert!(summary.is_success());

        let failed = SessionSummary {
            close_reason: CloseReason::Decode("bad".into()),
            ..summary
        };
        assert!(!failed.is_success());
    }
}
