//! The monitor's cooperative loop.
//!
//! # One session, start to finish
//!
//! ```text
//! run()
//!  ├─ bind, backlog 1                       Listening ─► WaitingForClient
//!  ├─ per waiting tick
//!  │    ├─ poll stop        → Closed(UserStop)
//!  │    ├─ bounded accept   → refresh on timeout; Connected on a peer
//!  │    └─ listener dropped once a peer is accepted
//!  └─ per receiving tick                    Receiving
//!       ├─ poll stop        → Closed(UserStop)
//!       ├─ bounded receive
//!       │    ├─ timeout     → one refresh
//!       │    ├─ zero bytes  → Closed(PeerClosed)
//!       │    ├─ error       → Closed(Transport)
//!       │    └─ data        → decode every complete frame;
//!       │                     apply + flip light + refresh per frame
//!       └─ malformed frame  → Closed(Decode) or skipped, per policy
//! ```
//!
//! Every frame completed by one read is applied before the next receive, so
//! the display never lags more than one read behind the wire.

use std::net::SocketAddr;

use pimon_core::{
    CloseReason, ConnectionStatus, DisplaySink, DisplayState, FrameDecoder, IterationCheck,
    IterationTracker, MalformedFramePolicy, MonitorState, Reading, SessionConfig, SessionRole,
    SessionSummary, StateMachine, StopSignal,
};
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::infrastructure::network::{MonitorListener, PeerLink, Receipt};

/// What a receive tick left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// The session is still receiving.
    Continue,
    /// The session is closed, for this reason.
    Closed(CloseReason),
}

/// One monitor session.
pub struct Monitor<D, S> {
    config: SessionConfig,
    display: D,
    stop: S,
    machine: StateMachine<MonitorState>,
    state: DisplayState,
    decoder: FrameDecoder,
    tracker: IterationTracker,
    frames: u64,
    skipped: u64,
}

impl<D: DisplaySink, S: StopSignal> Monitor<D, S> {
    pub fn new(config: SessionConfig, display: D, stop: S) -> Self {
        Self {
            config,
            display,
            stop,
            machine: StateMachine::new(),
            state: DisplayState::new(),
            decoder: FrameDecoder::new(),
            tracker: IterationTracker::new(),
            frames: 0,
            skipped: 0,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.machine.state()
    }

    pub fn display_state(&self) -> &DisplayState {
        &self.state
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Frames decoded and applied so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Malformed frames dropped under [`MalformedFramePolicy::Skip`].
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Binds the configured address and runs the whole session.
    pub async fn run(mut self) -> SessionSummary {
        self.display.refresh(&self.state);
        match MonitorListener::bind(&self.config.host, self.config.port).await {
            Ok(listener) => self.run_with_listener(listener).await,
            Err(e) => {
                error!("{e}");
                let reason = self.close(CloseReason::Transport(e.to_string()));
                self.summary(reason)
            }
        }
    }

    /// Runs the session on an already-bound listener.
    pub async fn run_with_listener(mut self, listener: MonitorListener) -> SessionSummary {
        self.step(MonitorState::WaitingForClient);
        let accepted = self.wait_for_client(&listener).await;
        drop(listener);

        let reason = match accepted {
            Ok(mut link) => {
                self.step(MonitorState::Receiving);
                self.receive_loop(&mut link).await
            }
            Err(reason) => reason,
        };
        self.summary(reason)
    }

    /// Polls `listener` with bounded accepts until a reporter connects or the
    /// session closes.
    ///
    /// # Errors
    ///
    /// Returns the [`CloseReason`] if the session closed instead.
    pub async fn wait_for_client(
        &mut self,
        listener: &MonitorListener,
    ) -> Result<PeerLink<TcpStream>, CloseReason> {
        let timeout = self.config.receive_timeout();
        loop {
            if self.stop.stop_requested() {
                return Err(self.close(CloseReason::UserStop));
            }
            match listener.accept_within(timeout).await {
                Ok(None) => self.display.refresh(&self.state),
                Ok(Some((link, peer))) => {
                    self.connected(peer);
                    return Ok(link);
                }
                Err(e) => {
                    error!("accept failed: {e}");
                    return Err(self.close(CloseReason::Transport(e.to_string())));
                }
            }
        }
    }

    fn connected(&mut self, peer: SocketAddr) {
        self.step(MonitorState::Connected);
        self.state
            .set_status(ConnectionStatus::Connected { peer: Some(peer) });
        self.display.refresh(&self.state);
    }

    /// Runs receive ticks on `link` until the session closes.
    pub async fn receive_loop<R: AsyncRead + Unpin>(
        &mut self,
        link: &mut PeerLink<R>,
    ) -> CloseReason {
        loop {
            if let Tick::Closed(reason) = self.receive_tick(link).await {
                return reason;
            }
        }
    }

    /// Performs one receive tick.
    ///
    /// On a closed session this returns the close reason without touching
    /// `link`, the display or the stop signal.
    pub async fn receive_tick<R: AsyncRead + Unpin>(&mut self, link: &mut PeerLink<R>) -> Tick {
        if let Some(reason) = self.machine.close_reason() {
            return Tick::Closed(reason.clone());
        }
        if self.stop.stop_requested() {
            return Tick::Closed(self.close(CloseReason::UserStop));
        }

        match link.receive_within(self.config.receive_timeout()).await {
            Ok(Receipt::TimedOut) => {
                self.display.refresh(&self.state);
                Tick::Continue
            }
            Ok(Receipt::PeerClosed) => Tick::Closed(self.close(CloseReason::PeerClosed)),
            Ok(Receipt::Data(bytes)) => {
                self.decoder.push(bytes);
                self.drain_frames()
            }
            Err(e) => {
                error!("receive failed: {e}");
                Tick::Closed(self.close(CloseReason::Transport(e.to_string())))
            }
        }
    }

    /// Applies every complete frame in the decoder.
    fn drain_frames(&mut self) -> Tick {
        let mut applied = 0usize;
        while let Some(frame) = self.decoder.next_frame() {
            match frame {
                Ok(reading) => {
                    self.apply(&reading);
                    applied += 1;
                }
                Err(e) => match self.config.on_malformed_frame {
                    MalformedFramePolicy::Abort => {
                        error!("malformed frame: {e}");
                        return Tick::Closed(self.close(CloseReason::Decode(e.to_string())));
                    }
                    MalformedFramePolicy::Skip => {
                        warn!("skipping malformed frame: {e}");
                        self.skipped += 1;
                    }
                },
            }
        }
        if applied == 0 {
            self.display.refresh(&self.state);
        }
        Tick::Continue
    }

    fn apply(&mut self, reading: &Reading) {
        match self.tracker.observe(reading.iteration()) {
            IterationCheck::InOrder => {}
            IterationCheck::Gap { expected, received } => {
                warn!(expected, received, "iteration gap");
            }
            IterationCheck::Regressed { previous, received } => {
                warn!(previous, received, "iteration went backwards");
            }
        }
        debug!(iteration = reading.iteration(), "reading received");
        self.frames += 1;
        self.state.apply_reading(reading);
        self.display.refresh(&self.state);
    }

    fn step(&mut self, next: MonitorState) {
        if let Err(e) = self.machine.advance(next) {
            error!("{e}");
        }
    }

    /// Closes the session, shows it on the display and returns the reason
    /// that is now in effect.
    fn close(&mut self, reason: CloseReason) -> CloseReason {
        if self.machine.close(reason.clone()) {
            self.state.mark_closed();
            self.display.refresh(&self.state);
            if reason.is_failure() {
                error!(frames = self.frames, "monitor session failed: {reason}");
            } else {
                info!(frames = self.frames, "monitor session finished: {reason}");
            }
        }
        self.machine.close_reason().cloned().unwrap_or(reason)
    }

    fn summary(&self, close_reason: CloseReason) -> SessionSummary {
        SessionSummary {
            role: SessionRole::Monitor,
            frames: self.frames,
            last_iteration: self.tracker.last(),
            close_reason,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
