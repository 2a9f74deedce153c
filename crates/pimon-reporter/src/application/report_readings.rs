//! The reporter's cooperative loop.
//!
//! # One session, start to finish
//!
//! ```text
//! run()
//!  ├─ refresh display, poll stop          Idle
//!  ├─ connect (no timeout)                Connecting ─► Connected
//!  └─ per tick                            Sending
//!       ├─ poll stop            → Closed(UserStop)
//!       ├─ next iteration?      → Closed(IterationLimit) when exhausted
//!       ├─ collect reading      → Closed(MetricSource) on failure
//!       ├─ encode + send frame  → Closed(Transport) on failure
//!       ├─ mirror reading, flip light, refresh display
//!       └─ sleep `interval`
//! ```
//!
//! Everything runs on the caller's task; nothing is spawned.  [`Reporter::run`]
//! consumes the reporter, so a closed session can never be resumed.

use std::future::Future;

use pimon_core::{
    CloseReason, ConnectionStatus, DisplaySink, DisplayState, IterationCounter, ReporterState,
    SessionConfig, SessionRole, SessionSummary, StateMachine, StopSignal,
};
use tokio::io::AsyncWrite;
use tokio::time;
use tracing::{debug, error, info};

use crate::application::collect_reading::{collect_reading, MetricSource};
use crate::infrastructure::network::{LinkError, ReporterLink};

/// One reporter session.
pub struct Reporter<M, D, S> {
    config: SessionConfig,
    source: M,
    display: D,
    stop: S,
    machine: StateMachine<ReporterState>,
    state: DisplayState,
    counter: IterationCounter,
    frames_sent: u64,
    last_iteration: Option<u64>,
}

impl<M, D, S> Reporter<M, D, S>
where
    M: MetricSource,
    D: DisplaySink,
    S: StopSignal,
{
    pub fn new(config: SessionConfig, source: M, display: D, stop: S) -> Self {
        let counter = IterationCounter::new(config.max_iterations);
        Self {
            config,
            source,
            display,
            stop,
            machine: StateMachine::new(),
            state: DisplayState::new(),
            counter,
            frames_sent: 0,
            last_iteration: None,
        }
    }

    /// Connects to the configured monitor over TCP and runs the session.
    pub async fn run(self) -> SessionSummary {
        let host = self.config.host.clone();
        let port = self.config.port;
        self.run_with(move || async move { ReporterLink::connect(&host, port).await })
            .await
    }

    /// Runs the session over the link produced by `connect`.
    ///
    /// `connect` is only called if no stop was requested before connecting.
    pub async fn run_with<F, Fut, W>(mut self, connect: F) -> SessionSummary
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ReporterLink<W>, LinkError>>,
        W: AsyncWrite + Unpin,
    {
        self.display.refresh(&self.state);
        if self.stop.stop_requested() {
            return self.finish(CloseReason::UserStop);
        }

        self.step(ReporterState::Connecting);
        info!(endpoint = %self.config.endpoint(), "connecting to monitor");
        let mut link = match connect().await {
            Ok(link) => link,
            Err(e) => {
                error!("{e}");
                return self.finish(CloseReason::Transport(e.to_string()));
            }
        };

        self.step(ReporterState::Connected);
        self.state
            .set_status(ConnectionStatus::Connected { peer: None });
        self.display.refresh(&self.state);

        self.step(ReporterState::Sending);
        let reason = self.send_loop(&mut link).await;

        if let Err(e) = link.close().await {
            debug!("shutdown after session end failed: {e}");
        }
        drop(link);
        self.finish(reason)
    }

    async fn send_loop<W: AsyncWrite + Unpin>(&mut self, link: &mut ReporterLink<W>) -> CloseReason {
        let interval = self.config.interval();
        loop {
            if self.stop.stop_requested() {
                return CloseReason::UserStop;
            }
            let Some(iteration) = self.counter.next_iteration() else {
                return CloseReason::IterationLimit;
            };

            let reading = match collect_reading(&mut self.source, iteration) {
                Ok(reading) => reading,
                Err(e) => {
                    error!(iteration = iteration.get(), "reading collection failed: {e}");
                    return CloseReason::MetricSource(e.to_string());
                }
            };

            if let Err(e) = link.send(&reading).await {
                error!(iteration = iteration.get(), "send failed: {e}");
                return CloseReason::Transport(e.to_string());
            }
            self.frames_sent += 1;
            self.last_iteration = Some(reading.iteration());

            self.state.apply_reading(&reading);
            self.display.refresh(&self.state);

            time::sleep(interval).await;
        }
    }

    fn step(&mut self, next: ReporterState) {
        if let Err(e) = self.machine.advance(next) {
            error!("{e}");
        }
    }

    fn finish(mut self, reason: CloseReason) -> SessionSummary {
        self.machine.close(reason.clone());
        self.state.mark_closed();
        self.display.refresh(&self.state);

        if reason.is_failure() {
            error!(frames = self.frames_sent, "reporter session failed: {reason}");
        } else {
            info!(frames = self.frames_sent, "reporter session finished: {reason}");
        }

        SessionSummary {
            role: SessionRole::Reporter,
            frames: self.frames_sent,
            last_iteration: self.last_iteration,
            close_reason: reason,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use pimon_core::{CountingStop, FrameDecoder, Reading, RecordingDisplay};

    use super::*;
    use crate::application::collect_reading::{Metric, MetricSourceError, MockMetricSource};
    use crate::infrastructure::metric_source::SimulatedSource;

    fn fast_config(max_iterations: u64) -> SessionConfig {
        SessionConfig {
            max_iterations,
            interval_seconds: 0.0,
            ..Default::default()
        }
    }

    fn decode_all(wire: &[u8]) -> Vec<Reading> {
        let mut decoder = FrameDecoder::new();
        decoder.push(wire);
        let frames = decoder
            .frames()
            .map(|f| f.expect("reporter must only write valid frames"))
            .collect();
        assert_eq!(decoder.buffered_len(), 0, "no partial frame may be written");
        frames
    }

    // ── Normal sessions ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_full_session_sends_iterations_one_to_n() {
        // Arrange
        let mut wire = Vec::new();
        let mut display = RecordingDisplay::new();
        let writer = &mut wire;
        let reporter = Reporter::new(
            fast_config(5),
            SimulatedSource::new(),
            &mut display,
            CountingStop::never(),
        );

        // Act
        let summary = reporter
            .run_with(move || async move { Ok(ReporterLink::new(writer)) })
            .await;

        // Assert
        let iterations: Vec<u64> = decode_all(&wire).iter().map(Reading::iteration).collect();
        assert_eq!(iterations, vec![1, 2, 3, 4, 5]);
        assert_eq!(summary.close_reason, CloseReason::IterationLimit);
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.last_iteration, Some(5));
        assert!(summary.is_success());
    }

    #[tokio::test]
    async fn test_indicator_flips_once_per_frame_and_ends_off() {
        // Arrange
        let mut display = RecordingDisplay::new();
        let reporter = Reporter::new(
            fast_config(3),
            SimulatedSource::new(),
            &mut display,
            CountingStop::never(),
        );

        // Act
        reporter
            .run_with(|| async { Ok(ReporterLink::new(Vec::new())) })
            .await;

        // Assert: initial + connected + one per frame + closed.
        assert_eq!(display.refresh_count(), 3 + 3);
        let last = display.last().unwrap();
        assert_eq!(last.indicator_toggles(), 3);
        assert!(!last.indicator());
        assert_eq!(last.status(), &ConnectionStatus::Closed);
        assert_eq!(last.fields().iteration, "3");
    }

    /// Records the (virtual) instant at which each frame was shown.
    #[derive(Default)]
    struct FrameClock {
        shown_at: Vec<time::Instant>,
        toggles: u64,
    }

    impl DisplaySink for FrameClock {
        fn refresh(&mut self, state: &DisplayState) {
            if state.indicator_toggles() > self.toggles {
                self.toggles = state.indicator_toggles();
                self.shown_at.push(time::Instant::now());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_are_spaced_by_the_configured_interval() {
        // Arrange
        let config = SessionConfig {
            max_iterations: 3,
            interval_seconds: 2.0,
            ..Default::default()
        };
        let mut clock = FrameClock::default();
        let reporter = Reporter::new(
            config,
            SimulatedSource::new(),
            &mut clock,
            CountingStop::never(),
        );
        let started = time::Instant::now();

        // Act
        let summary = reporter
            .run_with(|| async { Ok(ReporterLink::new(Vec::new())) })
            .await;
        let elapsed = started.elapsed();

        // Assert
        assert_eq!(summary.close_reason, CloseReason::IterationLimit);
        assert_eq!(clock.shown_at.len(), 3);
        assert!(clock.shown_at[0] - started < Duration::from_millis(10));
        for pair in clock.shown_at.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(
                gap >= Duration::from_secs(2) && gap < Duration::from_millis(2010),
                "frames {gap:?} apart"
            );
        }
        // One sleep follows every send, the last one included.
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_millis(6030));
    }

    // ── Stop requests ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_stop_before_connecting_never_connects() {
        // Arrange
        let connected = Cell::new(false);
        let mut display = RecordingDisplay::new();
        let reporter = Reporter::new(
            fast_config(5),
            SimulatedSource::new(),
            &mut display,
            CountingStop::after(0),
        );

        // Act
        let summary = reporter
            .run_with(|| {
                connected.set(true);
                async { Ok(ReporterLink::new(Vec::new())) }
            })
            .await;

        // Assert
        assert!(!connected.get());
        assert_eq!(summary.close_reason, CloseReason::UserStop);
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.last_iteration, None);
        assert_eq!(display.last().unwrap().status(), &ConnectionStatus::Closed);
    }

    #[tokio::test]
    async fn test_stop_takes_effect_at_next_tick() {
        // Arrange: the pre-connect check and two ticks pass, the third tick stops.
        let mut wire = Vec::new();
        let writer = &mut wire;
        let reporter = Reporter::new(
            fast_config(50),
            SimulatedSource::new(),
            RecordingDisplay::new(),
            CountingStop::after(3),
        );

        // Act
        let summary = reporter
            .run_with(move || async move { Ok(ReporterLink::new(writer)) })
            .await;

        // Assert
        assert_eq!(summary.close_reason, CloseReason::UserStop);
        assert_eq!(decode_all(&wire).len(), 2);
    }

    // ── Failures ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_metric_failure_closes_without_partial_frame() {
        // Arrange: the second reading's temperature query fails.
        let mut source = MockMetricSource::new();
        let mut temperature_calls = 0;
        source.expect_temperature().times(2).returning(move || {
            temperature_calls += 1;
            if temperature_calls == 1 {
                Ok("temp=45.0'C".to_string())
            } else {
                Err(MetricSourceError::Query {
                    metric: Metric::Temperature,
                    reason: "vcgencmd not found".to_string(),
                })
            }
        });
        source
            .expect_core_volts()
            .times(1)
            .returning(|| Ok("volt=1.2V".to_string()));
        source
            .expect_arm_clock()
            .times(1)
            .returning(|| Ok("frequency(48)=700000000".to_string()));
        source
            .expect_core_clock()
            .times(1)
            .returning(|| Ok("frequency(1)=400000000".to_string()));
        source
            .expect_arm_memory()
            .times(1)
            .returning(|| Ok("arm=128M".to_string()));

        let mut wire = Vec::new();
        let writer = &mut wire;
        let reporter = Reporter::new(
            fast_config(5),
            source,
            RecordingDisplay::new(),
            CountingStop::never(),
        );

        // Act
        let summary = reporter
            .run_with(move || async move { Ok(ReporterLink::new(writer)) })
            .await;

        // Assert
        assert!(matches!(summary.close_reason, CloseReason::MetricSource(_)));
        assert!(!summary.is_success());
        assert_eq!(summary.frames, 1);
        let frames = decode_all(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].iteration(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_closes_with_transport_reason() {
        // Arrange
        let mut display = RecordingDisplay::new();
        let reporter = Reporter::new(
            fast_config(5),
            SimulatedSource::new(),
            &mut display,
            CountingStop::never(),
        );

        // Act
        let summary = reporter
            .run_with(|| async {
                Err::<ReporterLink<Vec<u8>>, _>(LinkError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )))
            })
            .await;

        // Assert
        assert!(matches!(summary.close_reason, CloseReason::Transport(_)));
        assert_eq!(summary.frames, 0);
        assert_eq!(display.last().unwrap().status(), &ConnectionStatus::Closed);
    }

    #[tokio::test]
    async fn test_send_failure_closes_with_transport_reason() {
        // Arrange
        let mock = tokio_test::io::Builder::new()
            .write_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broken pipe",
            ))
            .build();
        let reporter = Reporter::new(
            fast_config(5),
            SimulatedSource::new(),
            RecordingDisplay::new(),
            CountingStop::never(),
        );

        // Act
        let summary = reporter
            .run_with(move || async move { Ok(ReporterLink::new(mock)) })
            .await;

        // Assert
        assert!(matches!(summary.close_reason, CloseReason::Transport(_)));
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.last_iteration, None);
    }
}
