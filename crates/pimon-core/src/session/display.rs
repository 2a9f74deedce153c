//! Display state and the sink that renders it.
//!
//! Each side keeps one [`DisplayState`] that only its own loop mutates.  Once
//! per tick (and once per decoded frame on the monitor) the loop hands the
//! whole state to a [`DisplaySink`], which may render it however it likes: a
//! console line, a window, or an in-memory recording for tests.
//!
//! The display state is derived, never authoritative.  It is not sent to the
//! peer and nothing reads it back to make protocol decisions.

use std::fmt;
use std::net::SocketAddr;

use crate::protocol::reading::Reading;

/// Text shown in a value field before the first reading arrives.
pub const PLACEHOLDER: &str = "---";

/// Connection status shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No peer yet.
    NotConnected,
    /// Connected; the monitor knows the reporter's address.
    Connected { peer: Option<SocketAddr> },
    /// The session has finished.
    Closed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::NotConnected => f.write_str("Not connected"),
            ConnectionStatus::Connected { peer: Some(peer) } => write!(f, "Connected to {peer}"),
            ConnectionStatus::Connected { peer: None } => f.write_str("Connected"),
            ConnectionStatus::Closed => f.write_str("Connection closed"),
        }
    }
}

/// The six read-only value fields mirroring the last reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFields {
    pub temperature_c: String,
    pub core_volts: String,
    pub arm_clock_mhz: String,
    pub core_clock_mhz: String,
    pub arm_mem_mb: String,
    pub iteration: String,
}

impl Default for DisplayFields {
    fn default() -> Self {
        Self {
            temperature_c: PLACEHOLDER.to_string(),
            core_volts: PLACEHOLDER.to_string(),
            arm_clock_mhz: PLACEHOLDER.to_string(),
            core_clock_mhz: PLACEHOLDER.to_string(),
            arm_mem_mb: PLACEHOLDER.to_string(),
            iteration: PLACEHOLDER.to_string(),
        }
    }
}

impl From<&Reading> for DisplayFields {
    fn from(reading: &Reading) -> Self {
        Self {
            temperature_c: reading.temperature_c().to_string(),
            core_volts: reading.core_volts().to_string(),
            arm_clock_mhz: reading.arm_clock_mhz().to_string(),
            core_clock_mhz: reading.core_clock_mhz().to_string(),
            arm_mem_mb: reading.arm_mem_mb().to_string(),
            iteration: reading.iteration().to_string(),
        }
    }
}

/// Everything a display shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    status: ConnectionStatus,
    indicator: bool,
    indicator_toggles: u64,
    fields: DisplayFields,
}

impl DisplayState {
    /// Initial state: not connected, indicator off, placeholder fields.
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::NotConnected,
            indicator: false,
            indicator_toggles: 0,
            fields: DisplayFields::default(),
        }
    }

    /// The connection status shown on the status line.
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Whether the activity light is currently on.
    pub fn indicator(&self) -> bool {
        self.indicator
    }

    /// How many times the activity light has flipped in this session.
    pub fn indicator_toggles(&self) -> u64 {
        self.indicator_toggles
    }

    /// The six value fields, as last applied.
    pub fn fields(&self) -> &DisplayFields {
        &self.fields
    }

    /// Replaces the status line.  The fields and the light are unchanged.
    ///
    /// ```rust
    /// use pimon_core::{ConnectionStatus, DisplayState, PLACEHOLDER};
    ///
    /// let mut state = DisplayState::new();
    /// state.set_status(ConnectionStatus::Connected { peer: None });
    ///
    /// assert_eq!(state.status().to_string(), "Connected");
    /// assert_eq!(state.fields().iteration, PLACEHOLDER);
    /// assert!(!state.indicator());
    /// ```
    pub fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    /// Flips the activity light once.
    pub fn toggle_indicator(&mut self) {
        self.indicator = !self.indicator;
        self.indicator_toggles += 1;
    }

    /// Mirrors `reading` in the value fields and flips the activity light.
    pub fn apply_reading(&mut self, reading: &Reading) {
        self.fields = DisplayFields::from(reading);
        self.toggle_indicator();
    }

    /// Marks the session closed and turns the activity light off.
    ///
    /// Turning the light off is not counted as a toggle.
    pub fn mark_closed(&mut self) {
        self.status = ConnectionStatus::Closed;
        self.indicator = false;
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a [`DisplayState`].
///
/// Called from the loop thread only; implementations must return promptly
/// because the loop cannot service the network while a refresh runs.
pub trait DisplaySink {
    /// Redraws the display from `state`.
    fn refresh(&mut self, state: &DisplayState);
}

impl<D: DisplaySink + ?Sized> DisplaySink for &mut D {
    fn refresh(&mut self, state: &DisplayState) {
        (**self).refresh(state);
    }
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn refresh(&mut self, state: &DisplayState) {
        (**self).refresh(state);
    }
}

/// A sink that records a snapshot of every refresh.
///
/// Used by tests to assert exactly what was shown and how often.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    snapshots: Vec<DisplayState>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every state passed to `refresh`, oldest first.
    pub fn snapshots(&self) -> &[DisplayState] {
        &self.snapshots
    }

    /// Number of refreshes so far.
    pub fn refresh_count(&self) -> usize {
        self.snapshots.len()
    }

    /// The most recently refreshed state.
    pub fn last(&self) -> Option<&DisplayState> {
        self.snapshots.last()
    }
}

impl DisplaySink for RecordingDisplay {
    fn refresh(&mut self, state: &DisplayState) {
        self.snapshots.push(state.clone());
    }
}
