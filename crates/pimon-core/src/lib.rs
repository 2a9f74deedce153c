//! # pimon-core
//!
//! Shared library for pimon containing the reading record, the line-delimited
//! frame codec, the session state machines, and the configuration schema.
//!
//! This crate is used by both the reporter and the monitor applications.
//! It has zero dependencies on OS APIs, UI toolkits, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! pimon is a two-process board telemetry link.  The *reporter* runs on the
//! board, samples five metrics every couple of seconds and streams each
//! sample over TCP.  The *monitor* listens for exactly one reporter and
//! mirrors the latest sample on its display.
//!
//! This crate (`pimon-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How samples travel over the network.  A [`Reading`] is
//!   encoded as one JSON object followed by a newline, and a [`FrameDecoder`]
//!   reassembles complete lines from arbitrarily sized socket reads.
//!
//! - **`session`** – The lifecycle of a connection on either side
//!   ([`ReporterState`], [`MonitorState`]), the display state both sides keep
//!   current, and the stop signal both loops poll once per tick.
//!
//! - **`config`** – The [`SessionConfig`] shared by both binaries, loadable
//!   from TOML.

pub mod config;
pub mod protocol;
pub mod session;

// Re-export the most-used types at the crate root so callers can write
// `pimon_core::Reading` instead of `pimon_core::protocol::reading::Reading`.
pub use config::{ConfigError, ConfigOverrides, MalformedFramePolicy, SessionConfig};
pub use protocol::codec::{decode_frame, encode_frame, FrameDecoder, FrameError};
pub use protocol::iteration::{IterationCheck, IterationCounter, IterationTracker};
pub use protocol::reading::{Reading, Tenths};
pub use session::display::{
    ConnectionStatus, DisplayFields, DisplaySink, DisplayState, RecordingDisplay, PLACEHOLDER,
};
pub use session::state::{
    CloseReason, MonitorState, ReporterState, SessionRole, SessionState, SessionSummary,
    StateMachine, TransitionError,
};
pub use session::stop::{CountingStop, StopSignal};
