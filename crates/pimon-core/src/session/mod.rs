//! Session lifecycle types shared by the reporter and the monitor.
//!
//! This module contains no I/O.  The cooperative loops in the application
//! crates own one value of each of these types and mutate them in response to
//! network events.
//!
//! - **`state`** – the two lifecycle state machines, the reasons a session
//!   closes, and the summary a finished loop returns.
//! - **`display`** – the state a display shows and the [`DisplaySink`]
//!   trait the loops refresh once per tick.
//! - **`stop`** – the [`StopSignal`] trait the loops poll once per tick.
//!
//! [`DisplaySink`]: display::DisplaySink
//! [`StopSignal`]: stop::StopSignal

pub mod display;
pub mod state;
pub mod stop;
