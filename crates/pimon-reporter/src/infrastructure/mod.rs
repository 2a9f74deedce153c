//! Infrastructure layer for the reporter.
//!
//! Contains the OS-facing adapters.
//!
//! The reporter loop in `application::report_readings` drives a
//! `ReporterLink` from here; everything else in this layer is wired up by
//! `main.rs`.
//!
//! # Sub-modules
//!
//! - **`metric_source`** – Implementations of `MetricSource`: the real
//!   `vcgencmd` tool and a deterministic simulator.
//!
//! - **`network`** – `ReporterLink`, the TCP connection to the monitor.
//!
//! - **`display`** – Console rendering of the reporter's display state.
//!
//! - **`controls`** – Ctrl-C as the stop action.

pub mod controls;
pub mod display;
pub mod metric_source;
pub mod network;
