//! pimon-reporter library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the reporter do? (for beginners)
//!
//! The *reporter* runs on the board being watched.  It:
//!
//! 1. Connects once to the monitor over TCP.
//! 2. Every `interval` seconds, asks its metric source for the temperature,
//!    core voltage, ARM clock, core clock and ARM memory split.
//! 3. Packs the answers and an iteration number into one `Reading` and sends
//!    it as a single JSON line.
//! 4. Flips its activity light and refreshes its display.
//! 5. Stops after `max_iterations` readings, on Ctrl-C, or on the first
//!    failure, and closes the connection.

/// Application layer: the reading collector and the reporter loop.
pub mod application;

/// Infrastructure layer: metric sources, network link, console, controls.
pub mod infrastructure;
