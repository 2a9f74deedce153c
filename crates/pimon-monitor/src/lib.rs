//! pimon-monitor library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the monitor do? (for beginners)
//!
//! The *monitor* runs on the machine the operator looks at.  It:
//!
//! 1. Listens on a TCP port and waits for exactly one reporter.
//! 2. Reads whatever bytes arrive, at most 1 KiB at a time, and splits them
//!    into newline-terminated JSON frames.  A frame may arrive in pieces, and
//!    one read may carry several frames.
//! 3. For every complete frame, copies the six values into its display and
//!    flips the activity light.
//! 4. Keeps the display responsive while idle by waking up once per receive
//!    timeout.
//! 5. Stops when the reporter closes the connection, on Ctrl-C, or on the
//!    first failure, and releases its sockets.

/// Application layer: the monitor loop.
pub mod application;

/// Infrastructure layer: listener, peer link, console, controls.
pub mod infrastructure;
