//! Infrastructure layer for the monitor.
//!
//! - **`network`** – `MonitorListener` and `PeerLink`: bounded accept and
//!   bounded receive on the monitor's single connection.
//! - **`display`** – Console rendering of the six value fields.
//! - **`controls`** – Ctrl-C as the stop action.

pub mod controls;
pub mod display;
pub mod network;
