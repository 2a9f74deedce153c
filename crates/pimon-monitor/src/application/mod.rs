//! Application layer for the monitor.
//!
//! - **`receive_readings`** – The monitor's cooperative loop: wait for one
//!   reporter with bounded accepts, then decode every complete frame that
//!   arrives and mirror the latest reading until the reporter hangs up, the
//!   operator stops the session, or a failure closes it.

pub mod receive_readings;
