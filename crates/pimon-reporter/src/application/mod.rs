//! Application layer use cases for the reporter.
//!
//! - **`collect_reading`** – Queries an injected [`MetricSource`] once per
//!   metric and assembles one [`pimon_core::Reading`].  The source is a trait
//!   so the reporter can run against `vcgencmd`, a simulator, or a mock.
//!
//! - **`report_readings`** – The reporter's cooperative loop: connect once,
//!   then collect, send, refresh and sleep until the iteration limit, a stop
//!   request, or a failure closes the session.
//!
//! [`MetricSource`]: collect_reading::MetricSource

pub mod collect_reading;
pub mod report_readings;
