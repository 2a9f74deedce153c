//! The user-initiated stop request, as seen by a cooperative loop.
//!
//! A loop polls its [`StopSignal`] exactly once per tick, at the top of the
//! tick.  A stop never interrupts an in-flight accept or receive; it is
//! observed when that call returns (at the latest after one receive timeout).
//!
//! Any `FnMut() -> bool` closure is a stop signal, which is how the binaries
//! adapt a `tokio::sync::watch` receiver fed by Ctrl-C.

/// Something a loop can ask "has the operator asked us to stop?".
pub trait StopSignal {
    /// Returns `true` once a stop has been requested.
    fn stop_requested(&mut self) -> bool;
}

impl<F> StopSignal for F
where
    F: FnMut() -> bool,
{
    fn stop_requested(&mut self) -> bool {
        self()
    }
}

/// A stop signal that counts how often it was polled and optionally fires
/// after a fixed number of polls.
#[derive(Debug, Clone, Default)]
pub struct CountingStop {
    fire_after: Option<u64>,
    checks: u64,
}

impl CountingStop {
    /// Never requests a stop.
    pub fn never() -> Self {
        Self::default()
    }

    /// Answers `false` to the first `polls` checks and `true` from then on.
    pub fn after(polls: u64) -> Self {
        Self {
            fire_after: Some(polls),
            checks: 0,
        }
    }

    /// Number of times the loop has polled this signal.
    pub fn checks(&self) -> u64 {
        self.checks
    }
}

impl StopSignal for CountingStop {
    fn stop_requested(&mut self) -> bool {
        let fired = self.fire_after.is_some_and(|n| self.checks >= n);
        self.checks += 1;
        fired
    }
}
