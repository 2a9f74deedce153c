//! Iteration numbering for readings within one session.
//!
//! # What is an iteration number? (for beginners)
//!
//! Every reading carries a counter called `iteration`.  The reporter numbers
//! its readings `1, 2, 3, …` and stops after the configured maximum.  Since
//! TCP delivers bytes in order and without loss, the monitor should see the
//! same sequence.  The counter lets the monitor:
//!
//! - **Show progress** – the display mirrors the latest iteration.
//! - **Detect gaps** – receiving 1, 2 and then 4 means something upstream
//!   skipped a sample.
//! - **Detect regressions** – receiving 5 after 7 means the stream is not the
//!   one session it claims to be.
//!
//! Neither condition is fatal; the monitor logs them and keeps going.
//!
//! # Single-threaded by construction
//!
//! Both types take `&mut self`.  Each loop owns its counter outright, so no
//! atomics or locks are involved.

use std::num::NonZeroU64;

/// Produces iteration numbers `1..=limit` for the reporter.
///
/// # Examples
///
/// ```rust
/// use pimon_core::IterationCounter;
///
/// let mut counter = IterationCounter::new(2);
/// assert_eq!(counter.next_iteration().map(|n| n.get()), Some(1));
/// assert_eq!(counter.next_iteration().map(|n| n.get()), Some(2));
/// assert_eq!(counter.next_iteration(), None);
/// ```
#[derive(Debug, Clone)]
pub struct IterationCounter {
    next: u64,
    limit: u64,
}

impl IterationCounter {
    /// Creates a counter that yields at most `limit` iterations.
    pub fn new(limit: u64) -> Self {
        Self { next: 1, limit }
    }

    /// Returns the next iteration number, or `None` once `limit` numbers have
    /// been handed out.
    pub fn next_iteration(&mut self) -> Option<NonZeroU64> {
        if self.next > self.limit {
            return None;
        }
        let current = NonZeroU64::new(self.next)?;
        self.next += 1;
        Some(current)
    }

    /// Number of iterations handed out so far.
    pub fn issued(&self) -> u64 {
        self.next - 1
    }

    /// Returns `true` once every iteration up to the limit has been issued.
    pub fn is_exhausted(&self) -> bool {
        self.next > self.limit
    }
}

/// Outcome of checking a received iteration against the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationCheck {
    /// Exactly one more than the previous iteration (or 1 for the first).
    InOrder,
    /// Larger than expected; `expected` is what should have arrived.
    Gap { expected: u64, received: u64 },
    /// Not larger than the previous iteration.
    Regressed { previous: u64, received: u64 },
}

/// Tracks the last iteration the monitor has seen.
#[derive(Debug, Clone, Default)]
pub struct IterationTracker {
    last: Option<u64>,
}

impl IterationTracker {
    /// Creates a tracker that has not seen any reading yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `received` and classifies it relative to the previous value.
    pub fn observe(&mut self, received: u64) -> IterationCheck {
        let expected = self.last.map_or(1, |last| last.saturating_add(1));
        let check = match self.last {
            Some(previous) if received <= previous => {
                IterationCheck::Regressed { previous, received }
            }
            _ if received == expected => IterationCheck::InOrder,
            _ => IterationCheck::Gap { expected, received },
        };
        self.last = Some(received);
        check
    }

    /// The most recent iteration observed, if any.
    pub fn last(&self) -> Option<u64> {
        self.last
    }
}
