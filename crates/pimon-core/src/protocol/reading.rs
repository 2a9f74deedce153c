//! The reading record: one sample of the five board metrics plus its
//! position in the session.
//!
//! # Wire representation
//!
//! The five metric fields travel as JSON *strings* and `iteration` travels as
//! a JSON integer:
//!
//! ```text
//! {"temperature_c":"45.0","core_volts":"1.2","arm_clock_mhz":"700","core_clock_mhz":"400","arm_mem_mb":"128","iteration":1}
//! ```
//!
//! Keeping the metrics as text means the monitor can mirror exactly what the
//! reporter rendered, while the Rust side still holds typed values.

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string is not a valid one-decimal number.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid decimal value: {0:?}")]
pub struct ParseTenthsError(pub String);

/// A decimal value with exactly one fractional digit, stored as a whole
/// number of tenths.
///
/// `Tenths::from_tenths(452)` renders as `"45.2"`.  Storing the scaled
/// integer rather than an `f64` makes encode/decode lossless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tenths(i64);

impl Tenths {
    /// Builds a value from a raw count of tenths.
    pub const fn from_tenths(tenths: i64) -> Self {
        Self(tenths)
    }

    /// Returns the raw count of tenths.
    pub const fn tenths(self) -> i64 {
        self.0
    }

    /// Rounds a real number to one decimal place.
    ///
    /// Rounding follows `format!("{:.1}")`, i.e. it is applied to the exact
    /// binary value of `value`.  Returns `None` for NaN, infinities and
    /// magnitudes that do not fit.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let rendered = format!("{value:.1}");
        let digits: String = rendered.chars().filter(|c| *c != '.').collect();
        digits.parse::<i64>().ok().map(Self)
    }

    /// Returns the value as an `f64`.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", magnitude / 10, magnitude % 10)
    }
}

impl FromStr for Tenths {
    type Err = ParseTenthsError;

    /// Accepts only `[-]digits.digit`.  Anything that would need rounding
    /// (`"45.26"`, `"1e1"`, `"128"`) is an error; use
    /// [`Tenths::from_f64`] to round deliberately.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_exact_tenths(s)
            .map(Self)
            .ok_or_else(|| ParseTenthsError(s.to_string()))
    }
}

/// Parses `[-]digits.digit` without going through `f64`, so every value
/// `Display` produces parses back exactly.
fn parse_exact_tenths(s: &str) -> Option<i64> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (whole, frac) = body.split_once('.')?;
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || frac.len() != 1 || !all_digits(frac) {
        return None;
    }
    let magnitude = whole.parse::<i128>().ok()? * 10 + frac.parse::<i128>().ok()?;
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

/// One sample of the board metrics.
///
/// A `Reading` is immutable once produced: its fields are private and only
/// exposed through accessors.  `iteration` is the only ordering key between
/// readings and is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(with = "as_text")]
    temperature_c: Tenths,
    #[serde(with = "as_text")]
    core_volts: Tenths,
    #[serde(with = "as_text")]
    arm_clock_mhz: u64,
    #[serde(with = "as_text")]
    core_clock_mhz: u64,
    #[serde(with = "as_text")]
    arm_mem_mb: u64,
    iteration: NonZeroU64,
}

impl Reading {
    /// Creates a reading from already-formatted metric values.
    pub fn new(
        temperature_c: Tenths,
        core_volts: Tenths,
        arm_clock_mhz: u64,
        core_clock_mhz: u64,
        arm_mem_mb: u64,
        iteration: NonZeroU64,
    ) -> Self {
        Self {
            temperature_c,
            core_volts,
            arm_clock_mhz,
            core_clock_mhz,
            arm_mem_mb,
            iteration,
        }
    }

    /// SoC temperature in degrees Celsius.
    pub fn temperature_c(&self) -> Tenths {
        self.temperature_c
    }

    /// Core voltage in volts.
    pub fn core_volts(&self) -> Tenths {
        self.core_volts
    }

    /// ARM clock in MHz.
    pub fn arm_clock_mhz(&self) -> u64 {
        self.arm_clock_mhz
    }

    /// Core (GPU) clock in MHz.
    pub fn core_clock_mhz(&self) -> u64 {
        self.core_clock_mhz
    }

    /// Memory split assigned to the ARM, in MB.
    pub fn arm_mem_mb(&self) -> u64 {
        self.arm_mem_mb
    }

    /// Position of this reading in its session, starting at 1.
    pub fn iteration(&self) -> u64 {
        self.iteration.get()
    }
}

/// Serde adapter that writes a value with `Display` and reads it back with
/// `FromStr`, so numbers travel as JSON strings.
///
/// Only the canonical text is accepted: a string that parses but would be
/// displayed differently (`" 700"`, `"+700"`, `"0700"`) is rejected, so the
/// monitor always shows the received text unchanged.
mod as_text {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr + Display,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let value = text.parse::<T>().map_err(de::Error::custom)?;
        if value.to_string() != text {
            return Err(de::Error::custom(format!("non-canonical value {text:?}")));
        }
        Ok(value)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
