//! Reading collector: turns five metric-source queries into one [`Reading`].
//!
//! The metric source answers each query with `vcgencmd`-style text such as
//! `temp=45.3'C` or `frequency(48)=700000000`.  The collector takes the text
//! after the first `=`, splits it into a number and the metric's unit, and
//! rejects anything else following the number:
//!
//! | metric       | raw example              | stored as               |
//! |--------------|--------------------------|-------------------------|
//! | temperature  | `temp=45.3'C`            | `Tenths` (one decimal)  |
//! | core voltage | `volt=1.2000V`           | `Tenths` (one decimal)  |
//! | ARM clock    | `frequency(48)=700000000`| MHz, truncated          |
//! | core clock   | `frequency(1)=400000000` | MHz, truncated          |
//! | ARM memory   | `arm=128M`               | MB                      |
//!
//! If any query fails, or any answer cannot be parsed, no reading is
//! produced.  The collector never retries; the reporter loop decides what a
//! failure means.

use std::fmt;
use std::num::NonZeroU64;

use pimon_core::{Reading, Tenths};
use thiserror::Error;

const HZ_PER_MHZ: u64 = 1_000_000;

/// The five board metrics, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    CoreVolts,
    ArmClock,
    CoreClock,
    ArmMemory,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Temperature => "temperature",
            Metric::CoreVolts => "core voltage",
            Metric::ArmClock => "ARM clock",
            Metric::CoreClock => "core clock",
            Metric::ArmMemory => "ARM memory",
        };
        f.write_str(name)
    }
}

/// Error type for metric queries and their parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricSourceError {
    /// The source could not answer the query at all.
    #[error("{metric} query failed: {reason}")]
    Query { metric: Metric, reason: String },

    /// The source answered with text that does not contain the expected number.
    #[error("unparseable {metric} output: {output:?}")]
    Malformed { metric: Metric, output: String },
}

/// Where raw metric text comes from.
///
/// One method per metric; each call is an independent query and returns the
/// source's raw text.  Implementations live in the infrastructure layer
/// (`vcgencmd`, a simulator); tests use the generated `MockMetricSource`.
#[cfg_attr(test, mockall::automock)]
pub trait MetricSource {
    /// SoC temperature, e.g. `temp=45.3'C`.
    fn temperature(&mut self) -> Result<String, MetricSourceError>;

    /// Core voltage, e.g. `volt=1.2000V`.
    fn core_volts(&mut self) -> Result<String, MetricSourceError>;

    /// ARM clock in Hz, e.g. `frequency(48)=700000000`.
    fn arm_clock(&mut self) -> Result<String, MetricSourceError>;

    /// Core clock in Hz, e.g. `frequency(1)=400000000`.
    fn core_clock(&mut self) -> Result<String, MetricSourceError>;

    /// Memory assigned to the ARM, e.g. `arm=128M`.
    fn arm_memory(&mut self) -> Result<String, MetricSourceError>;
}

impl<M: MetricSource + ?Sized> MetricSource for Box<M> {
    fn temperature(&mut self) -> Result<String, MetricSourceError> {
        (**self).temperature()
    }
    fn core_volts(&mut self) -> Result<String, MetricSourceError> {
        (**self).core_volts()
    }
    fn arm_clock(&mut self) -> Result<String, MetricSourceError> {
        (**self).arm_clock()
    }
    fn core_clock(&mut self) -> Result<String, MetricSourceError> {
        (**self).core_clock()
    }
    fn arm_memory(&mut self) -> Result<String, MetricSourceError> {
        (**self).arm_memory()
    }
}

/// Queries every metric once and assembles the reading for `iteration`.
///
/// # Errors
///
/// Returns the first [`MetricSourceError`] encountered.  Metrics after the
/// failing one are not queried.
pub fn collect_reading<M: MetricSource + ?Sized>(
    source: &mut M,
    iteration: NonZeroU64,
) -> Result<Reading, MetricSourceError> {
    let temperature = parse_decimal(Metric::Temperature, &source.temperature()?)?;
    let core_volts = parse_decimal(Metric::CoreVolts, &source.core_volts()?)?;
    let arm_clock = parse_whole(Metric::ArmClock, &source.arm_clock()?)? / HZ_PER_MHZ;
    let core_clock = parse_whole(Metric::CoreClock, &source.core_clock()?)? / HZ_PER_MHZ;
    let arm_memory = parse_whole(Metric::ArmMemory, &source.arm_memory()?)?;

    Ok(Reading::new(
        temperature,
        core_volts,
        arm_clock,
        core_clock,
        arm_memory,
        iteration,
    ))
}

/// The text after the first `=`, or the whole text when there is none.
fn value_text(raw: &str) -> &str {
    raw.split_once('=').map_or(raw, |(_, value)| value).trim()
}

/// Longest prefix of `text` that looks like a number: an optional sign
/// (only when `signed`), digits, and at most one `.` (only when `fractional`).
fn numeric_prefix(text: &str, signed: bool, fractional: bool) -> &str {
    let mut seen_dot = false;
    let end = text
        .char_indices()
        .find(|&(i, c)| match c {
            '0'..='9' => false,
            '-' | '+' if signed && i == 0 => false,
            '.' if fractional && !seen_dot => {
                seen_dot = true;
                false
            }
            _ => true,
        })
        .map_or(text.len(), |(i, _)| i);
    &text[..end]
}

/// The unit `vcgencmd` prints right after each metric's number.
fn unit_suffix(metric: Metric) -> &'static str {
    match metric {
        Metric::Temperature => "'C",
        Metric::CoreVolts => "V",
        Metric::ArmClock | Metric::CoreClock => "",
        Metric::ArmMemory => "M",
    }
}

/// The number in `raw`, provided nothing but the metric's unit follows it.
fn number_text(
    metric: Metric,
    raw: &str,
    signed: bool,
    fractional: bool,
) -> Result<&str, MetricSourceError> {
    let value = value_text(raw);
    let number = numeric_prefix(value, signed, fractional);
    if number.is_empty() || &value[number.len()..] != unit_suffix(metric) {
        return Err(malformed(metric, raw));
    }
    Ok(number)
}

fn parse_decimal(metric: Metric, raw: &str) -> Result<Tenths, MetricSourceError> {
    number_text(metric, raw, true, true)?
        .parse::<f64>()
        .ok()
        .and_then(Tenths::from_f64)
        .ok_or_else(|| malformed(metric, raw))
}

fn parse_whole(metric: Metric, raw: &str) -> Result<u64, MetricSourceError> {
    number_text(metric, raw, false, false)?
        .parse::<u64>()
        .map_err(|_| malformed(metric, raw))
}

fn malformed(metric: Metric, raw: &str) -> MetricSourceError {
    MetricSourceError::Malformed {
        metric,
        output: raw.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn iteration(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    /// A mock that answers every query with typical Raspberry Pi output.
    fn healthy_source() -> MockMetricSource {
        let mut source = MockMetricSource::new();
        source
            .expect_temperature()
            .returning(|| Ok("temp=45.3'C".to_string()));
        source
            .expect_core_volts()
            .returning(|| Ok("volt=1.2000V".to_string()));
        source
            .expect_arm_clock()
            .returning(|| Ok("frequency(48)=700000000".to_string()));
        source
            .expect_core_clock()
            .returning(|| Ok("frequency(1)=400000000".to_string()));
        source
            .expect_arm_memory()
            .returning(|| Ok("arm=128M".to_string()));
        source
    }

    // ── collect_reading ───────────────────────────────────────────────────────

    #[test]
    fn test_collect_reading_formats_all_five_metrics() {
        // Arrange
        let mut source = healthy_source();

        // Act
        let reading = collect_reading(&mut source, iteration(7)).expect("healthy source");

        // Assert
        assert_eq!(reading.temperature_c().to_string(), "45.3");
        assert_eq!(reading.core_volts().to_string(), "1.2");
        assert_eq!(reading.arm_clock_mhz(), 700);
        assert_eq!(reading.core_clock_mhz(), 400);
        assert_eq!(reading.arm_mem_mb(), 128);
        assert_eq!(reading.iteration(), 7);
    }

    #[test]
    fn test_collect_reading_queries_each_metric_exactly_once() {
        // Arrange
        let mut source = MockMetricSource::new();
        source
            .expect_temperature()
            .times(1)
            .returning(|| Ok("temp=40.0'C".to_string()));
        source
            .expect_core_volts()
            .times(1)
            .returning(|| Ok("volt=1.20V".to_string()));
        source
            .expect_arm_clock()
            .times(1)
            .returning(|| Ok("frequency(48)=1500000000".to_string()));
        source
            .expect_core_clock()
            .times(1)
            .returning(|| Ok("frequency(1)=500000000".to_string()));
        source
            .expect_arm_memory()
            .times(1)
            .returning(|| Ok("arm=948M".to_string()));

        // Act / Assert (mock verifies call counts on drop)
        assert!(collect_reading(&mut source, iteration(1)).is_ok());
    }

    #[test]
    fn test_clock_conversion_truncates_instead_of_rounding() {
        // Arrange
        let mut source = MockMetricSource::new();
        source
            .expect_temperature()
            .returning(|| Ok("temp=45.0'C".to_string()));
        source
            .expect_core_volts()
            .returning(|| Ok("volt=1.2V".to_string()));
        source
            .expect_arm_clock()
            .returning(|| Ok("frequency(48)=699999999".to_string()));
        source
            .expect_core_clock()
            .returning(|| Ok("frequency(1)=999999".to_string()));
        source
            .expect_arm_memory()
            .returning(|| Ok("arm=128M".to_string()));

        // Act
        let reading = collect_reading(&mut source, iteration(1)).unwrap();

        // Assert
        assert_eq!(reading.arm_clock_mhz(), 699);
        assert_eq!(reading.core_clock_mhz(), 0);
    }

    #[test]
    fn test_failed_query_fails_whole_collection_and_stops_querying() {
        // Arrange: the voltage query fails; later metrics must not be asked.
        let mut source = MockMetricSource::new();
        source
            .expect_temperature()
            .times(1)
            .returning(|| Ok("temp=45.0'C".to_string()));
        source.expect_core_volts().times(1).returning(|| {
            Err(MetricSourceError::Query {
                metric: Metric::CoreVolts,
                reason: "vcgencmd exited with status 255".to_string(),
            })
        });
        source.expect_arm_clock().never();
        source.expect_core_clock().never();
        source.expect_arm_memory().never();

        // Act
        let err = collect_reading(&mut source, iteration(1)).unwrap_err();

        // Assert
        assert!(matches!(
            err,
            MetricSourceError::Query {
                metric: Metric::CoreVolts,
                ..
            }
        ));
    }

    #[test]
    fn test_unparseable_output_is_malformed_error() {
        // Arrange
        let mut source = MockMetricSource::new();
        source
            .expect_temperature()
            .returning(|| Ok("error=1 error_msg=\"Command not registered\"".to_string()));

        // Act
        let err = collect_reading(&mut source, iteration(1)).unwrap_err();

        // Assert
        assert_eq!(
            err,
            MetricSourceError::Malformed {
                metric: Metric::Temperature,
                output: "error=1 error_msg=\"Command not registered\"".to_string(),
            }
        );
        assert!(err.to_string().starts_with("unparseable temperature output"));
    }

    // ── Parsing helpers ───────────────────────────────────────────────────────

    #[test]
    fn test_value_text_takes_everything_after_first_equals() {
        assert_eq!(value_text("frequency(48)=700000000"), "700000000");
        assert_eq!(value_text("temp=45.3'C\n"), "45.3'C");
        assert_eq!(value_text("  128M "), "128M");
    }

    #[test]
    fn test_numeric_prefix_stops_at_unit_suffix() {
        assert_eq!(numeric_prefix("45.3'C", true, true), "45.3");
        assert_eq!(numeric_prefix("1.2000V", true, true), "1.2000");
        assert_eq!(numeric_prefix("-3.5'C", true, true), "-3.5");
        assert_eq!(numeric_prefix("1.2.3", true, true), "1.2");
        assert_eq!(numeric_prefix("128M", false, false), "128");
        assert_eq!(numeric_prefix("-1", false, false), "");
    }

    #[test]
    fn test_parse_decimal_rounds_to_one_digit() {
        let volts = parse_decimal(Metric::CoreVolts, "volt=1.2375V").unwrap();
        assert_eq!(volts.to_string(), "1.2");
    }

    #[test]
    fn test_parse_whole_rejects_negative_and_empty_values() {
        assert!(parse_whole(Metric::ArmMemory, "arm=-5M").is_err());
        assert!(parse_whole(Metric::ArmMemory, "arm=").is_err());
        assert_eq!(parse_whole(Metric::ArmMemory, "arm=76M"), Ok(76));
    }

    #[test]
    fn test_trailing_text_after_number_is_malformed() {
        assert!(parse_whole(Metric::ArmClock, "frequency(48)=700000000 junk").is_err());
        assert!(parse_decimal(Metric::Temperature, "temp=45.0'C extra").is_err());
        assert!(parse_decimal(Metric::CoreVolts, "volt=1.2000").is_err());
        assert!(parse_whole(Metric::ArmMemory, "arm=128K").is_err());
    }

    #[test]
    fn test_vcgencmd_error_text_is_not_a_value() {
        let raw = "error=1 error_msg=\"Command not registered\"";
        for metric in [Metric::Temperature, Metric::CoreVolts] {
            assert_eq!(parse_decimal(metric, raw), Err(malformed(metric, raw)));
        }
        assert!(parse_whole(Metric::CoreClock, raw).is_err());
    }

    #[test]
    fn test_expected_units_are_accepted() {
        assert_eq!(
            parse_decimal(Metric::Temperature, "temp=-3.5'C"),
            Ok(Tenths::from_tenths(-35))
        );
        assert_eq!(parse_whole(Metric::CoreClock, "frequency(1)=400000000"), Ok(400_000_000));
        assert_eq!(parse_whole(Metric::ArmMemory, "arm=948M"), Ok(948));
    }

    #[test]
    fn test_metric_names_are_human_readable() {
        assert_eq!(Metric::ArmClock.to_string(), "ARM clock");
        assert_eq!(Metric::CoreVolts.to_string(), "core voltage");
    }
}
