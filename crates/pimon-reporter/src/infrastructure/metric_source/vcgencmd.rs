//! Metric source backed by the Raspberry Pi `vcgencmd` tool.
//!
//! Each query spawns `vcgencmd` directly (no shell) and returns its trimmed
//! standard output.  A spawn failure, a non-zero exit status or non-UTF-8
//! output is a [`MetricSourceError::Query`].

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::trace;

use crate::application::collect_reading::{Metric, MetricSource, MetricSourceError};

/// Default program name, resolved through `PATH`.
pub const DEFAULT_VCGENCMD: &str = "vcgencmd";

/// Runs `vcgencmd` once per query.
#[derive(Debug, Clone)]
pub struct VcgencmdSource {
    program: PathBuf,
}

impl VcgencmdSource {
    /// Uses `program` as the `vcgencmd` executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The executable this source runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The `vcgencmd` arguments for `metric`.
    pub fn arguments(metric: Metric) -> &'static [&'static str] {
        match metric {
            Metric::Temperature => &["measure_temp"],
            Metric::CoreVolts => &["measure_volts", "core"],
            Metric::ArmClock => &["measure_clock", "arm"],
            Metric::CoreClock => &["measure_clock", "core"],
            Metric::ArmMemory => &["get_mem", "arm"],
        }
    }

    fn query(&self, metric: Metric) -> Result<String, MetricSourceError> {
        let args = Self::arguments(metric);
        let fail = |reason: String| MetricSourceError::Query { metric, reason };

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| fail(format!("could not run {}: {e}", self.program.display())))?;

        if !output.status.success() {
            return Err(fail(format!(
                "{} {} exited with {}",
                self.program.display(),
                args.join(" "),
                output.status
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|_| fail("output is not valid UTF-8".to_string()))?;
        let text = text.trim().to_string();
        trace!(%metric, output = %text, "vcgencmd answered");
        Ok(text)
    }
}

impl Default for VcgencmdSource {
    fn default() -> Self {
        Self::new(DEFAULT_VCGENCMD)
    }
}

impl MetricSource for VcgencmdSource {
    fn temperature(&mut self) -> Result<String, MetricSourceError> {
        self.query(Metric::Temperature)
    }

    fn core_volts(&mut self) -> Result<String, MetricSourceError> {
        self.query(Metric::CoreVolts)
    }

    fn arm_clock(&mut self) -> Result<String, MetricSourceError> {
        self.query(Metric::ArmClock)
    }

    fn core_clock(&mut self) -> Result<String, MetricSourceError> {
        self.query(Metric::CoreClock)
    }

    fn arm_memory(&mut self) -> Result<String, MetricSourceError> {
        self.query(Metric::ArmMemory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_match_vcgencmd_subcommands() {
        assert_eq!(VcgencmdSource::arguments(Metric::Temperature), ["measure_temp"]);
        assert_eq!(
            VcgencmdSource::arguments(Metric::CoreVolts),
            ["measure_volts", "core"]
        );
        assert_eq!(
            VcgencmdSource::arguments(Metric::ArmClock),
            ["measure_clock", "arm"]
        );
        assert_eq!(
            VcgencmdSource::arguments(Metric::CoreClock),
            ["measure_clock", "core"]
        );
        assert_eq!(VcgencmdSource::arguments(Metric::ArmMemory), ["get_mem", "arm"]);
    }

    #[test]
    fn test_missing_program_is_query_error() {
        // Arrange
        let mut source = VcgencmdSource::new("/nonexistent/pimon/vcgencmd");

        // Act
        let err = source.temperature().unwrap_err();

        // Assert
        assert!(matches!(
            err,
            MetricSourceError::Query {
                metric: Metric::Temperature,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_program_output_is_trimmed() {
        // `echo` prints its arguments, which stands in for vcgencmd here.
        let mut source = VcgencmdSource::new("echo");
        assert_eq!(source.arm_memory().unwrap(), "get_mem arm");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_query_error() {
        let mut source = VcgencmdSource::new("false");
        let err = source.core_clock().unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[test]
    fn test_default_program_is_vcgencmd() {
        assert_eq!(VcgencmdSource::default().program(), Path::new("vcgencmd"));
    }
}
