//! Metric source implementations.
//!
//! | Module      | Source                                            |
//! |-------------|---------------------------------------------------|
//! | `vcgencmd`  | Runs the Raspberry Pi `vcgencmd` tool per query.  |
//! | `simulated` | Deterministic synthetic values, any platform.     |
//!
//! The binary picks one with `--metric-source` and hands it to the reporter
//! as a boxed [`MetricSource`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::application::collect_reading::MetricSource;

pub mod simulated;
pub mod vcgencmd;

pub use simulated::SimulatedSource;
pub use vcgencmd::VcgencmdSource;

/// Which metric source to run the reporter with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetricSourceKind {
    #[default]
    Vcgencmd,
    Simulated,
}

impl fmt::Display for MetricSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricSourceKind::Vcgencmd => f.write_str("vcgencmd"),
            MetricSourceKind::Simulated => f.write_str("simulated"),
        }
    }
}

impl FromStr for MetricSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vcgencmd" => Ok(MetricSourceKind::Vcgencmd),
            "simulated" => Ok(MetricSourceKind::Simulated),
            other => Err(format!(
                "unknown metric source {other:?} (expected \"vcgencmd\" or \"simulated\")"
            )),
        }
    }
}

/// Builds the source selected by `kind`.
///
/// `vcgencmd` is only used by [`MetricSourceKind::Vcgencmd`].
pub fn build_metric_source(kind: MetricSourceKind, vcgencmd: PathBuf) -> Box<dyn MetricSource> {
    match kind {
        MetricSourceKind::Vcgencmd => Box::new(VcgencmdSource::new(vcgencmd)),
        MetricSourceKind::Simulated => Box::new(SimulatedSource::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parses_case_insensitively() {
        assert_eq!("Simulated".parse::<MetricSourceKind>(), Ok(MetricSourceKind::Simulated));
        assert_eq!("vcgencmd".parse::<MetricSourceKind>(), Ok(MetricSourceKind::Vcgencmd));
        assert!("sensors".parse::<MetricSourceKind>().is_err());
    }

    #[test]
    fn test_built_simulated_source_answers_queries() {
        let mut source = build_metric_source(MetricSourceKind::Simulated, PathBuf::new());
        assert_eq!(source.arm_memory().unwrap(), "arm=948M");
    }
}
