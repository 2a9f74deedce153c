//! Session configuration shared by the reporter and the monitor.
//!
//! Both binaries read the same schema, optionally from a TOML file:
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 50007
//! max_iterations = 50
//! interval_seconds = 2.0
//! receive_timeout_seconds = 1.0
//! on_malformed_frame = "abort"
//! log_level = "info"
//! ```
//!
//! Every key is optional.  Keys may also be written in camelCase
//! (`maxIterations`, `intervalSeconds`, `receiveTimeoutSeconds`, ...).
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the key is absent, so an empty file (or no file at all)
//! yields the same configuration as [`SessionConfig::default`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for loading and validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// What the monitor does with a non-empty line that is not a valid frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedFramePolicy {
    /// Close the session with a decode failure.
    #[default]
    Abort,
    /// Log a warning, drop the line and keep receiving.
    Skip,
}

impl fmt::Display for MalformedFramePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedFramePolicy::Abort => f.write_str("abort"),
            MalformedFramePolicy::Skip => f.write_str("skip"),
        }
    }
}

impl FromStr for MalformedFramePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(MalformedFramePolicy::Abort),
            "skip" => Ok(MalformedFramePolicy::Skip),
            other => Err(format!("unknown malformed-frame policy {other:?} (expected \"abort\" or \"skip\")")),
        }
    }
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// Runtime settings for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Address the monitor listens on and the reporter connects to.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port of the monitor.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of readings the reporter sends before closing.
    #[serde(default = "default_max_iterations", alias = "maxIterations")]
    pub max_iterations: u64,
    /// Delay between two readings, in seconds.
    #[serde(default = "default_interval_seconds", alias = "intervalSeconds")]
    pub interval_seconds: f64,
    /// Upper bound on one accept or receive attempt, in seconds.
    #[serde(
        default = "default_receive_timeout_seconds",
        alias = "receiveTimeoutSeconds"
    )]
    pub receive_timeout_seconds: f64,
    /// Monitor behaviour on malformed frames.
    #[serde(default, alias = "onMalformedFrame")]
    pub on_malformed_frame: MalformedFramePolicy,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level", alias = "logLevel")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    50007
}
fn default_max_iterations() -> u64 {
    50
}
fn default_interval_seconds() -> f64 {
    2.0
}
fn default_receive_timeout_seconds() -> f64 {
    1.0
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_iterations: default_max_iterations(),
            interval_seconds: default_interval_seconds(),
            receive_timeout_seconds: default_receive_timeout_seconds(),
            on_malformed_frame: MalformedFramePolicy::default(),
            log_level: default_log_level(),
        }
    }
}

/// Command-line overrides applied on top of the file configuration.
///
/// `None` leaves the corresponding value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_iterations: Option<u64>,
    pub interval_seconds: Option<f64>,
    pub receive_timeout_seconds: Option<f64>,
    pub on_malformed_frame: Option<MalformedFramePolicy>,
}

impl SessionConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: SessionConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads the configuration at `path`, returning the defaults if the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system errors other than "not
    /// found", and the errors of [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Applies command-line overrides and re-validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an override is out of range.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(max) = overrides.max_iterations {
            self.max_iterations = max;
        }
        if let Some(interval) = overrides.interval_seconds {
            self.interval_seconds = interval;
        }
        if let Some(timeout) = overrides.receive_timeout_seconds {
            self.receive_timeout_seconds = timeout;
        }
        if let Some(policy) = overrides.on_malformed_frame {
            self.on_malformed_frame = policy;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Invalid`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }
        if Duration::try_from_secs_f64(self.interval_seconds).is_err() {
            return Err(invalid(
                "interval_seconds",
                format!("{} is not a non-negative number of seconds", self.interval_seconds),
            ));
        }
        match Duration::try_from_secs_f64(self.receive_timeout_seconds) {
            Ok(d) if !d.is_zero() => Ok(()),
            _ => Err(invalid(
                "receive_timeout_seconds",
                format!("{} is not a positive number of seconds", self.receive_timeout_seconds),
            )),
        }
    }

    /// `host:port`, suitable for logging and for name resolution.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Delay between two readings.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_seconds).unwrap_or(Duration::ZERO)
    }

    /// Upper bound on one accept or receive attempt.
    pub fn receive_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.receive_timeout_seconds)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(1))
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
