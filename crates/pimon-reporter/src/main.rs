//! pimon reporter entry point.
//!
//! Loads the session configuration, applies command-line overrides, wires the
//! selected metric source, the console display and the Ctrl-C stop action
//! into a [`Reporter`], and runs one session on a single-threaded runtime.
//!
//! # Usage
//!
//! ```text
//! pimon-reporter [OPTIONS]
//!
//! Options:
//!   --config <PATH>                 TOML config file [default: pimon.toml]
//!   --host <HOST>                   Monitor address
//!   --port <PORT>                   Monitor TCP port
//!   --max-iterations <N>            Readings to send before closing
//!   --interval-seconds <SECS>       Delay between readings
//!   --metric-source <SOURCE>        vcgencmd | simulated [default: vcgencmd]
//!   --vcgencmd <PATH>               vcgencmd executable [default: vcgencmd]
//! ```
//!
//! Log output goes to stderr; `RUST_LOG` takes precedence over the
//! configured `log_level`.  The process exits with an error status when the
//! session closed because of a failure.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pimon_core::{ConfigOverrides, SessionConfig};
use pimon_reporter::application::report_readings::Reporter;
use pimon_reporter::infrastructure::{
    controls::{spawn_ctrl_c_watcher, watch_stop},
    display::ConsoleDisplay,
    metric_source::{build_metric_source, vcgencmd::DEFAULT_VCGENCMD, MetricSourceKind},
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Samples board metrics and streams them to a pimon monitor.
#[derive(Debug, Parser)]
#[command(name = "pimon-reporter", version)]
struct Cli {
    /// TOML configuration file.  A missing file means "use the defaults".
    #[arg(long, default_value = "pimon.toml")]
    config: PathBuf,

    /// Address of the monitor.
    #[arg(long)]
    host: Option<String>,

    /// TCP port of the monitor.
    #[arg(long)]
    port: Option<u16>,

    /// Number of readings to send before closing the session.
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Delay between two readings, in seconds.
    #[arg(long)]
    interval_seconds: Option<f64>,

    /// Where readings come from: `vcgencmd` or `simulated`.
    #[arg(long, default_value_t = MetricSourceKind::Vcgencmd)]
    metric_source: MetricSourceKind,

    /// Path of the `vcgencmd` executable.
    #[arg(long, default_value = DEFAULT_VCGENCMD)]
    vcgencmd: PathBuf,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            max_iterations: self.max_iterations,
            interval_seconds: self.interval_seconds,
            ..Default::default()
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = SessionConfig::load(&cli.config)
        .and_then(|cfg| cfg.with_overrides(cli.overrides()))
        .with_context(|| format!("invalid configuration ({})", cli.config.display()))?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        endpoint = %config.endpoint(),
        max_iterations = config.max_iterations,
        interval_seconds = config.interval_seconds,
        source = %cli.metric_source,
        "pimon reporter starting"
    );

    let source = build_metric_source(cli.metric_source, cli.vcgencmd);
    let display = ConsoleDisplay::new(std::io::stdout());
    let stop = watch_stop(spawn_ctrl_c_watcher());

    let summary = Reporter::new(config, source, display, stop).run().await;

    if !summary.is_success() {
        anyhow::bail!("session ended: {}", summary.close_reason);
    }
    info!(frames = summary.frames, "pimon reporter stopped");
    Ok(())
}
