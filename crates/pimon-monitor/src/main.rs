//! pimon monitor entry point.
//!
//! # Usage
//!
//! ```text
//! pimon-monitor [OPTIONS]
//!
//! Options:
//!   --config <PATH>                     TOML config file [default: pimon.toml]
//!   --host <HOST>                       Listen address
//!   --port <PORT>                       Listen TCP port
//!   --receive-timeout-seconds <SECS>    Bound on each accept and receive
//!   --on-malformed-frame <POLICY>       abort | skip
//! ```
//!
//! Log output goes to stderr; `RUST_LOG` takes precedence over the
//! configured `log_level`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pimon_core::{ConfigOverrides, MalformedFramePolicy, SessionConfig};
use pimon_monitor::application::receive_readings::Monitor;
use pimon_monitor::infrastructure::{
    controls::{spawn_ctrl_c_watcher, watch_stop},
    display::ConsoleDisplay,
};

/// Accepts one pimon reporter and shows its readings.
#[derive(Debug, Parser)]
#[command(name = "pimon-monitor", version)]
struct Cli {
    /// TOML configuration file.  A missing file means "use the defaults".
    #[arg(long, default_value = "pimon.toml")]
    config: PathBuf,

    /// Address to listen on.
    #[arg(long)]
    host: Option<String>,

    /// TCP port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Upper bound on each accept and receive, in seconds.
    #[arg(long)]
    receive_timeout_seconds: Option<f64>,

    /// What to do with a line that is not a valid reading: `abort` or `skip`.
    #[arg(long)]
    on_malformed_frame: Option<MalformedFramePolicy>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            receive_timeout_seconds: self.receive_timeout_seconds,
            on_malformed_frame: self.on_malformed_frame,
            ..Default::default()
        }
    }
}

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
        receive_timeout_seconds = config.receive_timeout_seconds,
        on_malformed_frame = %config.on_malformed_frame,
        "pimon monitor starting"
    );

    let display = ConsoleDisplay::new(std::io::stdout());
    let stop = watch_stop(spawn_ctrl_c_watcher());

    let summary = Monitor::new(config, display, stop).run().await;

    if !summary.is_success() {
        anyhow::bail!("session ended: {}", summary.close_reason);
    }
    info!(
        frames = summary.frames,
        last_iteration = ?summary.last_iteration,
        "pimon monitor stopped"
    );
    Ok(())
}
