//! Console rendering of the monitor's display state.
//!
//! ```text
//! Server: Connected to 192.168.1.20:53712  [●]
//!   Temperature (°C)   45.0
//!   Core volts (V)     1.2
//!   ARM clock (MHz)    700
//!   Core clock (MHz)   400
//!   ARM mem (MB)       128
//!   Iteration          2
//! ```
//!
//! Values are shown exactly as received.  A panel is written only when it
//! differs from the previous one, so idle refreshes stay silent.

use std::io::Write;

use pimon_core::{ConnectionStatus, DisplaySink, DisplayState};
use tracing::warn;

const LIGHT_ON: &str = "●";
const LIGHT_OFF: &str = "○";

/// Writes one panel per visible change to `out` (normally stdout).
#[derive(Debug)]
pub struct ConsoleDisplay<W: Write> {
    out: W,
    last_panel: Option<String>,
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_panel: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// The status line text for `status`.
pub fn status_text(status: &ConnectionStatus) -> String {
    match status {
        ConnectionStatus::NotConnected => "Server: Waiting for client...".to_string(),
        other => format!("Server: {other}"),
    }
}

/// Formats the monitor's view of `state`.
pub fn render_panel(state: &DisplayState) -> String {
    let light = if state.indicator() { LIGHT_ON } else { LIGHT_OFF };
    let fields = state.fields();
    let rows = [
        ("Temperature (°C)", &fields.temperature_c),
        ("Core volts (V)", &fields.core_volts),
        ("ARM clock (MHz)", &fields.arm_clock_mhz),
        ("Core clock (MHz)", &fields.core_clock_mhz),
        ("ARM mem (MB)", &fields.arm_mem_mb),
        ("Iteration", &fields.iteration),
    ];

    let mut panel = format!("{}  [{light}]", status_text(state.status()));
    for (label, value) in rows {
        panel.push_str(&format!("\n  {label:<18} {value}"));
    }
    panel
}

impl<W: Write> DisplaySink for ConsoleDisplay<W> {
    fn refresh(&mut self, state: &DisplayState) {
        let panel = render_panel(state);
        if self.last_panel.as_deref() == Some(panel.as_str()) {
            return;
        }
        if let Err(e) = writeln!(self.out, "{panel}").and_then(|()| self.out.flush()) {
            warn!("console display write failed: {e}");
        }
        self.last_panel = Some(panel);
    }
}
