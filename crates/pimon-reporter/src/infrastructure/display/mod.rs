//! Console rendering of the reporter's display state.
//!
//! The reporter shows a status line, the activity light and the iteration it
//! last sent:
//!
//! ```text
//! Client: Connected  [●]  sent #3
//! ```
//!
//! A line is written only when it differs from the previous one, so idle
//! refreshes do not flood the terminal.

use std::io::Write;

use pimon_core::{ConnectionStatus, DisplaySink, DisplayState, PLACEHOLDER};
use tracing::warn;

const LIGHT_ON: &str = "●";
const LIGHT_OFF: &str = "○";

/// Writes one line per visible change to `out` (normally stdout).
#[derive(Debug)]
pub struct ConsoleDisplay<W: Write> {
    out: W,
    last_line: Option<String>,
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_line: None,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats the reporter's view of `state`.
pub fn render_line(state: &DisplayState) -> String {
    let status = match state.status() {
        ConnectionStatus::Closed => "Finished".to_string(),
        other => format!("Client: {other}"),
    };
    let light = if state.indicator() { LIGHT_ON } else { LIGHT_OFF };
    let iteration = &state.fields().iteration;
    if iteration == PLACEHOLDER {
        format!("{status}  [{light}]")
    } else {
        format!("{status}  [{light}]  sent #{iteration}")
    }
}

impl<W: Write> DisplaySink for ConsoleDisplay<W> {
    fn refresh(&mut self, state: &DisplayState) {
        let line = render_line(state);
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!("console display write failed: {e}");
        }
        self.last_line = Some(line);
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use pimon_core::{Reading, Tenths};

    use super::*;

    fn reading(iteration: u64) -> Reading {
        Reading::new(
            Tenths::from_tenths(450),
            Tenths::from_tenths(12),
            700,
            400,
            128,
            NonZeroU64::new(iteration).unwrap(),
        )
    }

    #[test]
    fn test_render_line_before_connecting() {
        let state = DisplayState::new();
        assert_eq!(render_line(&state), "Client: Not connected  [○]");
    }

    #[test]
    fn test_render_line_after_sending() {
        // Arrange
        let mut state = DisplayState::new();
        state.set_status(ConnectionStatus::Connected { peer: None });

        // Act
        state.apply_reading(&reading(3));

        // Assert
        assert_eq!(render_line(&state), "Client: Connected  [●]  sent #3");
    }

    #[test]
    fn test_render_line_when_closed() {
        let mut state = DisplayState::new();
        state.mark_closed();
        assert_eq!(render_line(&state), "Finished  [○]");
    }

    #[test]
    fn test_unchanged_state_is_written_once() {
        // Arrange
        let mut display = ConsoleDisplay::new(Vec::new());
        let mut state = DisplayState::new();

        // Act
        display.refresh(&state);
        display.refresh(&state);
        state.toggle_indicator();
        display.refresh(&state);

        // Assert
        let text = String::from_utf8(display.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
