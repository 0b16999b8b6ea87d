//! Display utilities for the belld CLI.
//!
//! This module provides formatted output for:
//! - Success messages
//! - Error messages
//! - Status display

use std::path::Path;

use crate::types::IpcResponse;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the result of a ring request.
    pub fn show_ring_success(response: &IpcResponse) {
        let coalesced = response
            .data
            .as_ref()
            .and_then(|d| d.coalesced)
            .unwrap_or(false);
        if coalesced {
            println!("* Bell already pending, merged");
        } else {
            println!("* Bell rung");
        }
    }

    /// Shows the daemon status.
    pub fn show_status(response: &IpcResponse) {
        println!("belld status");
        println!("─────────────────────────────");

        let Some(data) = &response.data else {
            println!("No status available");
            return;
        };

        if let Some(mode) = &data.mode {
            println!("Beep:      {}", mode);
        }
        if let Some(throttle) = data.throttle_ms {
            println!("Throttle:  {}", Self::format_throttle(throttle));
        }
        if let Some(rings) = data.rings {
            println!("Rings:     {}", rings);
        }
        if let Some(beeps) = data.beeps {
            println!("Beeps:     {}", beeps);
        }
        if let Some(failures) = data.failures {
            println!("Failures:  {}", failures);
        }
    }

    /// Shows a success message for a one-off beep.
    pub fn show_play_success(label: &str) {
        println!("* Played {}", label);
    }

    /// Shows a success message for a rendered beep.
    pub fn show_render_success(path: &Path, frames: usize) {
        println!("* Wrote {} frames to {}", frames, path.display());
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("belld: {}", message);
    }

    /// Shows a hint after an error.
    pub fn show_hint(hint: &str) {
        eprintln!("  hint: {}", hint);
    }

    fn format_throttle(throttle_ms: u64) -> String {
        if throttle_ms == 0 {
            "off".to_string()
        } else {
            format!("{} ms", throttle_ms)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseData;

    #[test]
    fn test_format_throttle() {
        assert_eq!(Display::format_throttle(0), "off");
        assert_eq!(Display::format_throttle(250), "250 ms");
    }

    #[test]
    fn test_show_functions_do_not_panic() {
        let response = IpcResponse::success(
            "",
            Some(ResponseData {
                mode: Some("command `true`".to_string()),
                throttle_ms: Some(100),
                rings: Some(1),
                beeps: Some(1),
                failures: Some(0),
                coalesced: Some(true),
            }),
        );
        Display::show_ring_success(&response);
        Display::show_status(&response);
        Display::show_status(&IpcResponse::success("", None));
        Display::show_play_success("sine beep");
        Display::show_render_success(Path::new("beep.wav"), 4410);
        Display::show_error("something failed");
        Display::show_hint("try again");
    }
}
