//! Rendering of the text frame handed to the display sink.

use std::time::Duration;

pub const END_OF_TEXT_MESSAGE: &str = "*** END OF TEXT ***";
pub const MIN_DISPLAY_TIMEOUT: Duration = Duration::from_secs(1);

/// Below this progress the projected total is too noisy to show.
const ESTIMATE_MIN_PERCENT: u8 = 5;

/// `MM:SS`; minutes keep counting past an hour.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Projected total running time in whole seconds, or `None` where the estimate is
/// suppressed (under 5% or already complete).
pub fn projected_total(elapsed: Duration, percent: u8) -> Option<u64> {
    if !(ESTIMATE_MIN_PERCENT..100).contains(&percent) {
        return None;
    }
    let total = elapsed.as_secs_f64() / (f64::from(percent) / 100.0);
    Some(total.round() as u64)
}

/// `[P%] | MM:SS`, optionally followed by `| Est Total: MM:SS` (or `--:--`).
pub fn progress_header(percent: u8, elapsed: Duration, show_estimate: bool) -> String {
    let mut header = format!("[{percent}%] | {}", format_clock(elapsed.as_secs()));
    if show_estimate {
        let estimate = projected_total(elapsed, percent)
            .map(format_clock)
            .unwrap_or_else(|| "--:--".to_string());
        header.push_str(" | Est Total: ");
        header.push_str(&estimate);
    }
    header
}

pub fn lines_frame(header: &str, lines: &[String]) -> String {
    let mut frame = String::with_capacity(header.len() + 1 + lines.iter().map(|l| l.len() + 1).sum::<usize>());
    frame.push_str(header);
    frame.push('\n');
    frame.push_str(&lines.join("\n"));
    frame
}

pub fn end_message_frame(header: &str) -> String {
    format!("{header}\n\n{END_OF_TEXT_MESSAGE}")
}

/// Display timeout hint: twice the active timer period, never below one second.
pub fn display_timeout(active_period: Duration) -> Duration {
    (active_period * 2).max(MIN_DISPLAY_TIMEOUT)
}
