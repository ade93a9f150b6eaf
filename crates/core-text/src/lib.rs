//! Script text processing: fixed-width layout and stage direction filtering.
//!
//! Every script version produces two index-aligned line sequences built from the same
//! paragraph structure:
//! * display lines: stage directions rendered per [`DisplayMode`];
//! * speech lines: stage directions always stripped, used for matching live speech.
//!
//! The sequences are wrapped independently, so a heavily annotated script may produce
//! fewer speech lines than display lines. Line indices are treated as comparable anyway;
//! consumers must tolerate an index that is valid in one sequence and past the end of the
//! other (see [`window_has_content`]).

pub mod layout;
pub mod stage;

pub use layout::{
    FALLBACK_WORDS_PER_LINE, LayoutError, effective_words_per_line, estimate_words_per_line, wrap,
};
pub use stage::{DelimiterKind, DisplayMode, find_ranges, strip, transform};

use tracing::debug;

/// Inputs that shape a [`ScriptLayout`]. Any change requires a full re-layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    pub line_width: usize,
    pub delimiter: DelimiterKind,
    pub display_mode: DisplayMode,
}

impl LayoutOptions {
    pub const fn new(line_width: usize, delimiter: DelimiterKind, display_mode: DisplayMode) -> Self {
        Self {
            line_width,
            delimiter,
            display_mode,
        }
    }
}

/// Display and speech line sequences for one script version.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLayout {
    display: Vec<String>,
    speech: Vec<String>,
    words_per_line: f64,
}

impl ScriptLayout {
    /// Lay out `text` for display and speech matching in one pass.
    pub fn build(text: &str, options: &LayoutOptions) -> Result<Self, LayoutError> {
        let shown = transform(text, options.delimiter, options.display_mode);
        let spoken = strip(text, options.delimiter);
        let display = wrap(&shown, options.line_width)?;
        let speech = wrap(&spoken, options.line_width)?;
        let estimate = estimate_words_per_line(&shown, options.line_width)?;
        let words_per_line = effective_words_per_line(estimate);
        let display_lines = display.len();
        debug!(
            target: "text.layout",
            text_bytes = text.len(),
            display_lines,
            speech_lines = speech.len(),
            words_per_line,
            delimiter = options.delimiter.as_str(),
            display_mode = options.display_mode.as_str(),
            "script_layout_built"
        );
        Ok(Self {
            display,
            speech,
            words_per_line,
        })
    }

    pub fn display_lines(&self) -> &[String] {
        &self.display
    }

    pub fn speech_lines(&self) -> &[String] {
        &self.speech
    }

    /// Number of display lines; scroll positions are measured against this.
    pub fn line_count(&self) -> usize {
        self.display.len()
    }

    /// Average words per display line with the empty-text fallback already applied.
    pub fn words_per_line(&self) -> f64 {
        self.words_per_line
    }
}

/// True when any line in `lines[start..start + visible]` has non-whitespace content.
/// Indices past the end of `lines` count as blank.
pub fn window_has_content(lines: &[String], start: usize, visible: usize) -> bool {
    lines
        .iter()
        .skip(start)
        .take(visible)
        .any(|line| !line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dimmed_display_and_stripped_speech_stay_paired() {
        let opts = LayoutOptions::new(80, DelimiterKind::Square, DisplayMode::Dimmed);
        let layout = ScriptLayout::build("Hello [wave] there", &opts).unwrap();
        assert_eq!(layout.display_lines(), ["Hello (wave) there"]);
        assert_eq!(layout.speech_lines(), ["Hello  there"]);
    }

    #[test]
    fn hidden_mode_matches_speech_lines() {
        let opts = LayoutOptions::new(12, DelimiterKind::Curly, DisplayMode::Hidden);
        let layout = ScriptLayout::build("one {pause} two three four", &opts).unwrap();
        assert_eq!(layout.display_lines(), layout.speech_lines());
    }

    #[test]
    fn empty_script_uses_fallback_rate() {
        let opts = LayoutOptions::new(20, DelimiterKind::None, DisplayMode::Normal);
        let layout = ScriptLayout::build("", &opts).unwrap();
        assert_eq!(layout.line_count(), 0);
        assert_eq!(layout.words_per_line(), FALLBACK_WORDS_PER_LINE);
    }

    #[test]
    fn zero_width_propagates_error() {
        let opts = LayoutOptions::new(0, DelimiterKind::None, DisplayMode::Normal);
        assert!(ScriptLayout::build("text", &opts).is_err());
    }

    #[test]
    fn window_content_checks() {
        let lines: Vec<String> = ["a", "", "  ", "b"].iter().map(|s| s.to_string()).collect();
        assert!(window_has_content(&lines, 0, 1));
        assert!(!window_has_content(&lines, 1, 2));
        assert!(window_has_content(&lines, 1, 3));
        assert!(!window_has_content(&lines, 4, 3));
    }
}
