//! Scroll position state machine.
//!
//! Invariants:
//! * `0 <= position <= max_position()` where `max_position = line_count - visible_lines`
//!   (saturating), so the window never runs past the last line.
//! * Speech-driven updates never move the position backward.
//! * Every mutation is relative to the live position, never a cached snapshot, so
//!   interleaved transcript events and ticks compose.
//!
//! Time-based advance accumulates fractional lines per tick from the word-rate model and
//! moves by whole lines once the accumulator reaches one.

use std::time::{Duration, Instant};

use core_text::{ScriptLayout, window_has_content};
use tracing::{debug, trace};

use crate::end_of_text::{EndOfText, EndOfTextState, EndTransition};

/// Furthest a single speech match may move the window.
pub const MAX_SPEECH_JUMP: usize = 10;

/// Rate and window inputs, refreshed whenever settings change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSettings {
    pub visible_lines: usize,
    pub words_per_minute: f64,
    pub tick_interval: Duration,
    /// Lines to hold a speech match back from the top of the window.
    pub speech_lead_lines: usize,
    pub auto_replay: bool,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            visible_lines: 4,
            words_per_minute: 150.0,
            tick_interval: Duration::from_millis(500),
            speech_lead_lines: 0,
            auto_replay: false,
        }
    }
}

impl ScrollSettings {
    /// Fractional display lines to advance per scroll tick.
    pub fn lines_per_tick(&self, words_per_line: f64) -> f64 {
        let words_per_tick = self.words_per_minute / 60.0 * self.tick_interval.as_secs_f64();
        if words_per_line > 0.0 {
            words_per_tick / words_per_line
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollStateMachine {
    position: usize,
    accumulator: f64,
    line_count: usize,
    settings: ScrollSettings,
    end: EndOfText,
}

impl ScrollStateMachine {
    pub fn new(settings: ScrollSettings, line_count: usize, now: Instant) -> Self {
        Self {
            position: 0,
            accumulator: 0.0,
            line_count,
            settings,
            end: EndOfText::new(now),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn settings(&self) -> ScrollSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: ScrollSettings) {
        self.settings = settings;
        self.clamp_position();
    }

    pub fn state(&self) -> EndOfTextState {
        self.end.state()
    }

    pub fn state_entered_at(&self) -> Instant {
        self.end.entered_at()
    }

    pub fn max_position(&self) -> usize {
        self.line_count.saturating_sub(self.settings.visible_lines)
    }

    /// True once the window shows the last line.
    pub fn is_at_end(&self) -> bool {
        self.position >= self.max_position()
    }

    /// Progress through the script, 0..=100. A script that fits in one window is complete.
    pub fn progress_percent(&self) -> u8 {
        if self.line_count <= self.settings.visible_lines {
            return 100;
        }
        let ratio = self.position as f64 / self.max_position() as f64;
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// Adopt a new line count after re-layout; the position is clamped, not reset.
    pub fn set_line_count(&mut self, line_count: usize) {
        self.line_count = line_count;
        self.clamp_position();
    }

    /// One word-rate tick. Returns the number of lines advanced.
    pub fn advance_by_time(&mut self, layout: &ScriptLayout) -> usize {
        if self.end.state() != EndOfTextState::Scrolling {
            return 0;
        }
        if self.is_at_end() {
            self.accumulator = 0.0;
            return 0;
        }
        self.accumulator += self.settings.lines_per_tick(layout.words_per_line());
        if self.accumulator < 1.0 {
            return 0;
        }
        let whole = self.accumulator.floor();
        self.accumulator -= whole;
        let before = self.position;
        self.position = self
            .position
            .saturating_add(whole as usize)
            .min(self.max_position());
        self.skip_blank_windows(layout);
        let moved = self.position - before;
        trace!(target: "scroll", before, after = self.position, "time_advance");
        moved
    }

    /// Apply a matcher suggestion. Only strictly-forward suggestions move the window.
    pub fn apply_speech_match(&mut self, layout: &ScriptLayout, matched: usize) -> bool {
        if matched <= self.position {
            trace!(target: "scroll", matched, position = self.position, "speech_match_discarded");
            return false;
        }
        let capped = matched.min(self.position + MAX_SPEECH_JUMP);
        let target = capped
            .saturating_sub(self.settings.speech_lead_lines)
            .max(self.position)
            .min(self.max_position());
        if target <= self.position {
            return false;
        }
        let before = self.position;
        self.position = target;
        self.skip_blank_windows(layout);
        self.accumulator = 0.0;
        debug!(
            target: "scroll",
            before,
            matched,
            after = self.position,
            "speech_advance"
        );
        true
    }

    /// Walk forward while the current window holds only stage directions, i.e. every
    /// visible speech line is blank. Stops at the first window with speakable text or at
    /// the end. Returns true if the window moved.
    pub fn auto_advance_past_stage_directions(&mut self, layout: &ScriptLayout) -> bool {
        let visible = self.settings.visible_lines;
        let before = self.position;
        while !self.is_at_end() && !window_has_content(layout.speech_lines(), self.position, visible) {
            self.position += 1;
        }
        if self.position == before {
            return false;
        }
        self.accumulator = 0.0;
        trace!(target: "scroll", before, after = self.position, "stage_direction_skip");
        true
    }

    /// Poll the end-of-text lifecycle.
    pub fn update_end_of_text(&mut self, now: Instant) -> EndTransition {
        let transition = self
            .end
            .poll(self.is_at_end(), self.settings.auto_replay, now);
        if transition != EndTransition::None {
            debug!(
                target: "scroll",
                state = self.end.state().as_str(),
                position = self.position,
                "end_of_text_transition"
            );
        }
        transition
    }

    /// Finish a scheduled auto replay. A no-op unless a replay is actually pending, so a
    /// stale or duplicated restart timer can never reset twice.
    pub fn complete_replay(&mut self, now: Instant) -> bool {
        if self.end.state() != EndOfTextState::AutoReplayScheduled {
            return false;
        }
        self.reset(now);
        true
    }

    /// Back to line 0 and Scrolling from any state.
    pub fn reset(&mut self, now: Instant) {
        self.position = 0;
        self.accumulator = 0.0;
        self.end = EndOfText::new(now);
        debug!(target: "scroll", "position_reset");
    }

    pub fn scroll_forward(&mut self, lines: usize, now: Instant) -> EndTransition {
        let target = self.position.saturating_add(lines);
        self.move_to(target, now)
    }

    pub fn scroll_back(&mut self, lines: usize, now: Instant) -> EndTransition {
        let target = self.position.saturating_sub(lines);
        self.move_to(target, now)
    }

    pub fn go_to_line(&mut self, line: usize, now: Instant) -> EndTransition {
        self.move_to(line, now)
    }

    /// Leave an end state whose window no longer shows the last line, e.g. after a
    /// manual move, a re-layout or a smaller window.
    pub fn revalidate_end(&mut self, now: Instant) -> EndTransition {
        let state = self.end.state();
        if state != EndOfTextState::Scrolling && !self.is_at_end() {
            self.end.enter(EndOfTextState::Scrolling, now);
            debug!(target: "scroll", from = state.as_str(), position = self.position, "end_of_text_resumed");
            return EndTransition::Resumed;
        }
        EndTransition::None
    }

    fn move_to(&mut self, target: usize, now: Instant) -> EndTransition {
        self.position = target.min(self.max_position());
        self.accumulator = 0.0;
        self.revalidate_end(now)
    }

    fn clamp_position(&mut self) {
        let max = self.max_position();
        if self.position > max {
            self.position = max;
        }
    }

    /// Skip window positions whose entire visible window is blank in the display lines.
    fn skip_blank_windows(&mut self, layout: &ScriptLayout) {
        let max = self.max_position();
        let visible = self.settings.visible_lines;
        while self.position < max
            && !window_has_content(layout.display_lines(), self.position, visible)
        {
            self.position += 1;
        }
    }
}
