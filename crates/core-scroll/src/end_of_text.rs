//! End-of-script lifecycle.
//!
//! ```text
//! Scrolling --(window shows last line)--> ShowingFinalLine
//! ShowingFinalLine --(5s)--> ShowingEndMessage
//! ShowingEndMessage --(10s)--> AutoReplayScheduled   (auto replay on)
//!                              \-> Stopped              (auto replay off)
//! AutoReplayScheduled --(restart timer)--> Scrolling at line 0
//! any --(reset)--> Scrolling at line 0
//! ```
//!
//! A dwell is complete once `elapsed >= dwell`. Checks run only when polled, so a state is
//! visible for at least its full dwell and exactly that long when a poll lands on the
//! deadline. Each poll performs at most one transition.

use std::fmt;
use std::time::{Duration, Instant};

pub const FINAL_LINE_DWELL: Duration = Duration::from_secs(5);
pub const END_MESSAGE_DWELL: Duration = Duration::from_secs(10);
pub const REPLAY_RESTART_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndOfTextState {
    Scrolling,
    ShowingFinalLine,
    ShowingEndMessage,
    AutoReplayScheduled,
    Stopped,
}

impl EndOfTextState {
    pub const fn as_str(self) -> &'static str {
        match self {
            EndOfTextState::Scrolling => "scrolling",
            EndOfTextState::ShowingFinalLine => "showing_final_line",
            EndOfTextState::ShowingEndMessage => "showing_end_message",
            EndOfTextState::AutoReplayScheduled => "auto_replay_scheduled",
            EndOfTextState::Stopped => "stopped",
        }
    }

    /// States whose frame is the end-of-text message rather than script lines.
    pub const fn shows_end_message(self) -> bool {
        matches!(
            self,
            EndOfTextState::ShowingEndMessage
                | EndOfTextState::AutoReplayScheduled
                | EndOfTextState::Stopped
        )
    }
}

impl fmt::Display for EndOfTextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a poll or mutation did to the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndTransition {
    None,
    EnteredFinalLine,
    EnteredEndMessage,
    ReplayScheduled,
    Stopped,
    /// Auto replay completed: position is back at 0 and the state is Scrolling.
    Replayed,
    /// A manual move left an end state because the window no longer shows the last line.
    Resumed,
}

/// Current lifecycle state and the instant it was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfText {
    state: EndOfTextState,
    entered_at: Instant,
}

impl EndOfText {
    pub fn new(now: Instant) -> Self {
        Self {
            state: EndOfTextState::Scrolling,
            entered_at: now,
        }
    }

    pub fn state(&self) -> EndOfTextState {
        self.state
    }

    pub fn entered_at(&self) -> Instant {
        self.entered_at
    }

    pub fn enter(&mut self, state: EndOfTextState, now: Instant) {
        self.state = state;
        self.entered_at = now;
    }

    /// Advance the dwell-driven part of the lifecycle. `at_end` reports whether the
    /// window currently shows the last line.
    pub fn poll(&mut self, at_end: bool, auto_replay: bool, now: Instant) -> EndTransition {
        let elapsed = now.saturating_duration_since(self.entered_at);
        match self.state {
            EndOfTextState::Scrolling if at_end => {
                self.enter(EndOfTextState::ShowingFinalLine, now);
                EndTransition::EnteredFinalLine
            }
            EndOfTextState::ShowingFinalLine if elapsed >= FINAL_LINE_DWELL => {
                self.enter(EndOfTextState::ShowingEndMessage, now);
                EndTransition::EnteredEndMessage
            }
            EndOfTextState::ShowingEndMessage if elapsed >= END_MESSAGE_DWELL => {
                if auto_replay {
                    self.enter(EndOfTextState::AutoReplayScheduled, now);
                    EndTransition::ReplayScheduled
                } else {
                    self.enter(EndOfTextState::Stopped, now);
                    EndTransition::Stopped
                }
            }
            _ => EndTransition::None,
        }
    }
}
