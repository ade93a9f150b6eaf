//! Scroll position tracking for a script window.
//!
//! [`ScrollStateMachine`] owns the current line, the fractional word-rate accumulator and
//! the end-of-text lifecycle ([`EndOfTextState`]). It is driven from outside: scroll ticks
//! call [`ScrollStateMachine::advance_by_time`], matcher output goes through
//! [`ScrollStateMachine::apply_speech_match`], and the end-of-text display tick polls
//! [`ScrollStateMachine::update_end_of_text`]. Time is always passed in explicitly.

pub mod end_of_text;
pub mod machine;

pub use end_of_text::{
    END_MESSAGE_DWELL, EndOfText, EndOfTextState, EndTransition, FINAL_LINE_DWELL,
    REPLAY_RESTART_DELAY,
};
pub use machine::{MAX_SPEECH_JUMP, ScrollSettings, ScrollStateMachine};
