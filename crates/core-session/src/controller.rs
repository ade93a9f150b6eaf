//! Per-script controller.
//!
//! Owns the layout, matcher, scroll machine and the timer queue for one active script and
//! routes every external stimulus (timer firing, transcript delivery, setting change,
//! remote-control request) into them. All entry points take the current instant so the
//! host decides what "now" is. After [`TeleprompterController::teardown`] every entry point
//! is a silent no-op.
//!
//! Timer sequence:
//!
//! ```text
//! InitialDisplay (once) -> first frame, schedules ScrollStart
//! ScrollStart    (once) -> starts the elapsed clock and the repeating ScrollTick
//! ScrollTick            -> time/stage-direction advance, end check; on reaching the end
//!                          swaps itself for the repeating EndTick
//! EndTick               -> end-of-text dwell polling; schedules ReplayRestart when due
//! ReplayRestart  (once) -> back to line 0, EndTick off, ScrollTick on
//! ```

use crate::frame::{display_timeout, end_message_frame, lines_frame, progress_header};
use crate::{
    DisplaySink, RemoteControl, SessionError, Status, layout_options, matcher_config,
    scroll_settings,
};
use core_config::{Config, SettingKey, SettingValue};
use core_events::{Subscription, TimerKind, TimerQueue};
use core_scroll::{EndOfTextState, EndTransition, REPLAY_RESTART_DELAY, ScrollStateMachine};
use core_speech::SpeechPositionMatcher;
use core_text::ScriptLayout;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

pub const END_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Whether the host should keep the session around after a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    /// The script finished without auto replay; the host should tear the session down.
    Finished,
    TornDown,
}

pub struct TeleprompterController<S> {
    text: String,
    config: Config,
    layout: ScriptLayout,
    matcher: SpeechPositionMatcher,
    machine: ScrollStateMachine,
    timers: TimerQueue,
    subscription: Subscription,
    sink: S,
    /// Start of the elapsed clock; `None` until scrolling starts.
    clock_start: Option<Instant>,
    scroll_started: bool,
    alive: bool,
}

impl<S: DisplaySink> TeleprompterController<S> {
    /// Lay out `text` and schedule the initial display.
    pub fn new(text: impl Into<String>, config: Config, sink: S, now: Instant) -> Result<Self, SessionError> {
        let text = text.into();
        let layout = ScriptLayout::build(&text, &layout_options(&config))?;
        let machine = ScrollStateMachine::new(scroll_settings(&config), layout.line_count(), now);
        let mut timers = TimerQueue::new();
        timers.schedule_once(now + config.initial_display_delay, TimerKind::InitialDisplay);
        info!(
            target: "session",
            text_len = text.len(),
            lines = layout.line_count(),
            speech_mode = config.speech_mode,
            "session_created"
        );
        Ok(Self {
            text,
            matcher: SpeechPositionMatcher::new(matcher_config(&config)),
            config,
            layout,
            machine,
            timers,
            subscription: Subscription::new(),
            sink,
            clock_start: None,
            scroll_started: false,
            alive: true,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &ScriptLayout {
        &self.layout
    }

    pub fn machine(&self) -> &ScrollStateMachine {
        &self.machine
    }

    pub fn matcher(&self) -> &SpeechPositionMatcher {
        &self.matcher
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Liveness handle for the transcript feed; cancelled on teardown.
    pub fn subscription(&self) -> Subscription {
        self.subscription.clone()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.alive {
            return None;
        }
        self.timers.next_deadline()
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.alive && self.timers.is_scheduled(kind)
    }

    /// Replace the script. The position is clamped into the new layout and the speech
    /// buffer is cleared.
    pub fn set_text(&mut self, text: impl Into<String>, now: Instant) -> Result<(), SessionError> {
        if !self.alive {
            return Ok(());
        }
        let text = text.into();
        let layout = ScriptLayout::build(&text, &layout_options(&self.config))?;
        self.text = text;
        self.adopt_layout(layout, now);
        self.matcher.reset();
        self.refresh(now);
        Ok(())
    }

    /// Apply one setting change. Layout-affecting keys re-layout the script; everything
    /// else updates the matcher/machine inputs in place. Returns whether anything changed.
    pub fn on_setting_changed(
        &mut self,
        key: SettingKey,
        value: SettingValue,
        now: Instant,
    ) -> Result<bool, SessionError> {
        if !self.alive {
            return Ok(false);
        }
        let mut next = self.config.clone();
        if !next.apply_setting(key, value)? {
            return Ok(false);
        }
        if key.affects_layout() {
            let layout = ScriptLayout::build(&self.text, &layout_options(&next))?;
            self.config = next;
            self.adopt_layout(layout, now);
        } else {
            let interval_changed = next.scroll_interval != self.config.scroll_interval;
            let speech_disabled = self.config.speech_mode && !next.speech_mode;
            self.config = next;
            self.machine.set_settings(scroll_settings(&self.config));
            self.matcher.set_config(matcher_config(&self.config));
            if speech_disabled {
                self.matcher.reset();
            }
            if interval_changed && self.timers.is_scheduled(TimerKind::ScrollTick) {
                self.start_scroll_tick(now);
            }
            self.leave_stale_end_state(now);
        }
        debug!(target: "session", key = key.as_str(), "setting_applied");
        self.refresh(now);
        Ok(true)
    }

    /// Fire every timer due at `now`.
    pub fn poll_timers(&mut self, now: Instant) -> Lifecycle {
        if !self.alive {
            return Lifecycle::TornDown;
        }
        for (_, kind) in self.timers.poll(now) {
            // A handler may have torn the session down or cancelled later timers.
            if !self.alive {
                return Lifecycle::TornDown;
            }
            trace!(target: "session.timer", kind = kind.as_str(), "timer_fired");
            match kind {
                TimerKind::InitialDisplay => self.on_initial_display(now),
                TimerKind::ScrollStart => self.on_scroll_start(now),
                TimerKind::ScrollTick => self.on_scroll_tick(now),
                TimerKind::EndTick => self.on_end_tick(now),
                TimerKind::ReplayRestart => self.on_replay_restart(now),
            }
        }
        if self.machine.state() == EndOfTextState::Stopped {
            Lifecycle::Finished
        } else {
            Lifecycle::Running
        }
    }

    /// Feed one transcript delivery. Returns true when it moved the window.
    pub fn on_transcript(&mut self, text: &str, is_final: bool, now: Instant) -> bool {
        if !self.alive || !self.subscription.is_active() || !self.config.speech_mode {
            return false;
        }
        if !self.matcher.ingest(text, is_final) {
            return false;
        }
        let position = self.machine.position();
        let Some(found) = self.matcher.find_match(position, self.layout.speech_lines()) else {
            return false;
        };
        let moved = self.machine.apply_speech_match(&self.layout, found.line);
        if moved {
            debug!(
                target: "session",
                from = position,
                to = self.machine.position(),
                strategy = found.strategy.as_str(),
                "speech_position_applied"
            );
            self.refresh(now);
        }
        moved
    }

    /// Render the current frame without side effects.
    pub fn get_current_visible_text(&self, now: Instant) -> String {
        let elapsed = self
            .clock_start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        let header = progress_header(
            self.machine.progress_percent(),
            elapsed,
            self.config.show_estimate,
        );
        if self.machine.state().shows_end_message() {
            return end_message_frame(&header);
        }
        let lines = self.layout.display_lines();
        let start = self.machine.position().min(lines.len());
        let end = (start + self.config.visible_lines).min(lines.len());
        lines_frame(&header, &lines[start..end])
    }

    /// Cancel every timer and the transcript subscription. Idempotent.
    pub fn teardown(&mut self) {
        if !self.alive {
            return;
        }
        self.timers.cancel_all();
        self.subscription.cancel();
        self.alive = false;
        info!(target: "session", position = self.machine.position(), "session_torn_down");
    }

    fn on_initial_display(&mut self, now: Instant) {
        self.refresh(now);
        self.timers
            .schedule_once(now + self.config.scroll_start_delay, TimerKind::ScrollStart);
    }

    fn on_scroll_start(&mut self, now: Instant) {
        self.scroll_started = true;
        self.clock_start = Some(now);
        self.start_scroll_tick(now);
        debug!(target: "session", "scroll_started");
    }

    fn on_scroll_tick(&mut self, now: Instant) {
        let moved = if self.config.speech_mode {
            usize::from(self.machine.auto_advance_past_stage_directions(&self.layout))
        } else {
            self.machine.advance_by_time(&self.layout)
        };
        let transition = self.machine.update_end_of_text(now);
        if transition == EndTransition::EnteredFinalLine {
            self.timers.cancel_kind(TimerKind::ScrollTick);
            self.start_end_tick(now);
        }
        if moved > 0 || transition != EndTransition::None {
            self.refresh(now);
        }
    }

    fn on_end_tick(&mut self, now: Instant) {
        match self.machine.update_end_of_text(now) {
            EndTransition::None => return,
            EndTransition::EnteredEndMessage => self.start_end_tick(now),
            EndTransition::ReplayScheduled => {
                if !self.timers.is_scheduled(TimerKind::ReplayRestart) {
                    self.timers
                        .schedule_once(now + REPLAY_RESTART_DELAY, TimerKind::ReplayRestart);
                }
            }
            EndTransition::Stopped => {
                self.timers.cancel_kind(TimerKind::EndTick);
                info!(target: "session", "script_finished");
            }
            _ => {}
        }
        self.refresh(now);
    }

    fn on_replay_restart(&mut self, now: Instant) {
        if !self.machine.complete_replay(now) {
            trace!(target: "session", state = self.machine.state().as_str(), "stale_replay_ignored");
            return;
        }
        self.timers.cancel_kind(TimerKind::EndTick);
        self.matcher.reset();
        self.clock_start = Some(now);
        self.start_scroll_tick(now);
        info!(target: "session", "auto_replay_restarted");
        self.refresh(now);
    }

    fn start_scroll_tick(&mut self, now: Instant) {
        self.timers.cancel_kind(TimerKind::ScrollTick);
        let interval = self.config.scroll_interval;
        self.timers
            .schedule_repeating(now + interval, interval, TimerKind::ScrollTick);
    }

    /// Poll the end-of-text dwell in phase with the instant the current state was entered.
    fn start_end_tick(&mut self, now: Instant) {
        self.timers.cancel_kind(TimerKind::EndTick);
        self.timers
            .schedule_repeating(now + END_TICK_INTERVAL, END_TICK_INTERVAL, TimerKind::EndTick);
    }

    /// Leave any end-of-text timers behind after moving back into the script.
    fn resume_scrolling(&mut self, now: Instant) {
        self.timers.cancel_kind(TimerKind::EndTick);
        self.timers.cancel_kind(TimerKind::ReplayRestart);
        if self.scroll_started {
            self.start_scroll_tick(now);
        }
    }

    fn after_manual_move(&mut self, transition: EndTransition, now: Instant) {
        if transition == EndTransition::Resumed {
            self.resume_scrolling(now);
        }
        self.refresh(now);
    }

    fn adopt_layout(&mut self, layout: ScriptLayout, now: Instant) {
        self.layout = layout;
        self.machine.set_settings(scroll_settings(&self.config));
        self.machine.set_line_count(self.layout.line_count());
        self.matcher.set_config(matcher_config(&self.config));
        debug!(target: "session", lines = self.layout.line_count(), "script_relayout");
        self.leave_stale_end_state(now);
    }

    /// An end state is only valid while the window shows the last line.
    fn leave_stale_end_state(&mut self, now: Instant) {
        if self.machine.revalidate_end(now) == EndTransition::Resumed {
            self.resume_scrolling(now);
        }
    }

    fn active_period(&self) -> Duration {
        if self.timers.is_scheduled(TimerKind::ScrollTick) {
            self.config.scroll_interval
        } else {
            END_TICK_INTERVAL
        }
    }

    fn refresh(&mut self, now: Instant) {
        let frame = self.get_current_visible_text(now);
        let timeout = display_timeout(self.active_period());
        self.sink.show(&frame, timeout);
    }
}

impl<S: DisplaySink> RemoteControl for TeleprompterController<S> {
    fn scroll_forward(&mut self, lines: usize, now: Instant) {
        if !self.alive {
            return;
        }
        let transition = self.machine.scroll_forward(lines, now);
        self.after_manual_move(transition, now);
    }

    fn scroll_back(&mut self, lines: usize, now: Instant) {
        if !self.alive {
            return;
        }
        let transition = self.machine.scroll_back(lines, now);
        self.after_manual_move(transition, now);
    }

    /// Back to line 0 and Scrolling from any state; clears the speech buffer and any
    /// end-of-text timers.
    fn reset_position(&mut self, now: Instant) {
        if !self.alive {
            return;
        }
        self.machine.reset(now);
        self.matcher.reset();
        if self.scroll_started {
            self.clock_start = Some(now);
        }
        self.resume_scrolling(now);
        self.refresh(now);
    }

    fn go_to_line(&mut self, line: usize, now: Instant) {
        if !self.alive {
            return;
        }
        let transition = self.machine.go_to_line(line, now);
        self.after_manual_move(transition, now);
    }

    fn status(&self) -> Status {
        Status {
            current_line: self.machine.position(),
            total_lines: self.layout.line_count(),
            is_at_end: self.machine.is_at_end(),
            speech_mode_enabled: self.config.speech_mode,
            state: self.machine.state(),
        }
    }
}
