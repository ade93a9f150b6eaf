//! Event loop glue between the runtime channel and the session registry.

use core_config::{SettingKey, SettingValue};
use core_events::{CommandEvent, Event, TranscriptEvent};
use core_session::{DisplaySink, Lifecycle, RemoteControl, SessionRegistry, Status};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const CONSOLE_SESSION: &str = "console";
pub const CONSOLE_USER: &str = "local";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Break { reason: ShutdownReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    CommandQuit,
    ScriptFinished,
    ShutdownEvent,
    ChannelClosed,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::CommandQuit => "command_quit",
            ShutdownReason::ScriptFinished => "script_finished",
            ShutdownReason::ShutdownEvent => "shutdown_event",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn format_status(status: &Status) -> String {
    format!(
        "line {}/{} | at_end={} | speech={} | state={}",
        status.current_line,
        status.total_lines,
        status.is_at_end,
        status.speech_mode_enabled,
        status.state
    )
}

/// Routes one event to the console session's controller.
pub struct SessionRuntime<S> {
    registry: SessionRegistry<S>,
    /// Status lines answered to `:status`, drained by the host.
    replies: Vec<String>,
}

impl<S: DisplaySink> SessionRuntime<S> {
    pub fn new(registry: SessionRegistry<S>) -> Self {
        Self {
            registry,
            replies: Vec::new(),
        }
    }

    pub fn registry_mut(&mut self) -> &mut SessionRegistry<S> {
        &mut self.registry
    }

    pub fn take_replies(&mut self) -> Vec<String> {
        std::mem::take(&mut self.replies)
    }

    pub fn handle(&mut self, event: &Event, now: Instant) -> LoopControl {
        let Some(controller) = self.registry.controller_for_session(CONSOLE_SESSION) else {
            return LoopControl::Break {
                reason: ShutdownReason::ChannelClosed,
            };
        };
        match event {
            Event::Tick => {
                if controller.poll_timers(now) == Lifecycle::Finished {
                    return LoopControl::Break {
                        reason: ShutdownReason::ScriptFinished,
                    };
                }
            }
            Event::Transcript(TranscriptEvent { text, is_final }) => {
                controller.on_transcript(text, *is_final, now);
            }
            Event::Command(cmd) => return self.handle_command(cmd, now),
            Event::Shutdown => {
                return LoopControl::Break {
                    reason: ShutdownReason::ShutdownEvent,
                };
            }
        }
        LoopControl::Continue
    }

    fn handle_command(&mut self, cmd: &CommandEvent, now: Instant) -> LoopControl {
        let Some(controller) = self.registry.controller_for_session(CONSOLE_SESSION) else {
            return LoopControl::Continue;
        };
        debug!(target: "runtime.command", ?cmd, "command_received");
        match cmd {
            CommandEvent::ScrollForward(n) => controller.scroll_forward(*n, now),
            CommandEvent::ScrollBack(n) => controller.scroll_back(*n, now),
            CommandEvent::GoToLine(n) => controller.go_to_line(*n, now),
            CommandEvent::Reset => controller.reset_position(now),
            CommandEvent::Status => {
                let status = controller.status();
                self.replies.push(format_status(&status));
            }
            CommandEvent::Set { key, value } => {
                let key = match key.parse::<SettingKey>() {
                    Ok(key) => key,
                    Err(error) => {
                        warn!(target: "runtime.command", %error, "setting_rejected");
                        return LoopControl::Continue;
                    }
                };
                let value = SettingValue::parse_loose(value);
                match controller.on_setting_changed(key, value, now) {
                    Ok(changed) => info!(target: "runtime.command", key = key.as_str(), changed, "setting_changed"),
                    Err(error) => warn!(target: "runtime.command", key = key.as_str(), %error, "setting_rejected"),
                }
            }
            CommandEvent::Quit => {
                return LoopControl::Break {
                    reason: ShutdownReason::CommandQuit,
                };
            }
        }
        LoopControl::Continue
    }

    /// Detach the console session, tearing its controller down.
    pub fn shutdown(&mut self) {
        self.registry.detach(CONSOLE_SESSION);
    }
}
