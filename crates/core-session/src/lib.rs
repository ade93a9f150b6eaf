//! Per-script teleprompter session: the controller that composes layout, speech matching
//! and scrolling, plus the narrow interfaces it exposes to its host.

pub mod controller;
pub mod frame;
pub mod registry;

pub use controller::{END_TICK_INTERVAL, Lifecycle, TeleprompterController};
pub use registry::SessionRegistry;

use core_config::{Config, ConfigError, SettingKey, SettingValue};
use core_scroll::{EndOfTextState, ScrollSettings};
use core_speech::MatcherConfig;
use core_text::{LayoutError, LayoutOptions};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Where rendered frames go (a terminal, a socket, a test recorder).
pub trait DisplaySink {
    /// `timeout` is how long the frame stays meaningful if nothing replaces it.
    fn show(&mut self, frame: &str, timeout: Duration);
}

/// Read side of an external settings store.
pub trait SettingsSource {
    fn get(&self, key: SettingKey) -> Option<SettingValue>;

    /// Overlay every setting the store provides on `base`. The first invalid value aborts.
    fn resolve(&self, base: Config) -> Result<Config, ConfigError> {
        let mut config = base;
        for key in SettingKey::ALL {
            if let Some(value) = self.get(key) {
                config.apply_setting(key, value)?;
            }
        }
        Ok(config)
    }
}

impl SettingsSource for HashMap<SettingKey, SettingValue> {
    fn get(&self, key: SettingKey) -> Option<SettingValue> {
        HashMap::get(self, &key).cloned()
    }
}

/// Position queries answered to the remote-control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub current_line: usize,
    pub total_lines: usize,
    pub is_at_end: bool,
    pub speech_mode_enabled: bool,
    pub state: EndOfTextState,
}

/// Position mutators driven by the remote-control surface.
pub trait RemoteControl {
    fn scroll_forward(&mut self, lines: usize, now: Instant);
    fn scroll_back(&mut self, lines: usize, now: Instant);
    fn reset_position(&mut self, now: Instant);
    fn go_to_line(&mut self, line: usize, now: Instant);
    fn status(&self) -> Status;
}

pub fn layout_options(config: &Config) -> LayoutOptions {
    LayoutOptions::new(config.line_width, config.stage_delimiter, config.stage_display)
}

pub fn scroll_settings(config: &Config) -> ScrollSettings {
    ScrollSettings {
        visible_lines: config.visible_lines,
        words_per_minute: f64::from(config.words_per_minute),
        tick_interval: config.scroll_interval,
        speech_lead_lines: config.speech_lead_lines,
        auto_replay: config.auto_replay,
    }
}

pub fn matcher_config(config: &Config) -> MatcherConfig {
    MatcherConfig {
        visible_lines: config.visible_lines,
        lookahead_lines: config.lookahead_lines,
        min_match_words: config.min_match_words,
    }
}
