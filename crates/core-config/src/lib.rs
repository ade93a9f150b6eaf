//! Teleprompter configuration: file loading, runtime setting updates and clamping.
//!
//! Parse `prompter.toml` (or an override path provided by the binary). Sections:
//!
//! ```toml
//! [layout]  line_width = 38, visible_lines = 4
//! [scroll]  words_per_minute = 150, interval_ms = 500, auto_replay = false
//! [speech]  enabled = false, min_match_words = 3, lookahead_lines = 6, lead_lines = 0
//! [stage]   delimiter = "none", display = "normal"
//! [timing]  initial_display_delay_ms = 1000, scroll_start_delay_ms = 3000
//! [display] show_estimate = true
//! ```
//!
//! Numeric settings outside their bounds are clamped and the clamp is logged at INFO under
//! the `config` target. The one hard failure is a non-finite line width, which has no
//! meaningful clamp. Unknown fields are ignored so the file format can grow.

pub mod settings;

pub use settings::{SettingKey, SettingValue};

use anyhow::Result;
use core_text::{DelimiterKind, DisplayMode};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::time::Duration;
use std::{fs, path::PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const LINE_WIDTH_BOUNDS: RangeInclusive<usize> = 10..=200;
pub const VISIBLE_LINES_BOUNDS: RangeInclusive<usize> = 1..=20;
pub const WPM_BOUNDS: RangeInclusive<u32> = 20..=500;
pub const SCROLL_INTERVAL_MS_BOUNDS: RangeInclusive<u64> = 50..=5_000;
pub const MIN_MATCH_WORDS_BOUNDS: RangeInclusive<usize> = 1..=5;
pub const LOOKAHEAD_LINES_BOUNDS: RangeInclusive<usize> = 0..=50;
pub const SPEECH_LEAD_LINES_BOUNDS: RangeInclusive<usize> = 0..=10;
pub const DELAY_MS_BOUNDS: RangeInclusive<u64> = 0..=60_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("line width must be a finite number, got {0}")]
    NonFiniteLineWidth(f64),
    #[error("setting `{key}` expects a {expected} value, got {got}")]
    WrongType {
        key: SettingKey,
        expected: &'static str,
        got: &'static str,
    },
    #[error("invalid value for `{key}`: {message}")]
    InvalidValue { key: SettingKey, message: String },
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayoutSection {
    #[serde(default = "LayoutSection::default_line_width")]
    pub line_width: f64,
    #[serde(default = "LayoutSection::default_visible_lines")]
    pub visible_lines: f64,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            line_width: Self::default_line_width(),
            visible_lines: Self::default_visible_lines(),
        }
    }
}

impl LayoutSection {
    const fn default_line_width() -> f64 {
        38.0
    }
    const fn default_visible_lines() -> f64 {
        4.0
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrollSection {
    #[serde(default = "ScrollSection::default_wpm")]
    pub words_per_minute: f64,
    #[serde(default = "ScrollSection::default_interval_ms")]
    pub interval_ms: f64,
    #[serde(default)]
    pub auto_replay: bool,
}

impl Default for ScrollSection {
    fn default() -> Self {
        Self {
            words_per_minute: Self::default_wpm(),
            interval_ms: Self::default_interval_ms(),
            auto_replay: false,
        }
    }
}

impl ScrollSection {
    const fn default_wpm() -> f64 {
        150.0
    }
    const fn default_interval_ms() -> f64 {
        500.0
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeechSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "SpeechSection::default_min_match_words")]
    pub min_match_words: f64,
    #[serde(default = "SpeechSection::default_lookahead_lines")]
    pub lookahead_lines: f64,
    #[serde(default)]
    pub lead_lines: f64,
}

impl Default for SpeechSection {
    fn default() -> Self {
        Self {
            enabled: false,
            min_match_words: Self::default_min_match_words(),
            lookahead_lines: Self::default_lookahead_lines(),
            lead_lines: 0.0,
        }
    }
}

impl SpeechSection {
    const fn default_min_match_words() -> f64 {
        3.0
    }
    const fn default_lookahead_lines() -> f64 {
        6.0
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct StageSection {
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimingSection {
    #[serde(default = "TimingSection::default_initial_display_delay_ms")]
    pub initial_display_delay_ms: f64,
    #[serde(default = "TimingSection::default_scroll_start_delay_ms")]
    pub scroll_start_delay_ms: f64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            initial_display_delay_ms: Self::default_initial_display_delay_ms(),
            scroll_start_delay_ms: Self::default_scroll_start_delay_ms(),
        }
    }
}

impl TimingSection {
    const fn default_initial_display_delay_ms() -> f64 {
        1000.0
    }
    const fn default_scroll_start_delay_ms() -> f64 {
        3000.0
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplaySection {
    #[serde(default = "DisplaySection::default_show_estimate")]
    pub show_estimate: bool,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            show_estimate: Self::default_show_estimate(),
        }
    }
}

impl DisplaySection {
    const fn default_show_estimate() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub layout: LayoutSection,
    #[serde(default)]
    pub scroll: ScrollSection,
    #[serde(default)]
    pub speech: SpeechSection,
    #[serde(default)]
    pub stage: StageSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub display: DisplaySection,
}

/// Effective (validated and clamped) configuration for one script.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub line_width: usize,
    pub visible_lines: usize,
    pub words_per_minute: u32,
    pub scroll_interval: Duration,
    pub speech_mode: bool,
    pub auto_replay: bool,
    pub min_match_words: usize,
    pub lookahead_lines: usize,
    pub speech_lead_lines: usize,
    pub stage_delimiter: DelimiterKind,
    pub stage_display: DisplayMode,
    pub initial_display_delay: Duration,
    pub scroll_start_delay: Duration,
    pub show_estimate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            line_width: 38,
            visible_lines: 4,
            words_per_minute: 150,
            scroll_interval: Duration::from_millis(500),
            speech_mode: false,
            auto_replay: false,
            min_match_words: 3,
            lookahead_lines: 6,
            speech_lead_lines: 0,
            stage_delimiter: DelimiterKind::None,
            stage_display: DisplayMode::Normal,
            initial_display_delay: Duration::from_millis(1000),
            scroll_start_delay: Duration::from_millis(3000),
            show_estimate: true,
        }
    }
}

/// Best-effort config path: working directory first, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("prompter.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("prompter").join("prompter.toml");
    }
    PathBuf::from("prompter.toml")
}

/// Load configuration. A missing file yields defaults; an unparsable file logs a warning
/// and yields defaults; a non-finite line width is an error.
pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config::from_file(&file)?),
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Build an effective config from a parsed file, clamping every numeric field.
    pub fn from_file(file: &ConfigFile) -> Result<Self, ConfigError> {
        let mut cfg = Config::default();
        let mut apply = |key: SettingKey, value: SettingValue| cfg.apply_setting(key, value);
        apply(SettingKey::LineWidth, SettingValue::Number(file.layout.line_width))?;
        apply(SettingKey::VisibleLines, SettingValue::Number(file.layout.visible_lines))?;
        apply(SettingKey::WordsPerMinute, SettingValue::Number(file.scroll.words_per_minute))?;
        apply(SettingKey::ScrollIntervalMs, SettingValue::Number(file.scroll.interval_ms))?;
        apply(SettingKey::AutoReplay, SettingValue::Bool(file.scroll.auto_replay))?;
        apply(SettingKey::SpeechMode, SettingValue::Bool(file.speech.enabled))?;
        apply(SettingKey::MinMatchWords, SettingValue::Number(file.speech.min_match_words))?;
        apply(SettingKey::LookaheadLines, SettingValue::Number(file.speech.lookahead_lines))?;
        apply(SettingKey::SpeechLeadLines, SettingValue::Number(file.speech.lead_lines))?;
        if let Some(d) = &file.stage.delimiter {
            apply(SettingKey::StageDelimiter, SettingValue::Text(d.clone()))?;
        }
        if let Some(d) = &file.stage.display {
            apply(SettingKey::StageDisplay, SettingValue::Text(d.clone()))?;
        }
        apply(
            SettingKey::InitialDisplayDelayMs,
            SettingValue::Number(file.timing.initial_display_delay_ms),
        )?;
        apply(
            SettingKey::ScrollStartDelayMs,
            SettingValue::Number(file.timing.scroll_start_delay_ms),
        )?;
        apply(SettingKey::ShowEstimate, SettingValue::Bool(file.display.show_estimate))?;
        Ok(cfg)
    }

    /// Apply one setting through the clamp path. Returns whether the effective value changed.
    pub fn apply_setting(&mut self, key: SettingKey, value: SettingValue) -> Result<bool, ConfigError> {
        let before = self.clone();
        match key {
            SettingKey::LineWidth => {
                let raw = number(key, &value)?;
                if !raw.is_finite() {
                    return Err(ConfigError::NonFiniteLineWidth(raw));
                }
                self.line_width = clamp_count(key, raw, LINE_WIDTH_BOUNDS, self.line_width);
            }
            SettingKey::VisibleLines => {
                let raw = number(key, &value)?;
                self.visible_lines = clamp_count(key, raw, VISIBLE_LINES_BOUNDS, self.visible_lines);
            }
            SettingKey::WordsPerMinute => {
                let raw = number(key, &value)?;
                let bounds = *WPM_BOUNDS.start() as usize..=*WPM_BOUNDS.end() as usize;
                self.words_per_minute =
                    clamp_count(key, raw, bounds, self.words_per_minute as usize) as u32;
            }
            SettingKey::ScrollIntervalMs => {
                let raw = number(key, &value)?;
                let ms = clamp_millis(key, raw, SCROLL_INTERVAL_MS_BOUNDS, self.scroll_interval);
                self.scroll_interval = Duration::from_millis(ms);
            }
            SettingKey::SpeechMode => self.speech_mode = boolean(key, &value)?,
            SettingKey::AutoReplay => self.auto_replay = boolean(key, &value)?,
            SettingKey::ShowEstimate => self.show_estimate = boolean(key, &value)?,
            SettingKey::MinMatchWords => {
                let raw = number(key, &value)?;
                self.min_match_words =
                    clamp_count(key, raw, MIN_MATCH_WORDS_BOUNDS, self.min_match_words);
            }
            SettingKey::LookaheadLines => {
                let raw = number(key, &value)?;
                self.lookahead_lines =
                    clamp_count(key, raw, LOOKAHEAD_LINES_BOUNDS, self.lookahead_lines);
            }
            SettingKey::SpeechLeadLines => {
                let raw = number(key, &value)?;
                self.speech_lead_lines =
                    clamp_count(key, raw, SPEECH_LEAD_LINES_BOUNDS, self.speech_lead_lines);
            }
            SettingKey::StageDelimiter => {
                self.stage_delimiter = text(key, &value)?
                    .parse()
                    .map_err(|message| ConfigError::InvalidValue { key, message })?;
            }
            SettingKey::StageDisplay => {
                self.stage_display = text(key, &value)?
                    .parse()
                    .map_err(|message| ConfigError::InvalidValue { key, message })?;
            }
            SettingKey::InitialDisplayDelayMs => {
                let raw = number(key, &value)?;
                let ms = clamp_millis(key, raw, DELAY_MS_BOUNDS, self.initial_display_delay);
                self.initial_display_delay = Duration::from_millis(ms);
            }
            SettingKey::ScrollStartDelayMs => {
                let raw = number(key, &value)?;
                let ms = clamp_millis(key, raw, DELAY_MS_BOUNDS, self.scroll_start_delay);
                self.scroll_start_delay = Duration::from_millis(ms);
            }
        }
        Ok(*self != before)
    }
}

fn number(key: SettingKey, value: &SettingValue) -> Result<f64, ConfigError> {
    match value {
        SettingValue::Number(n) => Ok(*n),
        SettingValue::Text(t) => t.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key,
            message: format!("`{t}` is not a number"),
        }),
        other => Err(ConfigError::WrongType {
            key,
            expected: "number",
            got: other.kind(),
        }),
    }
}

fn boolean(key: SettingKey, value: &SettingValue) -> Result<bool, ConfigError> {
    match value {
        SettingValue::Bool(b) => Ok(*b),
        other => Err(ConfigError::WrongType {
            key,
            expected: "bool",
            got: other.kind(),
        }),
    }
}

fn text(key: SettingKey, value: &SettingValue) -> Result<&str, ConfigError> {
    match value {
        SettingValue::Text(t) => Ok(t),
        other => Err(ConfigError::WrongType {
            key,
            expected: "text",
            got: other.kind(),
        }),
    }
}

/// Round and clamp a count. NaN keeps the current value; infinities pin to a bound.
fn clamp_count(key: SettingKey, raw: f64, bounds: RangeInclusive<usize>, current: usize) -> usize {
    let (min, max) = (*bounds.start(), *bounds.end());
    let clamped = if raw.is_nan() {
        current
    } else if raw <= min as f64 {
        min
    } else if raw >= max as f64 {
        max
    } else {
        raw.round() as usize
    };
    if raw.is_nan() || (raw.is_finite() && raw.round() != clamped as f64) || raw.is_infinite() {
        info!(
            target: "config",
            key = key.as_str(),
            raw,
            clamped,
            min,
            max,
            "setting_clamped"
        );
    }
    clamped
}

fn clamp_millis(key: SettingKey, raw: f64, bounds: RangeInclusive<u64>, current: Duration) -> u64 {
    let range = *bounds.start() as usize..=*bounds.end() as usize;
    clamp_count(key, raw, range, current.as_millis() as usize) as u64
}
