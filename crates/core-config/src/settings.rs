//! Setting keys and values as delivered by an external settings store.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    LineWidth,
    VisibleLines,
    WordsPerMinute,
    ScrollIntervalMs,
    SpeechMode,
    AutoReplay,
    MinMatchWords,
    LookaheadLines,
    SpeechLeadLines,
    StageDelimiter,
    StageDisplay,
    InitialDisplayDelayMs,
    ScrollStartDelayMs,
    ShowEstimate,
}

impl SettingKey {
    pub const ALL: [SettingKey; 14] = [
        SettingKey::LineWidth,
        SettingKey::VisibleLines,
        SettingKey::WordsPerMinute,
        SettingKey::ScrollIntervalMs,
        SettingKey::SpeechMode,
        SettingKey::AutoReplay,
        SettingKey::MinMatchWords,
        SettingKey::LookaheadLines,
        SettingKey::SpeechLeadLines,
        SettingKey::StageDelimiter,
        SettingKey::StageDisplay,
        SettingKey::InitialDisplayDelayMs,
        SettingKey::ScrollStartDelayMs,
        SettingKey::ShowEstimate,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            SettingKey::LineWidth => "line_width",
            SettingKey::VisibleLines => "visible_lines",
            SettingKey::WordsPerMinute => "words_per_minute",
            SettingKey::ScrollIntervalMs => "scroll_interval_ms",
            SettingKey::SpeechMode => "speech_mode",
            SettingKey::AutoReplay => "auto_replay",
            SettingKey::MinMatchWords => "min_match_words",
            SettingKey::LookaheadLines => "lookahead_lines",
            SettingKey::SpeechLeadLines => "speech_lead_lines",
            SettingKey::StageDelimiter => "stage_delimiter",
            SettingKey::StageDisplay => "stage_display",
            SettingKey::InitialDisplayDelayMs => "initial_display_delay_ms",
            SettingKey::ScrollStartDelayMs => "scroll_start_delay_ms",
            SettingKey::ShowEstimate => "show_estimate",
        }
    }

    /// Whether a change to this key invalidates the current line layout.
    pub const fn affects_layout(self) -> bool {
        matches!(
            self,
            SettingKey::LineWidth | SettingKey::StageDelimiter | SettingKey::StageDisplay
        )
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SettingKey::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| format!("unknown setting `{wanted}`"))
    }
}

/// Loosely typed setting payload. Numbers arrive as `f64` so non-finite input can be
/// detected before clamping.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    pub const fn kind(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "bool",
            SettingValue::Number(_) => "number",
            SettingValue::Text(_) => "text",
        }
    }

    /// Best-effort parse of a user-typed value: bool, then number, else text.
    pub fn parse_loose(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" => return SettingValue::Bool(true),
            "false" | "off" | "no" => return SettingValue::Bool(false),
            _ => {}
        }
        raw.parse::<f64>()
            .map(SettingValue::Number)
            .unwrap_or_else(|_| SettingValue::Text(raw.to_string()))
    }
}
