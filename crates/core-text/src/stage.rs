//! Stage direction spans: author-marked bracketed text that is never spoken.
//!
//! Range finding is a single left-to-right scan tracking nesting depth. Policies:
//! * Nested same-type brackets are absorbed into the outermost span.
//! * A close bracket at depth zero is ordinary text.
//! * An unclosed span extends to the end of the text. Malformed markup is never an error.
//!
//! Spans are half-open byte ranges `[start, end)` into the original text; `end` sits just
//! past the closing bracket when one exists.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Bracket style marking stage directions. `None` disables filtering entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DelimiterKind {
    #[default]
    None,
    Square,
    Round,
    Curly,
}

impl DelimiterKind {
    /// Literal open/close characters, or `None` when filtering is disabled.
    pub const fn pair(self) -> Option<(char, char)> {
        match self {
            DelimiterKind::None => None,
            DelimiterKind::Square => Some(('[', ']')),
            DelimiterKind::Round => Some(('(', ')')),
            DelimiterKind::Curly => Some(('{', '}')),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DelimiterKind::None => "none",
            DelimiterKind::Square => "square",
            DelimiterKind::Round => "round",
            DelimiterKind::Curly => "curly",
        }
    }
}

impl fmt::Display for DelimiterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DelimiterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(DelimiterKind::None),
            "square" | "[]" => Ok(DelimiterKind::Square),
            "round" | "()" => Ok(DelimiterKind::Round),
            "curly" | "{}" => Ok(DelimiterKind::Curly),
            other => Err(format!("unknown stage delimiter `{other}`")),
        }
    }
}

/// How stage directions appear in display lines. Speech-matching lines always strip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayMode {
    #[default]
    Normal,
    Dimmed,
    Hidden,
}

impl DisplayMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            DisplayMode::Normal => "normal",
            DisplayMode::Dimmed => "dimmed",
            DisplayMode::Hidden => "hidden",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(DisplayMode::Normal),
            "dimmed" | "dim" => Ok(DisplayMode::Dimmed),
            "hidden" | "hide" => Ok(DisplayMode::Hidden),
            other => Err(format!("unknown stage display mode `{other}`")),
        }
    }
}

/// Ordered, non-overlapping spans delimited by `open`/`close`.
pub fn find_ranges(text: &str, open: char, close: char) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, ch) in text.char_indices() {
        if ch == open {
            if depth == 0 {
                start = idx;
            }
            depth += 1;
        } else if ch == close && depth > 0 {
            depth -= 1;
            if depth == 0 {
                spans.push(start..idx + ch.len_utf8());
            }
        }
    }
    if depth > 0 {
        spans.push(start..text.len());
    }
    spans
}

/// Remove every stage direction span, concatenating the text between them verbatim.
pub fn strip(text: &str, delimiter: DelimiterKind) -> Cow<'_, str> {
    let Some((open, close)) = delimiter.pair() else {
        return Cow::Borrowed(text);
    };
    let spans = find_ranges(text, open, close);
    if spans.is_empty() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    Cow::Owned(out)
}

/// Render stage directions for display according to `mode`.
///
/// `Dimmed` rewrites each span's outer delimiters to parentheses (a no-op for `Round`) and
/// closes an unterminated span with a synthesized `)`.
pub fn transform(text: &str, delimiter: DelimiterKind, mode: DisplayMode) -> Cow<'_, str> {
    match mode {
        DisplayMode::Normal => Cow::Borrowed(text),
        DisplayMode::Hidden => strip(text, delimiter),
        DisplayMode::Dimmed => dim(text, delimiter),
    }
}

fn dim(text: &str, delimiter: DelimiterKind) -> Cow<'_, str> {
    let Some((open, close)) = delimiter.pair() else {
        return Cow::Borrowed(text);
    };
    if delimiter == DelimiterKind::Round {
        return Cow::Borrowed(text);
    }
    let spans = find_ranges(text, open, close);
    if spans.is_empty() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 1);
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        let inner_start = span.start + open.len_utf8();
        let unclosed = span.end == text.len() && !text.ends_with(close);
        let inner_end = if unclosed {
            span.end
        } else {
            span.end - close.len_utf8()
        };
        out.push('(');
        out.push_str(&text[inner_start..inner_end.max(inner_start)]);
        out.push(')');
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    Cow::Owned(out)
}
