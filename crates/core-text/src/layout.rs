//! Fixed-width line layout for scripts.
//!
//! Contract:
//! - Input: raw script text (LF or CRLF line endings) and a positive line width counted in chars.
//! - Output: ordered display lines. The index of a line is the unit of scroll position.
//! - A run of two or more line breaks is a paragraph boundary: it renders as one blank line
//!   followed by the next paragraph's first wrapped line indented by [`PARAGRAPH_INDENT`].
//!   Later wrapped lines of the same paragraph are not indented.
//! - Within a paragraph, single line breaks are hard breaks and whitespace-only lines survive
//!   as empty output lines.
//! - Words pack greedily. An overflowing line breaks at the last space before the limit; a
//!   word longer than the limit is force-broken exactly at the limit.
//!
//! Every emitted line is at most `max_line_length` chars long.

use thiserror::Error;

/// Indentation applied to the first wrapped line of every paragraph after the first.
pub const PARAGRAPH_INDENT: &str = "    ";

/// Words-per-line used when an estimate is unavailable (empty script).
pub const FALLBACK_WORDS_PER_LINE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("line width must be a positive number of characters, got {0}")]
    InvalidLineWidth(usize),
}

/// Wrap `text` into display lines no wider than `max_line_length` chars.
pub fn wrap(text: &str, max_line_length: usize) -> Result<Vec<String>, LayoutError> {
    if max_line_length == 0 {
        return Err(LayoutError::InvalidLineWidth(max_line_length));
    }
    let normalized = text.replace("\r\n", "\n");
    let mut out = Vec::new();
    for (idx, paragraph) in split_paragraphs(&normalized).into_iter().enumerate() {
        let mut indent_pending = idx > 0;
        if indent_pending {
            out.push(String::new());
        }
        for raw_line in paragraph.split('\n') {
            if raw_line.trim().is_empty() {
                out.push(String::new());
                continue;
            }
            if indent_pending {
                indent_pending = false;
                wrap_line(raw_line.trim_start(), max_line_length, PARAGRAPH_INDENT, &mut out);
            } else {
                wrap_line(raw_line, max_line_length, "", &mut out);
            }
        }
    }
    Ok(out)
}

/// Average words per wrapped line of `text`; `0.0` when the text produces no lines.
///
/// Callers substitute [`FALLBACK_WORDS_PER_LINE`] for non-positive results (see
/// [`effective_words_per_line`]).
pub fn estimate_words_per_line(text: &str, max_line_length: usize) -> Result<f64, LayoutError> {
    let lines = wrap(text, max_line_length)?;
    if lines.is_empty() {
        return Ok(0.0);
    }
    let words = text.split_whitespace().count();
    Ok(words as f64 / lines.len() as f64)
}

/// Apply the fallback for an empty-text estimate so rate math never divides by zero.
pub fn effective_words_per_line(estimate: f64) -> f64 {
    if estimate.is_finite() && estimate > 0.0 {
        estimate
    } else {
        FALLBACK_WORDS_PER_LINE
    }
}

/// Split on runs of two or more `\n`. Leading and trailing breaks never open a paragraph.
fn split_paragraphs(text: &str) -> Vec<&str> {
    let text = text.trim_matches('\n');
    if text.is_empty() {
        return Vec::new();
    }
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\n' {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < bytes.len() && bytes[i] == b'\n' {
            i += 1;
        }
        if i - run_start >= 2 {
            out.push(&text[start..run_start]);
            start = i;
        }
    }
    out.push(&text[start..]);
    out
}

fn wrap_line(line: &str, max: usize, indent: &str, out: &mut Vec<String>) {
    // An indent that would fill the whole line is dropped rather than emitted alone.
    let indent = if indent.chars().count() < max { indent } else { "" };
    let chars: Vec<char> = indent.chars().chain(line.trim_end().chars()).collect();
    let mut rest: &[char] = &chars;
    while rest.len() > max {
        let lead = rest.iter().take_while(|c| **c == ' ').count();
        let split = rest[..=max].iter().rposition(|c| *c == ' ').filter(|&p| p > lead);
        match split {
            Some(p) => {
                out.push(trim_end_spaces(&rest[..p]));
                rest = skip_spaces(&rest[p + 1..]);
            }
            None => {
                out.push(rest[..max].iter().collect());
                rest = skip_spaces(&rest[max..]);
            }
        }
    }
    if !rest.is_empty() {
        out.push(rest.iter().collect());
    }
}

fn trim_end_spaces(chars: &[char]) -> String {
    let end = chars.iter().rposition(|c| *c != ' ').map_or(0, |p| p + 1);
    chars[..end].iter().collect()
}

fn skip_spaces(chars: &[char]) -> &[char] {
    let start = chars.iter().take_while(|c| **c == ' ').count();
    &chars[start..]
}
