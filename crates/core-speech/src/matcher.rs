//! Speech position matching.
//!
//! The matcher keeps a bounded buffer of recently recognized words and estimates the
//! furthest script line those words plausibly come from. It only ever searches forward:
//! the window is `[current, current + visible + 1 + lookahead)` clipped to the script.
//!
//! Search order, first hit wins:
//! 1. phrase length from `min(buffer_len, 5)` down to `min_match_words`;
//! 2. for each length, an exact substring match of the space-joined phrase inside the
//!    space-joined window, then a fuzzy match over windows of `len`, `len - 1` and
//!    `len + 1` words where every spoken word needs a similar partner.
//!
//! The substring match does not respect word boundaries, so `"the show"` also hits
//! `"breathe showing"`. Within a strategy the latest occurrence in the window wins. The
//! reported line is the one holding the last matched word.

use std::collections::VecDeque;

use core_text::effective_words_per_line;
use tracing::{debug, trace};

use crate::normalize::normalize_tokens;
use crate::similarity::is_similar;

/// Tokens kept after a finalized recognition result.
pub const FINAL_RETENTION: usize = 20;
/// Tokens kept after an interim recognition result.
pub const INTERIM_RETENTION: usize = 10;
/// Longest phrase tried against the script.
pub const MAX_PHRASE_WORDS: usize = 5;
pub const DEFAULT_MIN_MATCH_WORDS: usize = 3;
pub const DEFAULT_LOOKAHEAD_LINES: usize = 6;

/// Most recent normalized speech tokens, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechBuffer {
    tokens: VecDeque<String>,
}

impl SpeechBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `tokens` then drop from the front until at most `retention` remain.
    pub fn extend<I>(&mut self, tokens: I, retention: usize)
    where
        I: IntoIterator<Item = String>,
    {
        self.tokens.extend(tokens);
        while self.tokens.len() > retention {
            self.tokens.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// The last `n` tokens (fewer if the buffer is shorter).
    pub fn tail(&self, n: usize) -> Vec<&str> {
        let skip = self.tokens.len().saturating_sub(n);
        self.tokens.iter().skip(skip).map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherConfig {
    pub visible_lines: usize,
    pub lookahead_lines: usize,
    pub min_match_words: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            visible_lines: 4,
            lookahead_lines: DEFAULT_LOOKAHEAD_LINES,
            min_match_words: DEFAULT_MIN_MATCH_WORDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    Fuzzy,
}

impl MatchStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::Fuzzy => "fuzzy",
        }
    }
}

/// A successful match against the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechMatch {
    /// Absolute line index containing the last matched word.
    pub line: usize,
    /// Offset of the last matched word within the search window.
    pub word_offset: usize,
    pub phrase_words: usize,
    pub strategy: MatchStrategy,
}

#[derive(Debug, Clone, Default)]
pub struct SpeechPositionMatcher {
    buffer: SpeechBuffer,
    config: MatcherConfig,
}

/// Normalized words of the search window plus per-line counts for mapping back.
struct SearchWindow {
    start: usize,
    words: Vec<String>,
    line_words: Vec<usize>,
}

impl SearchWindow {
    fn build(lines: &[String], start: usize, end: usize) -> Self {
        let mut words = Vec::new();
        let mut line_words = Vec::with_capacity(end - start);
        for line in &lines[start..end] {
            let tokens = normalize_tokens(line);
            line_words.push(tokens.len());
            words.extend(tokens);
        }
        Self {
            start,
            words,
            line_words,
        }
    }

    fn line_for_offset(&self, offset: usize) -> usize {
        let mut cumulative = 0;
        for (idx, count) in self.line_words.iter().enumerate() {
            cumulative += count;
            if cumulative > offset {
                return self.start + idx;
            }
        }
        let non_empty = self.line_words.iter().filter(|c| **c > 0).count();
        let average = if non_empty == 0 {
            0.0
        } else {
            self.words.len() as f64 / non_empty as f64
        };
        self.start + (offset as f64 / effective_words_per_line(average)).floor() as usize
    }
}

impl SpeechPositionMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            buffer: SpeechBuffer::new(),
            config,
        }
    }

    pub fn config(&self) -> MatcherConfig {
        self.config
    }

    pub fn set_config(&mut self, config: MatcherConfig) {
        self.config = config;
    }

    pub fn buffer(&self) -> &SpeechBuffer {
        &self.buffer
    }

    /// Append recognized speech. Returns false (and leaves the buffer untouched) when the
    /// text carries no tokens.
    pub fn ingest(&mut self, raw: &str, is_final: bool) -> bool {
        if raw.trim().is_empty() {
            return false;
        }
        let tokens = normalize_tokens(raw);
        if tokens.is_empty() {
            return false;
        }
        let retention = if is_final {
            FINAL_RETENTION
        } else {
            INTERIM_RETENTION
        };
        let added = tokens.len();
        self.buffer.extend(tokens, retention);
        trace!(
            target: "speech.buffer",
            added,
            is_final,
            buffered = self.buffer.len(),
            "speech_ingested"
        );
        true
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Line index the buffered speech matches, searching forward from `current`.
    pub fn match_position(&self, current: usize, lines: &[String]) -> Option<usize> {
        self.find_match(current, lines).map(|m| m.line)
    }

    pub fn find_match(&self, current: usize, lines: &[String]) -> Option<SpeechMatch> {
        if current >= lines.len() {
            return None;
        }
        let min_len = self.config.min_match_words.max(1);
        let max_len = self.buffer.len().min(MAX_PHRASE_WORDS);
        if max_len < min_len {
            return None;
        }
        let span = self.config.visible_lines + 1 + self.config.lookahead_lines;
        let end = current.saturating_add(span).min(lines.len());
        let window = SearchWindow::build(lines, current, end);
        if window.words.is_empty() {
            return None;
        }

        for len in (min_len..=max_len).rev() {
            let phrase = self.buffer.tail(len);
            let hit = exact_match(&phrase, &window.words)
                .map(|offset| (offset, MatchStrategy::Exact))
                .or_else(|| fuzzy_match(&phrase, &window.words).map(|o| (o, MatchStrategy::Fuzzy)));
            if let Some((word_offset, strategy)) = hit {
                let line = window.line_for_offset(word_offset);
                debug!(
                    target: "speech.match",
                    current,
                    line,
                    phrase_words = len,
                    strategy = strategy.as_str(),
                    "speech_match_found"
                );
                return Some(SpeechMatch {
                    line,
                    word_offset,
                    phrase_words: len,
                    strategy,
                });
            }
        }
        trace!(
            target: "speech.match",
            current,
            window_words = window.words.len(),
            buffered = self.buffer.len(),
            "speech_match_none"
        );
        None
    }
}

/// Offset of the word holding the end of the latest substring occurrence of `phrase`.
fn exact_match(phrase: &[&str], words: &[String]) -> Option<usize> {
    if phrase.is_empty() || words.is_empty() {
        return None;
    }
    let needle = phrase.join(" ");
    let haystack = words.join(" ");
    let end = haystack.rfind(&needle)? + needle.len();
    Some(haystack[..end].matches(' ').count())
}

/// Offset of the last word of the latest window in which every phrase word has a similar
/// partner. Window sizes are tried in the order `len`, `len - 1`, `len + 1`.
fn fuzzy_match(phrase: &[&str], words: &[String]) -> Option<usize> {
    let len = phrase.len();
    let sizes = [Some(len), len.checked_sub(1), Some(len + 1)];
    for size in sizes.into_iter().flatten() {
        if size == 0 || size > words.len() {
            continue;
        }
        let found = words.windows(size).rposition(|window| {
            let similar = phrase
                .iter()
                .filter(|spoken| window.iter().any(|w| is_similar(spoken, w)))
                .count();
            similar >= len
        });
        if let Some(start) = found {
            return Some(start + size - 1);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    fn matcher_with(speech: &str) -> SpeechPositionMatcher {
        let mut m = SpeechPositionMatcher::new(MatcherConfig::default());
        assert!(m.ingest(speech, true));
        m
    }

    #[test]
    fn exact_match_finds_second_line() {
        let m = matcher_with("welcome to the show");
        let script = lines(&["Hello everyone", "welcome to the show today"]);
        let found = m.find_match(0, &script).unwrap();
        assert_eq!(found.line, 1);
        assert_eq!(found.strategy, MatchStrategy::Exact);
        assert_eq!(found.phrase_words, 4);
    }

    #[test]
    fn exact_match_ignores_word_boundaries() {
        let m = matcher_with("so the show");
        let script = lines(&["opening remarks", "also the showroom opens"]);
        let found = m.find_match(0, &script).unwrap();
        assert_eq!(found.line, 1);
        assert_eq!(found.strategy, MatchStrategy::Exact);
        assert_eq!(found.word_offset, 4);
    }

    #[test]
    fn fuzzy_match_tolerates_recognition_errors() {
        let m = matcher_with("welcame to the shows");
        let script = lines(&["Hello everyone", "welcome to the show today"]);
        let found = m.find_match(0, &script).unwrap();
        assert_eq!(found.line, 1);
        assert_eq!(found.strategy, MatchStrategy::Fuzzy);
    }

    #[test]
    fn never_looks_behind_current() {
        let m = matcher_with("alpha beta gamma");
        let script = lines(&["alpha beta gamma", "one two", "three four"]);
        assert_eq!(m.match_position(0, &script), Some(0));
        assert_eq!(m.match_position(1, &script), None);
    }

    #[test]
    fn window_is_clipped_to_lookahead() {
        let mut m = SpeechPositionMatcher::new(MatcherConfig {
            visible_lines: 1,
            lookahead_lines: 0,
            min_match_words: 3,
        });
        m.ingest("far away words", true);
        let script = lines(&["one two", "six ten", "far away words"]);
        // window = [0, 2)
        assert_eq!(m.match_position(0, &script), None);
        assert_eq!(m.match_position(1, &script), Some(2));
    }

    #[test]
    fn below_min_words_never_matches() {
        let m = matcher_with("hello everyone");
        let script = lines(&["Hello everyone"]);
        assert_eq!(m.match_position(0, &script), None);
    }

    #[test]
    fn latest_occurrence_wins() {
        let m = matcher_with("and so on");
        let script = lines(&["and so on", "middle text", "and so on"]);
        assert_eq!(m.match_position(0, &script), Some(2));
    }

    #[test]
    fn phrase_crossing_lines_reports_line_of_last_word() {
        let m = matcher_with("quick brown fox jumps over");
        let script = lines(&["the quick brown", "fox jumps over", "the lazy dog"]);
        assert_eq!(m.match_position(0, &script), Some(1));
    }

    #[test]
    fn blank_lines_in_window_are_skipped_when_mapping() {
        let m = matcher_with("the lazy dog");
        let script = lines(&["intro words", "", "    the lazy dog"]);
        assert_eq!(m.match_position(0, &script), Some(2));
    }

    #[test]
    fn whitespace_only_speech_is_ignored() {
        let mut m = SpeechPositionMatcher::new(MatcherConfig::default());
        assert!(!m.ingest("   \t ", true));
        assert!(!m.ingest("?!", false));
        assert!(m.buffer().is_empty());
    }

    #[test]
    fn buffer_retention_depends_on_finality() {
        let mut m = SpeechPositionMatcher::new(MatcherConfig::default());
        let words: Vec<String> = (0..30).map(|i| format!("w{i}")).collect();
        m.ingest(&words.join(" "), true);
        assert_eq!(m.buffer().len(), FINAL_RETENTION);
        assert_eq!(m.buffer().tail(1), vec!["w29"]);
        m.ingest("x y", false);
        assert_eq!(m.buffer().len(), INTERIM_RETENTION);
        assert_eq!(m.buffer().tail(2), vec!["x", "y"]);
        m.reset();
        assert!(m.buffer().is_empty());
    }

    #[test]
    fn line_mapping_falls_back_to_average() {
        let window = SearchWindow {
            start: 3,
            words: Vec::new(),
            line_words: Vec::new(),
        };
        // empty window: fallback average of 5 words per line
        assert_eq!(window.line_for_offset(12), 5);
    }
}
