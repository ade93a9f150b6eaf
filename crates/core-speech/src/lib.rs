//! Live speech to script position estimation.
//!
//! `normalize` turns recognizer output and script lines into comparable tokens,
//! `similarity` decides when two tokens are close enough, and `matcher` owns the bounded
//! speech buffer plus the forward-only phrase search.

pub mod matcher;
pub mod normalize;
pub mod similarity;

pub use matcher::{
    DEFAULT_LOOKAHEAD_LINES, DEFAULT_MIN_MATCH_WORDS, FINAL_RETENTION, INTERIM_RETENTION,
    MAX_PHRASE_WORDS, MatchStrategy, MatcherConfig, SpeechBuffer, SpeechMatch,
    SpeechPositionMatcher,
};
pub use normalize::normalize_tokens;
pub use similarity::{bounded_levenshtein, is_similar};
