//! The matcher never reports a line behind the current position or past the script.

use core_speech::{MatcherConfig, SpeechPositionMatcher};
use proptest::prelude::*;

const VOCAB: &[&str] = &[
    "the", "show", "welcome", "to", "tonight", "we", "have", "guests", "and", "music", "thanks",
    "for", "watching",
];

fn phrase(max: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::sample::select(VOCAB), 1..max).prop_map(|w| w.join(" "))
}

proptest! {
    #[test]
    fn matches_stay_inside_forward_window(
        script in proptest::collection::vec(phrase(6), 1..30),
        speech in proptest::collection::vec(phrase(8), 1..6),
        current in 0usize..30,
        lookahead in 0usize..8,
    ) {
        let config = MatcherConfig { visible_lines: 4, lookahead_lines: lookahead, min_match_words: 3 };
        let mut matcher = SpeechPositionMatcher::new(config);
        for chunk in &speech {
            matcher.ingest(chunk, true);
        }
        if let Some(line) = matcher.match_position(current, &script) {
            prop_assert!(line >= current);
            prop_assert!(line < script.len());
            prop_assert!(line < current + 4 + 1 + lookahead);
        }
    }
}

#[test]
fn scenario_exact_match_on_second_line() {
    let mut matcher = SpeechPositionMatcher::new(MatcherConfig::default());
    matcher.ingest("welcome to the show", true);
    let tokens: Vec<&str> = matcher.buffer().tokens().collect();
    assert_eq!(tokens, ["welcome", "to", "the", "show"]);
    let script = vec![
        "Hello everyone".to_string(),
        "welcome to the show today".to_string(),
    ];
    assert_eq!(matcher.match_position(0, &script), Some(1));
}
