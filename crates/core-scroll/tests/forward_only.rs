//! Speech-driven updates never move the window backward, whatever the matcher suggests.

use std::time::{Duration, Instant};

use core_scroll::{MAX_SPEECH_JUMP, ScrollSettings, ScrollStateMachine};
use core_text::{DelimiterKind, DisplayMode, LayoutOptions, ScriptLayout};
use proptest::prelude::*;

fn script(lines: usize) -> ScriptLayout {
    let text = (0..lines)
        .map(|i| if i % 7 == 3 { " ".to_string() } else { format!("line {i}") })
        .collect::<Vec<_>>()
        .join("\n");
    let opts = LayoutOptions::new(20, DelimiterKind::None, DisplayMode::Normal);
    ScriptLayout::build(&text, &opts).unwrap()
}

proptest! {
    #[test]
    fn speech_matches_are_monotonic(
        lines in 1usize..80,
        visible in 1usize..8,
        lead in 0usize..4,
        suggestions in proptest::collection::vec(0usize..100, 0..40),
    ) {
        let layout = script(lines);
        let settings = ScrollSettings {
            visible_lines: visible,
            speech_lead_lines: lead,
            ..ScrollSettings::default()
        };
        let mut machine = ScrollStateMachine::new(settings, layout.line_count(), Instant::now());
        let mut last = machine.position();
        for s in suggestions {
            let before = machine.position();
            machine.apply_speech_match(&layout, s);
            let after = machine.position();
            prop_assert!(after >= last);
            prop_assert!(after <= machine.max_position());
            // skip-blank may add a little on top of the capped jump
            if after > before {
                prop_assert!(s > before);
            }
            last = after;
        }
    }

    #[test]
    fn interleaved_ticks_and_matches_stay_in_range(
        ops in proptest::collection::vec((any::<bool>(), 0usize..60), 0..60),
    ) {
        let layout = script(50);
        let settings = ScrollSettings {
            words_per_minute: 300.0,
            tick_interval: Duration::from_millis(250),
            ..ScrollSettings::default()
        };
        let mut machine = ScrollStateMachine::new(settings, layout.line_count(), Instant::now());
        let mut last = 0;
        for (is_tick, suggestion) in ops {
            let before = machine.position();
            if is_tick {
                machine.advance_by_time(&layout);
            } else {
                machine.apply_speech_match(&layout, suggestion);
                if machine.position() > before {
                    prop_assert!(machine.accumulator() == 0.0);
                }
            }
            prop_assert!(machine.position() >= last);
            prop_assert!(machine.position() <= machine.max_position());
            last = machine.position();
        }
    }
}

#[test]
fn single_jump_never_exceeds_cap_without_blank_run() {
    let layout = script(60);
    let mut machine = ScrollStateMachine::new(ScrollSettings::default(), layout.line_count(), Instant::now());
    machine.apply_speech_match(&layout, 59);
    assert_eq!(machine.position(), MAX_SPEECH_JUMP);
}
