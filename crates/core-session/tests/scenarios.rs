//! End-to-end behaviour of one controller driven by explicit instants.

use core_config::{Config, SettingKey, SettingValue};
use core_events::TimerKind;
use core_scroll::EndOfTextState;
use core_session::frame::progress_header;
use core_session::{DisplaySink, Lifecycle, RemoteControl, TeleprompterController};
use core_text::{DelimiterKind, DisplayMode};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Recorder {
    frames: Vec<String>,
}

impl DisplaySink for Recorder {
    fn show(&mut self, frame: &str, _timeout: Duration) {
        self.frames.push(frame.to_string());
    }
}

fn ten_line_script() -> String {
    (0..10)
        .map(|i| format!("line number {i} here"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn immediate(config: Config) -> Config {
    Config {
        initial_display_delay: Duration::ZERO,
        scroll_start_delay: Duration::ZERO,
        ..config
    }
}

/// Start a controller at `t0` and fire the initial display and scroll start.
fn started(text: &str, config: Config, t0: Instant) -> TeleprompterController<Recorder> {
    let mut c = TeleprompterController::new(text, immediate(config), Recorder::default(), t0)
        .expect("controller");
    c.poll_timers(t0);
    c.poll_timers(t0);
    assert!(c.is_scheduled(TimerKind::ScrollTick));
    c
}

fn body(frame: &str) -> &str {
    frame.split_once('\n').map(|(_, rest)| rest).unwrap_or("")
}

#[test]
fn scenario_time_advance_reaches_end_message() {
    let t0 = Instant::now();
    let mut c = started(&ten_line_script(), Config::default(), t0);
    assert_eq!(c.layout().line_count(), 10);

    let step = Duration::from_millis(500);
    let mut t = t0;
    while c.machine().state() == EndOfTextState::Scrolling {
        t += step;
        c.poll_timers(t);
        assert!(t < t0 + Duration::from_secs(60), "never reached the end");
    }
    let reached = t;
    assert_eq!(c.status().current_line, 6);
    assert!(c.status().is_at_end);
    assert_eq!(c.machine().state(), EndOfTextState::ShowingFinalLine);
    let final_body = body(&c.get_current_visible_text(reached)).to_string();
    assert_eq!(
        final_body,
        "line number 6 here\nline number 7 here\nline number 8 here\nline number 9 here"
    );

    let second = Duration::from_secs(1);
    for _ in 0..4 {
        t += second;
        c.poll_timers(t);
    }
    assert_eq!(c.machine().state(), EndOfTextState::ShowingFinalLine);
    assert_eq!(body(&c.get_current_visible_text(t)), final_body);

    t += second;
    c.poll_timers(t);
    assert_eq!(c.machine().state(), EndOfTextState::ShowingEndMessage);
    let header = progress_header(100, t - t0, true);
    assert_eq!(
        c.get_current_visible_text(t),
        format!("{header}\n\n*** END OF TEXT ***")
    );

    for _ in 0..9 {
        t += second;
        assert_eq!(c.poll_timers(t), Lifecycle::Running);
    }
    t += second;
    assert_eq!(c.poll_timers(t), Lifecycle::Finished);
    assert_eq!(c.machine().state(), EndOfTextState::Stopped);
    assert!(!c.is_scheduled(TimerKind::EndTick));
}

#[test]
fn scenario_dimmed_display_and_stripped_speech() {
    let config = Config {
        line_width: 80,
        stage_delimiter: DelimiterKind::Square,
        stage_display: DisplayMode::Dimmed,
        ..Config::default()
    };
    let c = TeleprompterController::new("Hello [wave] there", config, Recorder::default(), Instant::now())
        .expect("controller");
    assert_eq!(c.layout().display_lines(), ["Hello (wave) there"]);
    assert_eq!(c.layout().speech_lines(), ["Hello  there"]);
}

#[test]
fn scenario_speech_matches_second_line() {
    let t0 = Instant::now();
    let config = Config {
        speech_mode: true,
        visible_lines: 1,
        ..Config::default()
    };
    let mut c = started("Hello everyone\nwelcome to the show today", config, t0);
    assert!(c.on_transcript("welcome to the show", true, t0));
    assert_eq!(c.status().current_line, 1);
    assert!(c.status().speech_mode_enabled);
}

#[test]
fn scenario_auto_replay_resets_exactly_once() {
    let t0 = Instant::now();
    let config = Config {
        auto_replay: true,
        ..Config::default()
    };
    let mut c = started(&ten_line_script(), config, t0);
    c.go_to_line(100, t0);

    let step = Duration::from_millis(500);
    let mut t = t0;
    let mut last_position = c.status().current_line;
    let mut resets = 0;
    let mut saw_pending_replay_with_end_tick = false;
    while t < t0 + Duration::from_secs(30) {
        t += step;
        c.poll_timers(t);
        let position = c.status().current_line;
        if position < last_position {
            resets += 1;
        }
        last_position = position;
        if c.machine().state() == EndOfTextState::AutoReplayScheduled
            && c.is_scheduled(TimerKind::EndTick)
            && c.is_scheduled(TimerKind::ReplayRestart)
        {
            saw_pending_replay_with_end_tick = true;
        }
    }

    assert!(saw_pending_replay_with_end_tick);
    assert_eq!(resets, 1);
    assert_eq!(c.machine().state(), EndOfTextState::Scrolling);
    assert!(!c.is_scheduled(TimerKind::EndTick));
    assert!(!c.is_scheduled(TimerKind::ReplayRestart));
    assert!(c.status().current_line < 6);
}

/// Poll every 100ms and record the instant of each end-of-text state change.
fn end_timeline(
    c: &mut TeleprompterController<Recorder>,
    t0: Instant,
    until: Duration,
) -> Vec<(Duration, EndOfTextState)> {
    let mut timeline = Vec::new();
    let mut state = c.machine().state();
    let mut t = t0;
    while t < t0 + until {
        t += Duration::from_millis(100);
        c.poll_timers(t);
        if c.machine().state() != state {
            state = c.machine().state();
            timeline.push((t - t0, state));
        }
    }
    timeline
}

#[test]
fn end_dwells_last_exactly_their_configured_length() {
    let t0 = Instant::now();
    let config = Config {
        auto_replay: true,
        ..Config::default()
    };
    let mut c = started(&ten_line_script(), config, t0);
    c.go_to_line(6, t0);
    let timeline = end_timeline(&mut c, t0, Duration::from_millis(20_600));
    assert_eq!(
        timeline,
        [
            (Duration::from_millis(500), EndOfTextState::ShowingFinalLine),
            (Duration::from_millis(5_500), EndOfTextState::ShowingEndMessage),
            (Duration::from_millis(15_500), EndOfTextState::AutoReplayScheduled),
            (Duration::from_millis(20_500), EndOfTextState::Scrolling),
        ]
    );
}

#[test]
fn new_text_at_end_resumes_scrolling() {
    let t0 = Instant::now();
    let mut c = started(&ten_line_script(), Config::default(), t0);
    c.go_to_line(6, t0);
    let t1 = t0 + Duration::from_millis(500);
    c.poll_timers(t1);
    assert_eq!(c.machine().state(), EndOfTextState::ShowingFinalLine);

    let longer = (0..40)
        .map(|i| format!("line number {i} here"))
        .collect::<Vec<_>>()
        .join("\n");
    c.set_text(longer, t1).expect("relayout");
    assert_eq!(c.status().current_line, 6);
    assert!(!c.status().is_at_end);
    assert_eq!(c.machine().state(), EndOfTextState::Scrolling);
    assert!(c.is_scheduled(TimerKind::ScrollTick));
    assert!(!c.is_scheduled(TimerKind::EndTick));

    let mut t = t1;
    for _ in 0..40 {
        t += Duration::from_millis(500);
        assert_eq!(c.poll_timers(t), Lifecycle::Running);
    }
    assert!(c.status().current_line > 6);
    assert!(!c.get_current_visible_text(t).contains("END OF TEXT"));
}

#[test]
fn shrinking_window_at_end_resumes_scrolling() {
    let t0 = Instant::now();
    let mut c = started(&ten_line_script(), Config::default(), t0);
    c.go_to_line(6, t0);
    let mut t = t0;
    for _ in 0..6 {
        t += Duration::from_secs(1);
        c.poll_timers(t);
    }
    assert_eq!(c.machine().state(), EndOfTextState::ShowingEndMessage);

    assert!(
        c.on_setting_changed(SettingKey::VisibleLines, SettingValue::Number(2.0), t)
            .expect("setting")
    );
    assert_eq!(c.status().current_line, 6);
    assert!(!c.status().is_at_end);
    assert_eq!(c.machine().state(), EndOfTextState::Scrolling);
    assert!(c.is_scheduled(TimerKind::ScrollTick));
    assert!(!c.is_scheduled(TimerKind::EndTick));
    assert!(c.sink().frames.last().is_some_and(|f| f.contains("line number 6 here")));
}

#[test]
fn manual_move_out_of_end_state_resumes_scrolling() {
    let t0 = Instant::now();
    let mut c = started(&ten_line_script(), Config::default(), t0);
    c.go_to_line(6, t0);
    let t1 = t0 + Duration::from_millis(500);
    c.poll_timers(t1);
    assert_eq!(c.machine().state(), EndOfTextState::ShowingFinalLine);
    assert!(c.is_scheduled(TimerKind::EndTick));

    c.scroll_back(3, t1);
    assert_eq!(c.machine().state(), EndOfTextState::Scrolling);
    assert!(!c.is_scheduled(TimerKind::EndTick));
    assert!(c.is_scheduled(TimerKind::ScrollTick));
    assert_eq!(c.status().current_line, 3);
}

#[test]
fn reset_returns_to_start_from_end_message() {
    let t0 = Instant::now();
    let mut c = started(&ten_line_script(), Config::default(), t0);
    c.go_to_line(6, t0);
    let mut t = t0;
    for _ in 0..10 {
        t += Duration::from_secs(1);
        c.poll_timers(t);
    }
    assert_eq!(c.machine().state(), EndOfTextState::ShowingEndMessage);
    c.reset_position(t);
    assert_eq!(c.machine().state(), EndOfTextState::Scrolling);
    assert_eq!(c.status().current_line, 0);
    assert!(
        c.sink()
            .frames
            .last()
            .is_some_and(|f| f.starts_with("[0%] | 00:00") && f.contains("line number 0 here"))
    );
}

#[test]
fn stage_direction_only_window_is_skipped_in_speech_mode() {
    let t0 = Instant::now();
    let config = Config {
        speech_mode: true,
        visible_lines: 1,
        stage_delimiter: DelimiterKind::Square,
        ..Config::default()
    };
    let mut c = started("hello there\n[walk left] \n[pause] \nwelcome back\nend", config, t0);
    c.go_to_line(1, t0);
    let mut t = t0 + Duration::from_millis(500);
    c.poll_timers(t);
    assert_eq!(c.status().current_line, 3);
    t += Duration::from_millis(500);
    c.poll_timers(t);
    assert_eq!(c.status().current_line, 3);
}

const VOCAB: &[&str] = &[
    "welcome", "to", "the", "show", "tonight", "we", "have", "guests", "music", "thanks",
];

proptest! {
    #[test]
    fn speech_never_moves_backward(
        script in proptest::collection::vec(proptest::collection::vec(proptest::sample::select(VOCAB), 1..6), 5..25),
        speech in proptest::collection::vec(proptest::collection::vec(proptest::sample::select(VOCAB), 1..6), 1..12),
    ) {
        let text = script.iter().map(|l| l.join(" ")).collect::<Vec<_>>().join("\n");
        let config = Config { speech_mode: true, ..Config::default() };
        let t0 = Instant::now();
        let mut c = TeleprompterController::new(text, immediate(config), Recorder::default(), t0).unwrap();
        let mut last = c.status().current_line;
        for chunk in speech {
            c.on_transcript(&chunk.join(" "), true, t0);
            let now = c.status().current_line;
            prop_assert!(now >= last);
            prop_assert!(now <= last + 10);
            last = now;
        }
    }
}
