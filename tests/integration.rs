//! Integration tests for Keyboard Timing
//!
//! These tests drive the whole pipeline: a scripted capture source feeds a
//! session, which normalizes, buffers and finally writes the CSV that is
//! read back and checked.

use keyboard_timing::capture::{CaptureError, CaptureSource, ScriptedSource};
use keyboard_timing::config::Config;
use keyboard_timing::keyboard::{
    EventNormalizer, KeyEventKind, KeyNameResolver, Keymap, ManualClock, ModifierSet,
    RawKeyEvent,
};
use keyboard_timing::report::{SessionCsv, FIELD_COUNT, HEADER, PREAMBLE_LINES};
use keyboard_timing::session::{
    CaptureMode, CaptureSession, SessionError, SessionState, StopSignal,
};
use std::env;
use std::fs;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn temp_path(name: &str) -> PathBuf {
    env::temp_dir().join(format!(
        "keyboard-timing-it-{}-{}.csv",
        name,
        std::process::id()
    ))
}

fn session_for(source: &ScriptedSource, readings: Vec<f64>, capacity: usize) -> CaptureSession {
    let normalizer = EventNormalizer::new(
        Box::new(ManualClock::new(readings)),
        KeyNameResolver::new(source.keymap(), source.probe()),
    );
    CaptureSession::new(source.mode(), normalizer, capacity, StopSignal::new())
}

/// Run `source` to completion and flush to a fresh temp file
fn record(
    name: &str,
    mut source: ScriptedSource,
    readings: Vec<f64>,
    capacity: usize,
) -> (PathBuf, SessionCsv) {
    let path = temp_path(name);
    let _ = fs::remove_file(&path);

    let mut session = session_for(&source, readings, capacity);
    source.run(&mut session).unwrap();
    session.finish(&path).unwrap();

    let csv = SessionCsv::read(&path).unwrap();
    (path, csv)
}

// ---------------------------------------------------------------------------
// Full pipeline tests
// ---------------------------------------------------------------------------

#[test]
fn press_and_release_produce_two_rows() {
    let source = ScriptedSource::new(Keymap::WindowsVirtual, CaptureMode::Gui)
        .key(RawKeyEvent::key_down(0x41).with_scan_code(30))
        .key(RawKeyEvent::key_up(0x41).with_scan_code(30))
        .stop();
    let (path, csv) = record("press-release", source, vec![10.0, 20.0], 100);

    assert_eq!(csv.rows.len(), 2);
    let (down, up) = (&csv.rows[0], &csv.rows[1]);

    assert_eq!(down.seq, 1);
    assert_eq!(down.timestamp_ms, 10.0);
    assert_eq!(down.event_type, KeyEventKind::KeyDown);
    assert_eq!(down.keycode, 0x41);
    assert_eq!(down.scancode, 30);
    assert_eq!(down.character, "a");
    assert_eq!(down.modifiers, ModifierSet::NONE);
    assert!(!down.is_repeat);

    assert_eq!(up.seq, 2);
    assert_eq!(up.timestamp_ms, 20.0);
    assert_eq!(up.event_type, KeyEventKind::KeyUp);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n1,10.000,0.000,key_down,65,30,a,none,0\n"));
    assert!(text.contains("\n2,20.000,0.000,key_up,65,30,a,none,0\n"));
    let _ = fs::remove_file(&path);
}

#[test]
fn file_has_metadata_header_and_one_line_per_event() {
    let source = ScriptedSource::new(Keymap::Evdev, CaptureMode::Terminal)
        .key(RawKeyEvent::key_down(30))
        .key(RawKeyEvent::key_up(30))
        .key(RawKeyEvent::key_down(48))
        .stop();
    let (path, csv) = record("layout", source, vec![1.0, 2.0, 3.0], 100);

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), PREAMBLE_LINES + 3);
    assert_eq!(lines[PREAMBLE_LINES - 1], HEADER);

    let keys: Vec<&str> = csv.metadata.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        keys,
        vec!["platform", "language", "mode", "clock_source", "start_time_utc"]
    );
    assert_eq!(csv.metadata_value("language"), Some("rust"));
    assert_eq!(csv.metadata_value("mode"), Some("terminal"));
    assert_eq!(csv.metadata_value("clock_source"), Some("manual"));

    for line in &lines[PREAMBLE_LINES..] {
        assert_eq!(line.split(',').count(), FIELD_COUNT);
    }
    let _ = fs::remove_file(&path);
}

#[test]
fn sequence_numbers_and_timestamps_increase() {
    let mut source = ScriptedSource::new(Keymap::Evdev, CaptureMode::Terminal);
    for code in [30, 31, 32, 33] {
        source = source
            .key(RawKeyEvent::key_down(code))
            .key(RawKeyEvent::key_up(code));
    }
    let (path, csv) = record(
        "monotonic",
        source.stop(),
        vec![1.0, 1.5, 1.5, 2.25, 3.0, 4.0, 3.5, 5.0],
        100,
    );

    let seqs: Vec<u64> = csv.rows.iter().map(|r| r.seq).collect();
    assert_eq!(seqs, (1..=8).collect::<Vec<u64>>());
    assert!(csv
        .rows
        .windows(2)
        .all(|w| w[1].timestamp_ms >= w[0].timestamp_ms));
    let _ = fs::remove_file(&path);
}

#[test]
fn buffer_capacity_drops_later_events() {
    let mut source = ScriptedSource::new(Keymap::Evdev, CaptureMode::Terminal)
        .key(RawKeyEvent::key_down(30))
        .key(RawKeyEvent::key_up(30))
        .key(RawKeyEvent::key_down(31))
        .stop();
    let path = temp_path("capacity");
    let _ = fs::remove_file(&path);

    let mut session = session_for(&source, vec![1.0, 2.0, 3.0], 2);
    source.run(&mut session).unwrap();
    let summary = session.finish(&path).unwrap();

    assert_eq!(summary.events, 2);
    assert_eq!(summary.dropped, 1);

    let csv = SessionCsv::read(&path).unwrap();
    assert_eq!(csv.rows.len(), 2);
    assert_eq!(csv.rows[1].event_type, KeyEventKind::KeyUp);
    let _ = fs::remove_file(&path);
}

#[test]
fn modifier_toggles_alternate_down_and_up() {
    let source = ScriptedSource::new(Keymap::MacVirtual, CaptureMode::Terminal)
        .modifier(RawKeyEvent::modifier_toggle(0x38).with_modifier_flags(0x0002_0000))
        .key(RawKeyEvent::key_down(0x00).with_modifier_flags(0x0002_0000))
        .key(RawKeyEvent::key_up(0x00).with_modifier_flags(0x0002_0000))
        .modifier(RawKeyEvent::modifier_toggle(0x38).with_modifier_flags(0))
        .stop();
    let (path, csv) = record("toggles", source, vec![1.0, 2.0, 3.0, 4.0], 100);

    let summary: Vec<(KeyEventKind, &str, String)> = csv
        .rows
        .iter()
        .map(|r| (r.event_type, r.character.as_str(), r.modifiers.to_string()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (KeyEventKind::KeyDown, "shift_l", "shift".to_string()),
            (KeyEventKind::KeyDown, "a", "shift".to_string()),
            (KeyEventKind::KeyUp, "a", "shift".to_string()),
            (KeyEventKind::KeyUp, "shift_l", "none".to_string()),
        ]
    );
    let _ = fs::remove_file(&path);
}

#[test]
fn held_modifiers_render_in_canonical_order() {
    // Pressed ctrl first; output order is still shift before ctrl
    let source = ScriptedSource::new(Keymap::Evdev, CaptureMode::Terminal)
        .key(RawKeyEvent::key_down(29))
        .key(RawKeyEvent::key_down(42))
        .key(RawKeyEvent::key_down(30))
        .key(RawKeyEvent::key_down(125))
        .key(RawKeyEvent::key_down(46))
        .stop();
    let (path, csv) = record("modifier-order", source, vec![1.0, 2.0, 3.0, 4.0, 5.0], 100);

    assert_eq!(csv.rows[2].character, "a");
    assert_eq!(csv.rows[2].modifiers.to_string(), "shift+ctrl");
    assert_eq!(csv.rows[4].modifiers.to_string(), "shift+ctrl+meta");

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains(",a,shift+ctrl,0\n"));
    let _ = fs::remove_file(&path);
}

#[test]
fn repeat_flag_is_written_for_autorepeat_presses() {
    let source = ScriptedSource::new(Keymap::Evdev, CaptureMode::Terminal)
        .key(RawKeyEvent::key_down(30))
        .key(RawKeyEvent::key_down(30).with_repeat(true))
        .key(RawKeyEvent::key_up(30))
        .stop();
    let (path, csv) = record("repeat", source, vec![1.0, 2.0, 3.0], 100);

    let repeats: Vec<bool> = csv.rows.iter().map(|r| r.is_repeat).collect();
    assert_eq!(repeats, vec![false, true, false]);
    let _ = fs::remove_file(&path);
}

#[test]
fn terminal_keys_resolve_through_code_points() {
    let source = ScriptedSource::new(Keymap::Terminal, CaptureMode::Gui)
        .key(RawKeyEvent::key_down('Q' as u32))
        .key(RawKeyEvent::key_down(' ' as u32))
        .key(RawKeyEvent::key_down(',' as u32))
        .stop();
    let (path, csv) = record("terminal-keys", source, vec![1.0, 2.0, 3.0], 100);

    let chars: Vec<&str> = csv.rows.iter().map(|r| r.character.as_str()).collect();
    assert_eq!(chars, vec!["Q", "space", "comma"]);
    let _ = fs::remove_file(&path);
}

#[test]
fn empty_session_still_writes_header() {
    let source = ScriptedSource::new(Keymap::Evdev, CaptureMode::Terminal).stop();
    let (path, csv) = record("empty", source, vec![], 100);

    assert!(csv.rows.is_empty());
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), PREAMBLE_LINES);
    let _ = fs::remove_file(&path);
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[test]
fn failed_registration_never_starts_the_session() {
    let mut source = ScriptedSource::failing(
        Keymap::WindowsVirtual,
        CaptureMode::Terminal,
        "SetWindowsHookExW failed",
    )
    .key(RawKeyEvent::key_down(0x41));
    let path = temp_path("fatal-init");
    let _ = fs::remove_file(&path);

    let mut session = session_for(&source, vec![1.0], 100);
    let err = source.run(&mut session).unwrap_err();

    assert!(matches!(err, CaptureError::Registration(_)));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.buffer().is_empty());
    assert!(!path.exists());
}

#[test]
fn unwritable_destination_reports_error_without_creating_file() {
    // A regular file used as the parent directory cannot be written through
    let blocker = temp_path("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let path = blocker.join("session.csv");

    let mut source = ScriptedSource::new(Keymap::Evdev, CaptureMode::Terminal)
        .key(RawKeyEvent::key_down(30))
        .stop();
    let mut session = session_for(&source, vec![1.0], 100);
    source.run(&mut session).unwrap();

    let err = session.finish(&path).unwrap_err();
    assert!(matches!(err, SessionError::Flush(_)));
    assert!(!path.exists());
    let _ = fs::remove_file(&blocker);
}

#[test]
fn missing_parent_directories_are_created() {
    let dir = env::temp_dir().join(format!("keyboard-timing-it-nested-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    let path = dir.join("output").join("session.csv");

    let mut source = ScriptedSource::new(Keymap::Evdev, CaptureMode::Terminal)
        .key(RawKeyEvent::key_down(30))
        .stop();
    let mut session = session_for(&source, vec![1.0], 100);
    source.run(&mut session).unwrap();
    session.finish(&path).unwrap();

    assert_eq!(SessionCsv::read(&path).unwrap().rows.len(), 1);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn stop_signal_from_another_thread_ends_replay() {
    let mut source = ScriptedSource::new(Keymap::Evdev, CaptureMode::Terminal)
        .key(RawKeyEvent::key_down(30))
        .key(RawKeyEvent::key_up(30));
    let mut session = session_for(&source, vec![1.0, 2.0], 100);

    let stop = session.stop_signal().clone();
    std::thread::spawn(move || stop.request()).join().unwrap();

    source.run(&mut session).unwrap();
    assert!(session.stop_requested());
    assert!(session.buffer().is_empty());
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn default_output_path_uses_variant_tag() {
    let config = Config::default();
    let exe_dir = PathBuf::from("/opt/keyboard-timing");
    let path = config.default_output_path(CaptureMode::Terminal, &exe_dir);

    assert!(path.starts_with(exe_dir.join("output")));
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some(format!("rust_terminal_{}.csv", std::env::consts::OS).as_str())
    );
}
