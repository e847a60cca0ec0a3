//! Raw event normalization
//!
//! Runs inside the capture callback, on the thread that received the raw
//! event, so the capture timestamp is the observation time.

use super::clock::ClockSource;
use super::event::{KeyEventKind, KeyEventRecord, RawEventKind, RawKeyEvent};
use super::modifiers::ModifierTracker;
use super::resolver::KeyNameResolver;

/// Turns raw platform events into canonical records
pub struct EventNormalizer {
    clock: Box<dyn ClockSource>,
    tracker: ModifierTracker,
    resolver: KeyNameResolver,
    last_timestamp_ms: f64,
}

impl EventNormalizer {
    /// The resolver's keymap also drives the modifier tracker
    pub fn new(clock: Box<dyn ClockSource>, resolver: KeyNameResolver) -> Self {
        Self {
            clock,
            tracker: ModifierTracker::new(resolver.keymap()),
            resolver,
            last_timestamp_ms: 0.0,
        }
    }

    pub fn clock_name(&self) -> &'static str {
        self.clock.name()
    }

    pub fn tracker(&self) -> &ModifierTracker {
        &self.tracker
    }

    /// Normalize one raw event.
    ///
    /// Returns `None` for events that are not key presses or releases:
    /// non-keyboard notifications and toggles that resolve to neither kind.
    /// The returned record has `seq == 0`; the buffer assigns it.
    pub fn normalize(&mut self, raw: &RawKeyEvent) -> Option<KeyEventRecord> {
        let now = self.clock.now_ms();

        let kind = match raw.kind {
            RawEventKind::KeyDown => {
                self.tracker.observe(raw.key_code, KeyEventKind::KeyDown);
                KeyEventKind::KeyDown
            }
            RawEventKind::KeyUp => {
                self.tracker.observe(raw.key_code, KeyEventKind::KeyUp);
                KeyEventKind::KeyUp
            }
            RawEventKind::ModifierToggle => self.tracker.apply_toggle_event(raw.key_code)?,
            RawEventKind::Other => return None,
        };

        // Never step backwards, whatever the clock implementation does
        let capture_timestamp_ms = now.max(self.last_timestamp_ms);
        self.last_timestamp_ms = capture_timestamp_ms;

        let modifiers = match raw.modifier_flags {
            Some(flags) => self.tracker.apply_level_event(flags),
            None => self.tracker.held(),
        };

        Some(KeyEventRecord {
            seq: 0,
            capture_timestamp_ms,
            source_timestamp_ms: raw.source_timestamp_ms,
            kind,
            key_code: raw.key_code,
            scan_code: raw.scan_code,
            character: self.resolver.resolve(raw.key_code, raw.scan_code),
            modifiers,
            is_repeat: raw.is_repeat && kind == KeyEventKind::KeyDown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::clock::ManualClock;
    use crate::keyboard::keymap::Keymap;
    use crate::keyboard::modifiers::ModifierSet;

    fn normalizer(keymap: Keymap, readings: Vec<f64>) -> EventNormalizer {
        EventNormalizer::new(
            Box::new(ManualClock::new(readings)),
            KeyNameResolver::table_only(keymap),
        )
    }

    #[test]
    fn press_and_release_of_a() {
        let mut norm = normalizer(Keymap::WindowsVirtual, vec![10.0, 20.0]);

        let down = norm.normalize(&RawKeyEvent::key_down(0x41).with_scan_code(30)).unwrap();
        let up = norm.normalize(&RawKeyEvent::key_up(0x41).with_scan_code(30)).unwrap();

        assert_eq!(down.kind, KeyEventKind::KeyDown);
        assert_eq!(down.capture_timestamp_ms, 10.0);
        assert_eq!(down.character.to_string(), "a");
        assert_eq!(down.scan_code, 30);
        assert_eq!(down.seq, 0);

        assert_eq!(up.kind, KeyEventKind::KeyUp);
        assert_eq!(up.capture_timestamp_ms, 20.0);
        assert_eq!(up.character.to_string(), "a");
    }

    #[test]
    fn other_events_are_ignored() {
        let mut norm = normalizer(Keymap::Evdev, vec![1.0]);
        assert!(norm.normalize(&RawKeyEvent::new(RawEventKind::Other, 30)).is_none());
    }

    #[test]
    fn toggles_alternate_and_out_of_range_toggles_drop() {
        let mut norm = normalizer(Keymap::MacVirtual, vec![1.0, 2.0, 3.0]);

        let first = norm.normalize(&RawKeyEvent::modifier_toggle(0x37)).unwrap();
        let second = norm.normalize(&RawKeyEvent::modifier_toggle(0x37)).unwrap();
        assert_eq!(first.kind, KeyEventKind::KeyDown);
        assert_eq!(second.kind, KeyEventKind::KeyUp);
        assert_eq!(first.character.to_string(), "cmd_l");

        assert!(norm.normalize(&RawKeyEvent::modifier_toggle(300)).is_none());
    }

    #[test]
    fn level_flags_take_precedence_over_tracked_state() {
        let mut norm = normalizer(Keymap::MacVirtual, vec![1.0, 2.0]);
        norm.normalize(&RawKeyEvent::modifier_toggle(0x38)).unwrap();

        // Flags report ctrl only; the tracker's shift is not consulted
        let record = norm
            .normalize(&RawKeyEvent::key_down(0x00).with_modifier_flags(0x0004_0000))
            .unwrap();
        assert_eq!(record.modifiers.to_string(), "ctrl");
    }

    #[test]
    fn explicit_modifier_edges_render_tracked_state() {
        let mut norm = normalizer(Keymap::Evdev, vec![1.0, 2.0, 3.0, 4.0]);

        let shift = norm.normalize(&RawKeyEvent::key_down(42)).unwrap();
        assert_eq!(shift.modifiers.to_string(), "shift");

        let a = norm.normalize(&RawKeyEvent::key_down(30)).unwrap();
        assert_eq!(a.modifiers.to_string(), "shift");

        norm.normalize(&RawKeyEvent::key_up(42)).unwrap();
        let a_up = norm.normalize(&RawKeyEvent::key_up(30)).unwrap();
        assert_eq!(a_up.modifiers, ModifierSet::NONE);
    }

    #[test]
    fn capture_timestamps_never_decrease() {
        let mut norm = normalizer(Keymap::Evdev, vec![5.0, 3.0, 7.0]);
        let stamps: Vec<f64> = (0..3)
            .filter_map(|_| norm.normalize(&RawKeyEvent::key_down(30)))
            .map(|r| r.capture_timestamp_ms)
            .collect();
        assert_eq!(stamps, vec![5.0, 5.0, 7.0]);
    }

    #[test]
    fn repeat_flag_only_on_presses() {
        let mut norm = normalizer(Keymap::Evdev, vec![1.0, 2.0]);
        let down = norm.normalize(&RawKeyEvent::key_down(30).with_repeat(true)).unwrap();
        let up = norm.normalize(&RawKeyEvent::key_up(30).with_repeat(true)).unwrap();
        assert!(down.is_repeat);
        assert!(!up.is_repeat);
    }

    #[test]
    fn source_timestamp_passes_through() {
        let mut norm = normalizer(Keymap::Evdev, vec![1.0]);
        let record = norm
            .normalize(&RawKeyEvent::key_down(30).with_source_timestamp(98765.4321))
            .unwrap();
        assert_eq!(record.source_timestamp_ms, 98765.4321);
    }

    #[test]
    fn repeated_release_without_press_is_tolerated() {
        let mut norm = normalizer(Keymap::Evdev, vec![1.0, 2.0]);
        assert!(norm.normalize(&RawKeyEvent::key_up(42)).is_some());
        assert!(norm.normalize(&RawKeyEvent::key_up(42)).is_some());
        assert!(norm.tracker().held().is_empty());
    }
}
