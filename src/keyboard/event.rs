//! Raw and canonical keyboard event types

use super::modifiers::ModifierSet;
use super::resolver::KeyToken;
use std::fmt;
use std::str::FromStr;

/// Kind of a canonical keyboard event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEventKind {
    /// Key was pressed down
    KeyDown,
    /// Key was released
    KeyUp,
}

impl KeyEventKind {
    /// Name used in the `event_type` CSV column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyDown => "key_down",
            Self::KeyUp => "key_up",
        }
    }
}

impl fmt::Display for KeyEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key_down" => Ok(Self::KeyDown),
            "key_up" => Ok(Self::KeyUp),
            other => Err(format!("unknown event type '{}'", other)),
        }
    }
}

/// Classification of a raw platform notification, before normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    /// Explicit key press (including auto-repeat presses)
    KeyDown,
    /// Explicit key release
    KeyUp,
    /// A modifier changed state with no explicit direction
    ModifierToggle,
    /// Anything else the capture source observed (mouse, system, ...)
    Other,
}

/// A keyboard notification exactly as a capture source received it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawKeyEvent {
    pub kind: RawEventKind,
    /// Platform key identifier (virtual key, keycode, evdev code)
    pub key_code: u32,
    /// Hardware scan code, 0 when the platform exposes none
    pub scan_code: u32,
    /// Level-reported modifier bits in the source keymap's layout.
    /// `None` means the platform does not report levels and the
    /// tracker's held set is used instead.
    pub modifier_flags: Option<u64>,
    /// Platform timestamp already converted to milliseconds
    pub source_timestamp_ms: f64,
    /// Platform explicitly reported the key as already held
    pub is_repeat: bool,
}

impl RawKeyEvent {
    pub fn new(kind: RawEventKind, key_code: u32) -> Self {
        Self {
            kind,
            key_code,
            scan_code: 0,
            modifier_flags: None,
            source_timestamp_ms: 0.0,
            is_repeat: false,
        }
    }

    pub fn key_down(key_code: u32) -> Self {
        Self::new(RawEventKind::KeyDown, key_code)
    }

    pub fn key_up(key_code: u32) -> Self {
        Self::new(RawEventKind::KeyUp, key_code)
    }

    pub fn modifier_toggle(key_code: u32) -> Self {
        Self::new(RawEventKind::ModifierToggle, key_code)
    }

    pub fn with_scan_code(mut self, scan_code: u32) -> Self {
        self.scan_code = scan_code;
        self
    }

    pub fn with_modifier_flags(mut self, flags: u64) -> Self {
        self.modifier_flags = Some(flags);
        self
    }

    pub fn with_source_timestamp(mut self, timestamp_ms: f64) -> Self {
        self.source_timestamp_ms = timestamp_ms;
        self
    }

    pub fn with_repeat(mut self, is_repeat: bool) -> Self {
        self.is_repeat = is_repeat;
        self
    }
}

/// One captured key event, immutable once it has been accepted into a
/// session buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEventRecord {
    /// 1-based sequence number, assigned by the buffer on acceptance
    pub seq: u64,
    /// Session clock reading when the event was observed
    pub capture_timestamp_ms: f64,
    /// Platform timestamp; epoch and resolution are platform-specific
    pub source_timestamp_ms: f64,
    pub kind: KeyEventKind,
    pub key_code: u32,
    pub scan_code: u32,
    pub character: KeyToken,
    pub modifiers: ModifierSet,
    pub is_repeat: bool,
}
