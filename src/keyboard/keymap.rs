//! Per-platform key tables
//!
//! Raw key identifiers are not portable: a Windows virtual-key code, a macOS
//! virtual keycode and a Linux evdev code for the same physical key all
//! differ. Every capture source declares which [`Keymap`] its identifiers
//! belong to, and the resolver and modifier tracker look names and modifier
//! roles up through it.

use super::modifiers::{Modifier, ModifierMask};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Key identifier spaces understood by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keymap {
    /// Linux input-event codes (`KEY_*`)
    Evdev,
    /// macOS virtual keycodes (`kVK_*`)
    MacVirtual,
    /// Windows virtual-key codes (`VK_*`)
    WindowsVirtual,
    /// Terminal key codes: Unicode code points for characters, private-use
    /// code points for named keys (see [`terminal`])
    Terminal,
}

impl Keymap {
    /// Static token for a key, if the table names it
    pub fn named_key(&self, key_code: u32) -> Option<&'static str> {
        self.table().get(&key_code).copied()
    }

    /// Modifier role of a key, if it is one of shift/ctrl/alt/meta
    pub fn modifier_of(&self, key_code: u32) -> Option<Modifier> {
        match self {
            Self::Evdev => match key_code {
                42 | 54 => Some(Modifier::Shift),
                29 | 97 => Some(Modifier::Ctrl),
                56 | 100 => Some(Modifier::Alt),
                125 | 126 => Some(Modifier::Meta),
                _ => None,
            },
            Self::MacVirtual => match key_code {
                0x38 | 0x3C => Some(Modifier::Shift),
                0x3B | 0x3E => Some(Modifier::Ctrl),
                0x3A | 0x3D => Some(Modifier::Alt),
                0x37 | 0x36 => Some(Modifier::Meta),
                _ => None,
            },
            Self::WindowsVirtual => match key_code {
                0x10 | 0xA0 | 0xA1 => Some(Modifier::Shift),
                0x11 | 0xA2 | 0xA3 => Some(Modifier::Ctrl),
                0x12 | 0xA4 | 0xA5 => Some(Modifier::Alt),
                0x5B | 0x5C => Some(Modifier::Meta),
                _ => None,
            },
            Self::Terminal => match key_code {
                terminal::SHIFT_L | terminal::SHIFT_R => Some(Modifier::Shift),
                terminal::CTRL_L | terminal::CTRL_R => Some(Modifier::Ctrl),
                terminal::ALT_L | terminal::ALT_R => Some(Modifier::Alt),
                terminal::META_L | terminal::META_R => Some(Modifier::Meta),
                _ => None,
            },
        }
    }

    /// Bit layout of the level-reported modifier flags for this platform
    pub fn modifier_mask(&self) -> ModifierMask {
        match self {
            // CGEventFlags: maskShift, maskControl, maskAlternate, maskCommand
            Self::MacVirtual => ModifierMask::new(0x0002_0000, 0x0004_0000, 0x0008_0000, 0x0010_0000),
            // crossterm KeyModifiers: SHIFT, CONTROL, ALT, SUPER
            Self::Terminal => ModifierMask::new(0b0001, 0b0010, 0b0100, 0b1000),
            // Sources on these platforms compose canonical bits themselves
            Self::Evdev | Self::WindowsVirtual => ModifierMask::CANONICAL,
        }
    }

    /// Reverse lookup of a named key.
    ///
    /// In the terminal keymap a single-character name maps to its code point.
    pub fn code_for_name(&self, name: &str) -> Option<u32> {
        let name = name.trim().to_ascii_lowercase();
        if let Some(code) = self
            .table()
            .iter()
            .find(|(_, n)| **n == name)
            .map(|(code, _)| *code)
        {
            return Some(code);
        }
        let mut chars = name.chars();
        match (self, chars.next(), chars.next()) {
            (Self::Terminal, Some(c), None) => Some(c as u32),
            _ => None,
        }
    }

    fn table(&self) -> &'static HashMap<u32, &'static str> {
        match self {
            Self::Evdev => &EVDEV_KEYS,
            Self::MacVirtual => &MAC_KEYS,
            Self::WindowsVirtual => &WINDOWS_KEYS,
            Self::Terminal => &TERMINAL_KEYS,
        }
    }
}

/// Key codes for the terminal keymap.
///
/// Character keys use their Unicode code point; everything else lives in the
/// private-use area so it can never collide with a printable character.
pub mod terminal {
    const BASE: u32 = 0xE000;

    pub const ESCAPE: u32 = BASE;
    pub const RETURN: u32 = BASE + 1;
    pub const TAB: u32 = BASE + 2;
    pub const BACKTAB: u32 = BASE + 3;
    pub const BACKSPACE: u32 = BASE + 4;
    pub const DELETE: u32 = BASE + 5;
    pub const INSERT: u32 = BASE + 6;
    pub const HOME: u32 = BASE + 7;
    pub const END: u32 = BASE + 8;
    pub const PAGE_UP: u32 = BASE + 9;
    pub const PAGE_DOWN: u32 = BASE + 10;
    pub const LEFT: u32 = BASE + 11;
    pub const RIGHT: u32 = BASE + 12;
    pub const UP: u32 = BASE + 13;
    pub const DOWN: u32 = BASE + 14;
    pub const CAPS_LOCK: u32 = BASE + 15;
    pub const SHIFT_L: u32 = BASE + 16;
    pub const SHIFT_R: u32 = BASE + 17;
    pub const CTRL_L: u32 = BASE + 18;
    pub const CTRL_R: u32 = BASE + 19;
    pub const ALT_L: u32 = BASE + 20;
    pub const ALT_R: u32 = BASE + 21;
    pub const META_L: u32 = BASE + 22;
    pub const META_R: u32 = BASE + 23;
    /// F1 is `FUNCTION + 1`
    pub const FUNCTION: u32 = BASE + 0x100;
    /// Any key the terminal reports that has no code of its own
    pub const UNKNOWN: u32 = BASE + 0xFFF;
}

fn build(entries: &[(u32, &'static str)]) -> HashMap<u32, &'static str> {
    entries.iter().copied().collect()
}

const FUNCTION_NAMES: [&str; 12] = [
    "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12",
];

/// Linux evdev key codes, US layout
static EVDEV_KEYS: LazyLock<HashMap<u32, &'static str>> = LazyLock::new(|| {
    let mut map = build(&[
        (1, "escape"),
        (2, "1"), (3, "2"), (4, "3"), (5, "4"), (6, "5"),
        (7, "6"), (8, "7"), (9, "8"), (10, "9"), (11, "0"),
        (12, "-"), (13, "="), (14, "backspace"), (15, "tab"),
        (16, "q"), (17, "w"), (18, "e"), (19, "r"), (20, "t"),
        (21, "y"), (22, "u"), (23, "i"), (24, "o"), (25, "p"),
        (26, "["), (27, "]"), (28, "return"), (29, "ctrl_l"),
        (30, "a"), (31, "s"), (32, "d"), (33, "f"), (34, "g"),
        (35, "h"), (36, "j"), (37, "k"), (38, "l"),
        (39, ";"), (40, "'"), (41, "`"), (42, "shift_l"), (43, "\\"),
        (44, "z"), (45, "x"), (46, "c"), (47, "v"), (48, "b"),
        (49, "n"), (50, "m"), (51, "comma"), (52, "."), (53, "/"),
        (54, "shift_r"), (56, "alt_l"), (57, "space"), (58, "capslock"),
        (97, "ctrl_r"), (100, "alt_r"),
        (102, "home"), (103, "up"), (104, "pageup"), (105, "left"),
        (106, "right"), (107, "end"), (108, "down"), (109, "pagedown"),
        (110, "insert"), (111, "delete"),
        (125, "meta_l"), (126, "meta_r"), (127, "menu"),
    ]);
    // F1-F10 are contiguous, F11/F12 are not
    for (i, name) in FUNCTION_NAMES.iter().enumerate().take(10) {
        map.insert(59 + i as u32, *name);
    }
    map.insert(87, FUNCTION_NAMES[10]);
    map.insert(88, FUNCTION_NAMES[11]);
    map
});

/// macOS virtual keycodes (`kVK_ANSI_*` and layout-independent keys)
static MAC_KEYS: LazyLock<HashMap<u32, &'static str>> = LazyLock::new(|| {
    build(&[
        (0x00, "a"), (0x01, "s"), (0x02, "d"), (0x03, "f"), (0x04, "h"),
        (0x05, "g"), (0x06, "z"), (0x07, "x"), (0x08, "c"), (0x09, "v"),
        (0x0B, "b"), (0x0C, "q"), (0x0D, "w"), (0x0E, "e"), (0x0F, "r"),
        (0x10, "y"), (0x11, "t"), (0x12, "1"), (0x13, "2"), (0x14, "3"),
        (0x15, "4"), (0x16, "6"), (0x17, "5"), (0x18, "="), (0x19, "9"),
        (0x1A, "7"), (0x1B, "-"), (0x1C, "8"), (0x1D, "0"), (0x1E, "]"),
        (0x1F, "o"), (0x20, "u"), (0x21, "["), (0x22, "i"), (0x23, "p"),
        (0x24, "return"), (0x25, "l"), (0x26, "j"), (0x27, "'"), (0x28, "k"),
        (0x29, ";"), (0x2A, "\\"), (0x2B, "comma"), (0x2C, "/"), (0x2D, "n"),
        (0x2E, "m"), (0x2F, "."), (0x30, "tab"), (0x31, "space"), (0x32, "`"),
        (0x33, "backspace"), (0x35, "escape"),
        (0x36, "cmd_r"), (0x37, "cmd_l"), (0x38, "shift_l"), (0x39, "capslock"),
        (0x3A, "alt_l"), (0x3B, "ctrl_l"), (0x3C, "shift_r"), (0x3D, "alt_r"),
        (0x3E, "ctrl_r"), (0x3F, "fn"),
        (0x73, "home"), (0x74, "pageup"), (0x75, "delete"), (0x77, "end"),
        (0x79, "pagedown"), (0x7B, "left"), (0x7C, "right"), (0x7D, "down"),
        (0x7E, "up"),
    ])
});

/// Windows virtual-key codes
static WINDOWS_KEYS: LazyLock<HashMap<u32, &'static str>> = LazyLock::new(|| {
    let mut map = build(&[
        (0x08, "backspace"), (0x09, "tab"), (0x0D, "return"), (0x1B, "escape"),
        (0x20, "space"), (0x21, "pageup"), (0x22, "pagedown"), (0x23, "end"),
        (0x24, "home"), (0x25, "left"), (0x26, "up"), (0x27, "right"),
        (0x28, "down"), (0x2D, "insert"), (0x2E, "delete"), (0x14, "capslock"),
        (0x10, "shift"), (0x11, "ctrl"), (0x12, "alt"),
        (0xA0, "shift_l"), (0xA1, "shift_r"), (0xA2, "ctrl_l"), (0xA3, "ctrl_r"),
        (0xA4, "alt_l"), (0xA5, "alt_r"), (0x5B, "win_l"), (0x5C, "win_r"),
        (0x5D, "menu"),
    ]);
    // Digits and letters share their ASCII values; used when the layout
    // probe produced nothing printable
    const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
    const LETTERS: [&str; 26] = [
        "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m",
        "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z",
    ];
    for (i, digit) in DIGITS.iter().enumerate() {
        map.insert(0x30 + i as u32, *digit);
    }
    for (i, letter) in LETTERS.iter().enumerate() {
        map.insert(0x41 + i as u32, *letter);
    }
    for (i, name) in FUNCTION_NAMES.iter().enumerate() {
        map.insert(0x70 + i as u32, *name);
    }
    map
});

static TERMINAL_KEYS: LazyLock<HashMap<u32, &'static str>> = LazyLock::new(|| {
    use terminal::*;
    let mut map = build(&[
        (' ' as u32, "space"),
        (ESCAPE, "escape"), (RETURN, "return"), (TAB, "tab"), (BACKTAB, "backtab"),
        (BACKSPACE, "backspace"), (DELETE, "delete"), (INSERT, "insert"),
        (HOME, "home"), (END, "end"), (PAGE_UP, "pageup"), (PAGE_DOWN, "pagedown"),
        (LEFT, "left"), (RIGHT, "right"), (UP, "up"), (DOWN, "down"),
        (CAPS_LOCK, "capslock"),
        (SHIFT_L, "shift_l"), (SHIFT_R, "shift_r"), (CTRL_L, "ctrl_l"), (CTRL_R, "ctrl_r"),
        (ALT_L, "alt_l"), (ALT_R, "alt_r"), (META_L, "meta_l"), (META_R, "meta_r"),
    ]);
    for (i, name) in FUNCTION_NAMES.iter().enumerate() {
        map.insert(FUNCTION + 1 + i as u32, *name);
    }
    map
});
