//! Modifier state tracking
//!
//! Platforms report modifiers in one of three ways:
//!
//! - **Level**: every event carries a bitmask of the modifiers held at that
//!   instant (macOS `CGEventFlags`, terminal key modifiers). No state needs
//!   to persist between events.
//! - **Toggle**: a modifier change arrives as a single "flags changed"
//!   notification with no direction. The tracker remembers which key ids it
//!   believes are held and alternates press/release per key id.
//! - **Explicit**: modifier keys produce ordinary press/release events
//!   (evdev, polled capture). The tracker follows those edges.

use super::event::KeyEventKind;
use super::keymap::Keymap;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Key ids at or above this value are never tracked by toggle events
pub const MAX_TRACKED_KEY: u32 = 256;

/// Canonical modifier roles, in rendering order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Shift,
    Ctrl,
    Alt,
    /// Command on macOS, Windows key on Windows, Super/Meta elsewhere
    Meta,
}

impl Modifier {
    pub const ALL: [Modifier; 4] = [Self::Shift, Self::Ctrl, Self::Alt, Self::Meta];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Shift => "shift",
            Self::Ctrl => "ctrl",
            Self::Alt => "alt",
            Self::Meta => "meta",
        }
    }

    fn bit(&self) -> u8 {
        match self {
            Self::Shift => 0b0001,
            Self::Ctrl => 0b0010,
            Self::Alt => 0b0100,
            Self::Meta => 0b1000,
        }
    }
}

/// A set of held modifiers.
///
/// Renders as the held names joined by `+` in the fixed order
/// shift, ctrl, alt, meta, or `none` when empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierSet(u8);

impl ModifierSet {
    pub const NONE: ModifierSet = ModifierSet(0);

    pub fn insert(&mut self, modifier: Modifier) {
        self.0 |= modifier.bit();
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        self.insert(modifier);
        self
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Modifier> + '_ {
        Modifier::ALL.into_iter().filter(|m| self.contains(*m))
    }

    /// Canonical bit layout (shift=1, ctrl=2, alt=4, meta=8)
    pub fn bits(&self) -> u64 {
        self.0 as u64
    }
}

impl FromIterator<Modifier> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut set = Self::NONE;
        for modifier in iter {
            set.insert(modifier);
        }
        set
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        for (i, modifier) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            f.write_str(modifier.name())?;
        }
        Ok(())
    }
}

impl FromStr for ModifierSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "none" {
            return Ok(Self::NONE);
        }
        let mut set = Self::NONE;
        let mut last: Option<Modifier> = None;
        for part in s.split('+') {
            let modifier = Modifier::ALL
                .into_iter()
                .find(|m| m.name() == part)
                .ok_or_else(|| format!("unknown modifier '{}'", part))?;
            if last.is_some_and(|prev| prev >= modifier) {
                return Err(format!("modifiers out of order in '{}'", s));
            }
            set.insert(modifier);
            last = Some(modifier);
        }
        Ok(set)
    }
}

/// Bit positions of shift/ctrl/alt/meta in a platform's flag word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierMask {
    pub shift: u64,
    pub ctrl: u64,
    pub alt: u64,
    pub meta: u64,
}

impl ModifierMask {
    /// Layout matching [`ModifierSet::bits`]
    pub const CANONICAL: ModifierMask = ModifierMask::new(0b0001, 0b0010, 0b0100, 0b1000);

    pub const fn new(shift: u64, ctrl: u64, alt: u64, meta: u64) -> Self {
        Self { shift, ctrl, alt, meta }
    }

    pub fn decode(&self, flags: u64) -> ModifierSet {
        let mut set = ModifierSet::NONE;
        for (mask, modifier) in [
            (self.shift, Modifier::Shift),
            (self.ctrl, Modifier::Ctrl),
            (self.alt, Modifier::Alt),
            (self.meta, Modifier::Meta),
        ] {
            if flags & mask != 0 {
                set.insert(modifier);
            }
        }
        set
    }
}

/// Tracks which modifier keys are held during one capture session.
///
/// Created fresh per session; never shared between sessions.
#[derive(Debug, Clone)]
pub struct ModifierTracker {
    keymap: Keymap,
    /// Held key ids and their modifier role (toggle keys such as caps lock
    /// are tracked with no role)
    held: HashMap<u32, Option<Modifier>>,
}

impl ModifierTracker {
    pub fn new(keymap: Keymap) -> Self {
        Self {
            keymap,
            held: HashMap::new(),
        }
    }

    pub fn keymap(&self) -> Keymap {
        self.keymap
    }

    /// Modifiers encoded in a level-reported flag word.
    ///
    /// Stateless: the tracker's held set is neither consulted nor changed.
    pub fn apply_level_event(&self, flags: u64) -> ModifierSet {
        self.keymap.modifier_mask().decode(flags)
    }

    /// Resolve a direction-less modifier notification.
    ///
    /// A key id currently marked held is released, otherwise it is pressed.
    /// Returns `None` for key ids outside the tracked range; those
    /// notifications resolve to neither kind.
    ///
    /// A stream that starts while a modifier is already physically held
    /// reports that modifier's first release as a press.
    pub fn apply_toggle_event(&mut self, key_id: u32) -> Option<KeyEventKind> {
        if key_id >= MAX_TRACKED_KEY {
            return None;
        }
        if self.held.remove(&key_id).is_some() {
            Some(KeyEventKind::KeyUp)
        } else {
            self.held.insert(key_id, self.keymap.modifier_of(key_id));
            Some(KeyEventKind::KeyDown)
        }
    }

    /// Follow an explicit press/release edge. Non-modifier keys are ignored.
    pub fn observe(&mut self, key_id: u32, kind: KeyEventKind) {
        let Some(modifier) = self.keymap.modifier_of(key_id) else {
            return;
        };
        match kind {
            KeyEventKind::KeyDown => {
                self.held.insert(key_id, Some(modifier));
            }
            KeyEventKind::KeyUp => {
                self.held.remove(&key_id);
            }
        }
    }

    pub fn is_held(&self, key_id: u32) -> bool {
        self.held.contains_key(&key_id)
    }

    /// Modifiers currently held according to tracked state
    pub fn held(&self) -> ModifierSet {
        self.held.values().flatten().copied().collect()
    }

    /// Canonical modifier string for the tracked state
    pub fn render(&self) -> String {
        self.held().to_string()
    }

    pub fn reset(&mut self) {
        self.held.clear();
    }
}
