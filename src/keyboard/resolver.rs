//! Key name resolution
//!
//! Resolution order for a raw key:
//!
//! 1. the capture source's character probe (current keyboard layout),
//!    accepted only for printable ASCII
//! 2. the keymap's static table of named keys
//! 3. a hexadecimal fallback, `0x<code>`
//!
//! Resolution never fails and never allocates: [`KeyToken`] is a small
//! `Copy` value that renders itself on demand.

use super::keymap::Keymap;
use std::fmt;

/// Rendered key identity for the `character` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    /// A single printable ASCII character
    Char(char),
    /// A named key such as `space` or `shift_l`
    Named(&'static str),
    /// Unmapped key, rendered as `0x<code>`
    Hex(u32),
}

impl KeyToken {
    /// Token for a probed character, if it is printable ASCII.
    ///
    /// Space and comma get names so the CSV row stays unambiguous.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Self::Named("space")),
            ',' => Some(Self::Named("comma")),
            c if c.is_ascii_graphic() => Some(Self::Char(c)),
            _ => None,
        }
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{}", c),
            Self::Named(name) => f.write_str(name),
            Self::Hex(code) => write!(f, "0x{:02x}", code),
        }
    }
}

/// Best-effort translation of a raw key to a character under the current
/// keyboard layout
pub trait CharacterProbe {
    fn probe(&self, key_code: u32, scan_code: u32) -> Option<char>;
}

/// Probe for platforms without a layout translation API
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl CharacterProbe for NoProbe {
    fn probe(&self, _key_code: u32, _scan_code: u32) -> Option<char> {
        None
    }
}

/// Probe for key spaces whose codes are Unicode code points
/// ([`Keymap::Terminal`])
#[derive(Debug, Clone, Copy, Default)]
pub struct CodepointProbe;

impl CharacterProbe for CodepointProbe {
    fn probe(&self, key_code: u32, _scan_code: u32) -> Option<char> {
        char::from_u32(key_code)
    }
}

/// Maps raw key identifiers to display tokens
pub struct KeyNameResolver {
    keymap: Keymap,
    probe: Box<dyn CharacterProbe>,
}

impl KeyNameResolver {
    pub fn new(keymap: Keymap, probe: Box<dyn CharacterProbe>) -> Self {
        Self { keymap, probe }
    }

    /// Resolver that relies on the static table only
    pub fn table_only(keymap: Keymap) -> Self {
        Self::new(keymap, Box::new(NoProbe))
    }

    pub fn keymap(&self) -> Keymap {
        self.keymap
    }

    pub fn resolve(&self, key_code: u32, scan_code: u32) -> KeyToken {
        if let Some(token) = self
            .probe
            .probe(key_code, scan_code)
            .and_then(KeyToken::from_char)
        {
            return token;
        }
        match self.keymap.named_key(key_code) {
            Some(name) => KeyToken::Named(name),
            None => KeyToken::Hex(key_code),
        }
    }
}

impl fmt::Debug for KeyNameResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyNameResolver")
            .field("keymap", &self.keymap)
            .finish_non_exhaustive()
    }
}
