//! Keyboard event types, key tables and event normalization

pub mod clock;
pub mod event;
pub mod keymap;
pub mod modifiers;
pub mod normalizer;
pub mod resolver;

pub use clock::{platform_clock_name, ClockSource, ManualClock, MonotonicClock};
pub use event::{KeyEventKind, KeyEventRecord, RawEventKind, RawKeyEvent};
pub use keymap::Keymap;
pub use modifiers::{Modifier, ModifierMask, ModifierSet, ModifierTracker};
pub use normalizer::EventNormalizer;
pub use resolver::{CharacterProbe, CodepointProbe, KeyNameResolver, KeyToken, NoProbe};
