//! Capture sources
//!
//! A capture source registers with the platform, then runs its event loop
//! on the calling thread and hands every raw keyboard notification to the
//! session through [`EventSink`](crate::session::EventSink). It returns once
//! the session's stop signal has been raised; the caller flushes afterwards.

#[cfg(target_os = "linux")]
pub mod evdev;
#[cfg(target_os = "macos")]
pub mod macos_tap;
pub mod poll;
pub mod scripted;
pub mod terminal;
#[cfg(target_os = "windows")]
pub mod windows_hook;

pub use scripted::ScriptedSource;

use crate::config::Config;
use crate::keyboard::{CharacterProbe, Keymap, NoProbe};
use crate::session::{CaptureMode, CaptureSession, SessionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("no keyboard devices found")]
    NoDevices,
    #[error("failed to register capture: {0}")]
    Registration(String),
    #[error("capture source '{0}' is not available on this platform")]
    Unsupported(SourceKind),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A platform event source feeding a capture session
pub trait CaptureSource {
    fn name(&self) -> &'static str;

    /// Capture context this source provides
    fn mode(&self) -> CaptureMode;

    /// Key identifier space of the raw events this source delivers
    fn keymap(&self) -> Keymap;

    /// Layout-aware character translation for this source's keys
    fn probe(&self) -> Box<dyn CharacterProbe> {
        Box::new(NoProbe)
    }

    /// Register with the platform and deliver events until a stop is
    /// requested.
    ///
    /// Implementations call [`CaptureSession::begin_capture`] once
    /// registration has succeeded. An error returned before that point means
    /// the session never started.
    fn run(&mut self, session: &mut CaptureSession) -> Result<(), CaptureError>;
}

/// Which capture source to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Platform default for the requested mode
    #[default]
    Auto,
    /// Linux `/dev/input` devices
    Evdev,
    /// Polled key state via `device_query`
    Poll,
    /// Windows low-level keyboard hook
    Hook,
    /// macOS event tap
    Tap,
    /// Owned terminal window
    Window,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Evdev => "evdev",
            Self::Poll => "poll",
            Self::Hook => "hook",
            Self::Tap => "tap",
            Self::Window => "window",
        }
    }

    /// Replace `Auto` with the platform default for `mode`
    pub fn resolve(self, mode: CaptureMode) -> SourceKind {
        match (self, mode) {
            (Self::Auto, CaptureMode::Gui) => Self::Window,
            (Self::Auto, CaptureMode::Terminal) => Self::platform_global(),
            (kind, _) => kind,
        }
    }

    fn platform_global() -> SourceKind {
        if cfg!(target_os = "linux") {
            Self::Evdev
        } else if cfg!(target_os = "windows") {
            Self::Hook
        } else if cfg!(target_os = "macos") {
            Self::Tap
        } else {
            Self::Poll
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "evdev" => Ok(Self::Evdev),
            "poll" => Ok(Self::Poll),
            "hook" => Ok(Self::Hook),
            "tap" => Ok(Self::Tap),
            "window" => Ok(Self::Window),
            other => Err(format!("unknown capture source '{}'", other)),
        }
    }
}

/// Construct the source for `kind` (after [`SourceKind::resolve`]).
///
/// Sources that need device access or OS permissions check for it here, so
/// a failure happens before a session is created.
pub fn open_source(kind: SourceKind, config: &Config) -> Result<Box<dyn CaptureSource>, CaptureError> {
    match kind {
        SourceKind::Window => Ok(Box::new(terminal::WindowSource::new(config))),
        SourceKind::Poll => Ok(Box::new(poll::PollSource::new(config.poll_interval()))),
        #[cfg(target_os = "linux")]
        SourceKind::Evdev => Ok(Box::new(evdev::EvdevSource::open()?)),
        #[cfg(target_os = "windows")]
        SourceKind::Hook => Ok(Box::new(windows_hook::HookSource::new())),
        #[cfg(target_os = "macos")]
        SourceKind::Tap => Ok(Box::new(macos_tap::TapSource::new()?)),
        other => Err(CaptureError::Unsupported(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_resolves_by_mode() {
        assert_eq!(SourceKind::Auto.resolve(CaptureMode::Gui), SourceKind::Window);
        let global = SourceKind::Auto.resolve(CaptureMode::Terminal);
        assert_ne!(global, SourceKind::Auto);
        assert_ne!(global, SourceKind::Window);
    }

    #[test]
    fn explicit_kind_is_kept() {
        assert_eq!(SourceKind::Poll.resolve(CaptureMode::Gui), SourceKind::Poll);
        assert_eq!(SourceKind::Window.resolve(CaptureMode::Terminal), SourceKind::Window);
    }

    #[test]
    fn source_kind_parses() {
        assert_eq!("EVDEV".parse::<SourceKind>(), Ok(SourceKind::Evdev));
        assert_eq!("window".parse::<SourceKind>(), Ok(SourceKind::Window));
        assert!("x11".parse::<SourceKind>().is_err());
    }

    #[test]
    fn unsupported_sources_are_reported() {
        #[cfg(not(target_os = "windows"))]
        assert!(matches!(
            open_source(SourceKind::Hook, &Config::default()),
            Err(CaptureError::Unsupported(SourceKind::Hook))
        ));
        assert!(matches!(
            open_source(SourceKind::Auto, &Config::default()),
            Err(CaptureError::Unsupported(SourceKind::Auto))
        ));
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            CaptureError::Unsupported(SourceKind::Tap).to_string(),
            "capture source 'tap' is not available on this platform"
        );
        assert_eq!(CaptureError::NoDevices.to_string(), "no keyboard devices found");
    }
}
