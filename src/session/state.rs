//! Session lifecycle: `Idle -> Capturing -> Stopping -> Flushed`

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, capture source not yet registered
    Idle,
    /// Capture source registered and delivering events
    Capturing,
    /// Capture loop has returned; no more events can arrive
    Stopping,
    /// Output written (or the write failed). Terminal.
    Flushed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid session transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub to: SessionState,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Stopping => "stopping",
            Self::Flushed => "flushed",
        }
    }

    fn allows(&self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Capturing)
                | (Self::Capturing, Self::Stopping)
                | (Self::Stopping, Self::Flushed)
        )
    }

    /// Move to `next`, or fail if the lifecycle does not allow it
    pub fn advance(&mut self, next: SessionState) -> Result<(), InvalidTransition> {
        if !self.allows(next) {
            return Err(InvalidTransition { from: *self, to: next });
        }
        *self = next;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        *self == Self::Flushed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
