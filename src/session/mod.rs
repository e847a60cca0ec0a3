//! Capture sessions
//!
//! A [`CaptureSession`] owns everything mutated while capturing: the
//! normalizer (with its modifier tracker), the event buffer and the
//! lifecycle state. Capture sources feed it through [`EventSink`] on the
//! thread that runs their event loop. The only thing shared with other
//! threads is the [`StopSignal`], which a signal handler may raise; the
//! flush itself runs in [`CaptureSession::finish`] after the capture loop
//! has returned.

pub mod buffer;
pub mod metadata;
pub mod state;

pub use buffer::{EventBuffer, DEFAULT_CAPACITY};
pub use metadata::{platform_identifier, CaptureMode, SessionMetadata};
pub use state::{InvalidTransition, SessionState};

use crate::keyboard::{EventNormalizer, KeyEventRecord, RawEventKind, RawKeyEvent};
use crate::report::{CsvWriter, ReportError};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("failed to flush session: {0}")]
    Flush(#[from] ReportError),
}

type Waker = Box<dyn Fn() + Send>;

/// Cross-thread request to end a capture loop.
///
/// Raising the signal only sets a flag and, if the running capture source
/// installed one, calls its waker to unblock the loop (for example by
/// posting a quit message). It never touches session state.
#[derive(Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
    waker: Arc<Mutex<Option<Waker>>>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(waker) = self.waker.lock() {
            if let Some(wake) = waker.as_ref() {
                wake();
            }
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Install the function that unblocks the current capture loop.
    ///
    /// If a stop was already requested the waker runs immediately.
    pub fn set_waker<F>(&self, wake: F)
    where
        F: Fn() + Send + 'static,
    {
        if let Ok(mut waker) = self.waker.lock() {
            *waker = Some(Box::new(wake));
            if self.is_requested() {
                if let Some(wake) = waker.as_ref() {
                    wake();
                }
            }
        }
    }

    pub fn clear_waker(&self) {
        if let Ok(mut waker) = self.waker.lock() {
            *waker = None;
        }
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("requested", &self.is_requested())
            .finish_non_exhaustive()
    }
}

/// Capability a capture source uses to hand raw events to the session
pub trait EventSink {
    /// Deliver an explicit press or release. Returns the assigned `seq`
    /// if the event was recorded.
    fn deliver_key_event(&mut self, raw: RawKeyEvent) -> Option<u64>;

    /// Deliver a modifier change that carries no direction
    fn deliver_modifier_event(&mut self, raw: RawKeyEvent) -> Option<u64>;

    /// Ask the capture loop to stop (stop key, window closed)
    fn request_stop(&self);
}

/// Outcome of a flushed session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub events: usize,
    pub dropped: u64,
    pub capacity: usize,
    pub mode: CaptureMode,
    pub clock_source: String,
    /// Capture timestamp of the last recorded event
    pub last_event_ms: f64,
    pub output: PathBuf,
}

impl SessionSummary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One capture session, from registration to flush
pub struct CaptureSession {
    state: SessionState,
    metadata: SessionMetadata,
    normalizer: EventNormalizer,
    buffer: EventBuffer,
    stop: StopSignal,
}

impl CaptureSession {
    /// Session starting now; the clock name comes from the normalizer
    pub fn new(
        mode: CaptureMode,
        normalizer: EventNormalizer,
        capacity: usize,
        stop: StopSignal,
    ) -> Self {
        let metadata = SessionMetadata::new(mode, normalizer.clock_name());
        Self::with_metadata(metadata, normalizer, capacity, stop)
    }

    pub fn with_metadata(
        metadata: SessionMetadata,
        normalizer: EventNormalizer,
        capacity: usize,
        stop: StopSignal,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            metadata,
            normalizer,
            buffer: EventBuffer::new(capacity),
            stop,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_requested()
    }

    /// Called by a capture source once it is registered and about to
    /// deliver events
    pub fn begin_capture(&mut self) -> Result<(), SessionError> {
        self.state.advance(SessionState::Capturing)?;
        info!(
            "Capturing ({} mode, clock {})",
            self.metadata.mode, self.metadata.clock_source
        );
        Ok(())
    }

    fn ingest(&mut self, raw: RawKeyEvent) -> Option<u64> {
        if self.state != SessionState::Capturing {
            return None;
        }
        let record = self.normalizer.normalize(&raw)?;
        let seq = self.buffer.append(record)?;
        log_progress(seq, &record);
        Some(seq)
    }

    pub fn summary(&self, output: &Path) -> SessionSummary {
        SessionSummary {
            events: self.buffer.len(),
            dropped: self.buffer.dropped(),
            capacity: self.buffer.capacity(),
            mode: self.metadata.mode,
            clock_source: self.metadata.clock_source.clone(),
            last_event_ms: self
                .buffer
                .last()
                .map(|r| r.capture_timestamp_ms)
                .unwrap_or(0.0),
            output: output.to_path_buf(),
        }
    }

    /// Stop capturing and write the session to `path`.
    ///
    /// Consumes the session, so the output is written at most once. Must be
    /// called after the capture loop has returned.
    pub fn finish(mut self, path: &Path) -> Result<SessionSummary, SessionError> {
        self.state.advance(SessionState::Stopping)?;
        let summary = self.summary(path);

        if summary.dropped > 0 {
            warn!(
                "{} events were dropped after the buffer reached {} records",
                summary.dropped, summary.capacity
            );
        }

        let result = CsvWriter::write(path, &self.metadata, self.buffer.snapshot());
        self.state.advance(SessionState::Flushed)?;
        result?;

        debug!("Flushed session to {}", path.display());
        Ok(summary)
    }
}

impl EventSink for CaptureSession {
    fn deliver_key_event(&mut self, raw: RawKeyEvent) -> Option<u64> {
        self.ingest(raw)
    }

    fn deliver_modifier_event(&mut self, raw: RawKeyEvent) -> Option<u64> {
        self.ingest(RawKeyEvent {
            kind: RawEventKind::ModifierToggle,
            ..raw
        })
    }

    fn request_stop(&self) {
        self.stop.request();
    }
}

fn log_progress(seq: u64, record: &KeyEventRecord) {
    debug!(
        "[{}] {} {} (keycode={}) t={:.3}ms",
        seq, record.kind, record.character, record.key_code, record.capture_timestamp_ms
    );
}
