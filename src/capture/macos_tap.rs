//! macOS global capture through a listen-only Quartz event tap
//!
//! Needs the Input Monitoring permission. Modifier keys arrive as
//! `FlagsChanged` toggles; the session's tracker turns them into
//! alternating presses and releases.

use super::{CaptureError, CaptureSource};
use crate::keyboard::{Keymap, RawEventKind, RawKeyEvent};
use crate::session::{CaptureMode, CaptureSession, EventSink};
use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    EventField,
};
use foreign_types::ForeignType;
use log::{debug, info};
use std::cell::RefCell;
use std::ffi::c_void;
use std::time::Duration;

/// How long the run loop waits before re-checking for a stop request
const RUN_LOOP_SLICE: Duration = Duration::from_millis(250);

fn input_monitoring_granted() -> bool {
    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        fn CGPreflightListenEventAccess() -> bool;
    }
    unsafe { CGPreflightListenEventAccess() }
}

/// Event timestamp in milliseconds (mach absolute time, nanoseconds)
fn event_timestamp_ms(event: &CGEvent) -> f64 {
    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        fn CGEventGetTimestamp(event: *mut c_void) -> u64;
    }
    let nanos = unsafe { CGEventGetTimestamp(event.as_ptr() as *mut c_void) };
    nanos as f64 / 1_000_000.0
}

fn to_raw(event_type: CGEventType, event: &CGEvent) -> Option<RawKeyEvent> {
    let key_code = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u32;
    let raw = match event_type {
        CGEventType::KeyDown => RawKeyEvent::key_down(key_code).with_repeat(
            event.get_integer_value_field(EventField::KEYBOARD_EVENT_AUTOREPEAT) != 0,
        ),
        CGEventType::KeyUp => RawKeyEvent::key_up(key_code),
        CGEventType::FlagsChanged => RawKeyEvent::modifier_toggle(key_code),
        _ => return None,
    };
    Some(
        raw.with_source_timestamp(event_timestamp_ms(event))
            .with_modifier_flags(event.get_flags().bits()),
    )
}

pub struct TapSource;

impl TapSource {
    /// Fails when Input Monitoring has not been granted to this process
    pub fn new() -> Result<Self, CaptureError> {
        if !input_monitoring_granted() {
            return Err(CaptureError::PermissionDenied(
                "Input Monitoring is not granted; enable it in System Settings > Privacy & Security"
                    .to_string(),
            ));
        }
        Ok(Self)
    }
}

impl CaptureSource for TapSource {
    fn name(&self) -> &'static str {
        "tap"
    }

    fn mode(&self) -> CaptureMode {
        CaptureMode::Terminal
    }

    fn keymap(&self) -> Keymap {
        Keymap::MacVirtual
    }

    fn run(&mut self, session: &mut CaptureSession) -> Result<(), CaptureError> {
        let stop = session.stop_signal().clone();
        let cell = RefCell::new(session);

        let tap = CGEventTap::new(
            CGEventTapLocation::Session,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::ListenOnly,
            vec![
                CGEventType::KeyDown,
                CGEventType::KeyUp,
                CGEventType::FlagsChanged,
            ],
            |_proxy, event_type, event| {
                if let Some(raw) = to_raw(event_type, event) {
                    match cell.try_borrow_mut() {
                        Ok(mut session) => {
                            if raw.kind == RawEventKind::ModifierToggle {
                                session.deliver_modifier_event(raw);
                            } else {
                                session.deliver_key_event(raw);
                            }
                        }
                        Err(_) => debug!("Dropped re-entrant tap event"),
                    }
                }
                None
            },
        )
        .map_err(|_| {
            CaptureError::Registration(
                "failed to create event tap; check Input Monitoring permission".to_string(),
            )
        })?;

        let source = tap.mach_port.create_runloop_source(0).map_err(|_| {
            CaptureError::Registration("failed to create run loop source for event tap".to_string())
        })?;
        unsafe {
            CFRunLoop::get_current().add_source(&source, kCFRunLoopCommonModes);
        }
        tap.enable();

        cell.borrow_mut().begin_capture()?;
        info!("Event tap enabled");

        while !stop.is_requested() {
            let _ = CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, RUN_LOOP_SLICE, false);
        }

        unsafe {
            CFRunLoop::get_current().remove_source(&source, kCFRunLoopCommonModes);
        }
        Ok(())
    }
}
