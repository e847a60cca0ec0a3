//! Polled global capture
//!
//! Samples the global key state with `device_query` and turns differences
//! between samples into press and release events. Works wherever
//! `device_query` does (X11, Windows, macOS with Input Monitoring), at the
//! cost of timing quantised to the poll interval and no repeat or scan code
//! information.

use super::{CaptureError, CaptureSource};
use crate::keyboard::{Keymap, RawKeyEvent};
use crate::session::{CaptureMode, CaptureSession, EventSink};
use device_query::{DeviceQuery, DeviceState, Keycode};
use log::info;
use std::thread;
use std::time::Duration;

pub struct PollSource {
    interval: Duration,
    last_keys: Vec<Keycode>,
}

impl PollSource {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_keys: Vec::new(),
        }
    }

    /// Emit press events for keys that appeared and release events for keys
    /// that disappeared since the previous sample
    fn diff(&mut self, current_keys: Vec<Keycode>, session: &mut CaptureSession) {
        for key in &current_keys {
            if !self.last_keys.contains(key) {
                session.deliver_key_event(RawKeyEvent::key_down(evdev_code(*key)));
            }
        }
        for key in &self.last_keys {
            if !current_keys.contains(key) {
                session.deliver_key_event(RawKeyEvent::key_up(evdev_code(*key)));
            }
        }
        self.last_keys = current_keys;
    }
}

impl CaptureSource for PollSource {
    fn name(&self) -> &'static str {
        "poll"
    }

    fn mode(&self) -> CaptureMode {
        CaptureMode::Terminal
    }

    fn keymap(&self) -> Keymap {
        Keymap::Evdev
    }

    fn run(&mut self, session: &mut CaptureSession) -> Result<(), CaptureError> {
        let device_state = DeviceState::new();
        // Keys already held at start are not reported as presses
        self.last_keys = device_state.get_keys();
        session.begin_capture()?;
        info!("Polling key state every {}us", self.interval.as_micros());

        while !session.stop_requested() {
            let keys = device_state.get_keys();
            self.diff(keys, session);
            thread::sleep(self.interval);
        }
        Ok(())
    }
}

/// Linux evdev code for a `device_query` key, 0 when unmapped
pub fn evdev_code(keycode: Keycode) -> u32 {
    use Keycode as DK;
    match keycode {
        DK::Escape => 1,
        DK::Key1 => 2,
        DK::Key2 => 3,
        DK::Key3 => 4,
        DK::Key4 => 5,
        DK::Key5 => 6,
        DK::Key6 => 7,
        DK::Key7 => 8,
        DK::Key8 => 9,
        DK::Key9 => 10,
        DK::Key0 => 11,
        DK::Minus => 12,
        DK::Equal => 13,
        DK::Backspace => 14,
        DK::Tab => 15,
        DK::Q => 16,
        DK::W => 17,
        DK::E => 18,
        DK::R => 19,
        DK::T => 20,
        DK::Y => 21,
        DK::U => 22,
        DK::I => 23,
        DK::O => 24,
        DK::P => 25,
        DK::LeftBracket => 26,
        DK::RightBracket => 27,
        DK::Enter => 28,
        DK::LControl => 29,
        DK::A => 30,
        DK::S => 31,
        DK::D => 32,
        DK::F => 33,
        DK::G => 34,
        DK::H => 35,
        DK::J => 36,
        DK::K => 37,
        DK::L => 38,
        DK::Semicolon => 39,
        DK::Apostrophe => 40,
        DK::Grave => 41,
        DK::LShift => 42,
        DK::BackSlash => 43,
        DK::Z => 44,
        DK::X => 45,
        DK::C => 46,
        DK::V => 47,
        DK::B => 48,
        DK::N => 49,
        DK::M => 50,
        DK::Comma => 51,
        DK::Dot => 52,
        DK::Slash => 53,
        DK::RShift => 54,
        DK::NumpadMultiply => 55,
        DK::LAlt => 56,
        DK::Space => 57,
        DK::CapsLock => 58,
        DK::F1 => 59,
        DK::F2 => 60,
        DK::F3 => 61,
        DK::F4 => 62,
        DK::F5 => 63,
        DK::F6 => 64,
        DK::F7 => 65,
        DK::F8 => 66,
        DK::F9 => 67,
        DK::F10 => 68,
        DK::Numpad7 => 71,
        DK::Numpad8 => 72,
        DK::Numpad9 => 73,
        DK::NumpadSubtract => 74,
        DK::Numpad4 => 75,
        DK::Numpad5 => 76,
        DK::Numpad6 => 77,
        DK::NumpadAdd => 78,
        DK::Numpad1 => 79,
        DK::Numpad2 => 80,
        DK::Numpad3 => 81,
        DK::Numpad0 => 82,
        DK::F11 => 87,
        DK::F12 => 88,
        DK::RControl => 97,
        DK::NumpadDivide => 98,
        DK::RAlt => 100,
        DK::Home => 102,
        DK::Up => 103,
        DK::PageUp => 104,
        DK::Left => 105,
        DK::Right => 106,
        DK::End => 107,
        DK::Down => 108,
        DK::PageDown => 109,
        DK::Insert => 110,
        DK::Delete => 111,
        DK::LMeta => 125,
        DK::RMeta => 126,
        _ => 0,
    }
}
