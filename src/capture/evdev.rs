//! Raw evdev capture for Linux
//!
//! Reads `input_event` records straight from every keyboard under
//! `/dev/input`. The kernel timestamps each event, reports auto-repeat as
//! value 2 and usually precedes a key event with an `MSC_SCAN` event
//! carrying the hardware scan code. Reading needs access to the device
//! nodes (root or membership of the `input` group).

use super::{CaptureError, CaptureSource};
use crate::keyboard::{Keymap, RawKeyEvent};
use crate::session::{CaptureMode, CaptureSession, EventSink};
use log::{info, warn};
use nix::libc;
use std::fs::{self, File};
use std::io::{self, Read};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// A raw input event from the kernel
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct InputEvent {
    tv_sec: i64,
    tv_usec: i64,
    event_type: u16,
    code: u16,
    value: i32,
}

const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_MSC: u16 = 0x04;
const MSC_SCAN: u16 = 0x04;
const INPUT_EVENT_SIZE: usize = std::mem::size_of::<InputEvent>();

/// Wake-up interval for checking the stop signal
const POLL_TIMEOUT_MS: i32 = 100;

impl InputEvent {
    fn timestamp_ms(&self) -> f64 {
        self.tv_sec as f64 * 1000.0 + self.tv_usec as f64 / 1000.0
    }

    /// Raw key event for an `EV_KEY` record.
    ///
    /// Value 0 is a release, 1 a press and 2 an auto-repeat press.
    fn to_raw(self, scan_code: u32) -> Option<RawKeyEvent> {
        let raw = match self.value {
            0 => RawKeyEvent::key_up(self.code as u32),
            1 => RawKeyEvent::key_down(self.code as u32),
            2 => RawKeyEvent::key_down(self.code as u32).with_repeat(true),
            _ => return None,
        };
        Some(
            raw.with_scan_code(scan_code)
                .with_source_timestamp(self.timestamp_ms()),
        )
    }
}

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, CaptureError> {
    let input_dir = Path::new("/dev/input");
    if !input_dir.exists() {
        return Err(CaptureError::Registration(
            "/dev/input does not exist".to_string(),
        ));
    }

    let mut keyboards: Vec<PathBuf> = fs::read_dir(input_dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("event"))
        })
        .filter(|path| is_keyboard_device(path))
        .collect();
    keyboards.sort();

    if keyboards.is_empty() {
        return Err(CaptureError::NoDevices);
    }
    Ok(keyboards)
}

/// Check if a device is a keyboard by examining /sys/class/input
fn is_keyboard_device(device_path: &Path) -> bool {
    let Some(name) = device_path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    // Key capability bitmap; a keyboard advertises far more than the few
    // keys of a power button or lid switch
    let caps_path = format!("/sys/class/input/{}/device/capabilities/key", name);
    if let Ok(caps) = fs::read_to_string(&caps_path) {
        let total_bits: u32 = caps
            .split_whitespace()
            .filter_map(|hex| u64::from_str_radix(hex, 16).ok())
            .map(|n| n.count_ones())
            .sum();
        return total_bits > 50;
    }

    let name_path = format!("/sys/class/input/{}/device/name", name);
    if let Ok(dev_name) = fs::read_to_string(&name_path) {
        let dev_name = dev_name.to_lowercase();
        return dev_name.contains("keyboard") || dev_name.contains("kbd");
    }
    false
}

struct Device {
    path: PathBuf,
    file: File,
    /// Scan code from the last `MSC_SCAN` of the current report
    pending_scan: u32,
}

/// Global capture from Linux input devices
pub struct EvdevSource {
    devices: Vec<Device>,
    buffer: Vec<u8>,
}

impl EvdevSource {
    /// Open every readable keyboard device
    pub fn open() -> Result<Self, CaptureError> {
        let mut devices = Vec::new();

        for path in find_keyboard_devices()? {
            match File::open(&path) {
                Ok(file) => {
                    let fd = file.as_raw_fd();
                    unsafe {
                        let flags = libc::fcntl(fd, libc::F_GETFL);
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                    devices.push(Device {
                        path,
                        file,
                        pending_scan: 0,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    warn!("Skipping {}: permission denied", path.display());
                }
                Err(e) => return Err(CaptureError::Io(e)),
            }
        }

        if devices.is_empty() {
            return Err(CaptureError::PermissionDenied(
                "cannot read any keyboard device; run with sudo or add the user to the 'input' group"
                    .to_string(),
            ));
        }

        Ok(Self {
            devices,
            buffer: vec![0u8; INPUT_EVENT_SIZE * 64],
        })
    }

    pub fn device_paths(&self) -> Vec<&Path> {
        self.devices.iter().map(|d| d.path.as_path()).collect()
    }

    /// Block until a device is readable or the timeout expires
    fn wait_readable(&self) -> Result<(), CaptureError> {
        let mut fds: Vec<libc::pollfd> = self
            .devices
            .iter()
            .map(|d| libc::pollfd {
                fd: d.file.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, POLL_TIMEOUT_MS) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            // A signal (the stop request) interrupting the wait is expected
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(CaptureError::Io(err));
            }
        }
        Ok(())
    }

    /// Drain all pending events from every device
    fn drain(&mut self, session: &mut CaptureSession) {
        let buffer = &mut self.buffer;
        self.devices.retain_mut(|device| loop {
            match device.file.read(buffer) {
                Ok(bytes_read) if bytes_read >= INPUT_EVENT_SIZE => {
                    for chunk in buffer[..bytes_read].chunks_exact(INPUT_EVENT_SIZE) {
                        let event: InputEvent =
                            unsafe { std::ptr::read_unaligned(chunk.as_ptr() as *const InputEvent) };
                        dispatch(device, event, session);
                    }
                }
                Ok(_) => return true,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return true,
                Err(e) => {
                    warn!("Dropping {}: {}", device.path.display(), e);
                    return false;
                }
            }
        });
    }
}

fn dispatch(device: &mut Device, event: InputEvent, session: &mut CaptureSession) {
    match event.event_type {
        EV_MSC if event.code == MSC_SCAN => device.pending_scan = event.value as u32,
        EV_KEY => {
            if let Some(raw) = event.to_raw(device.pending_scan) {
                session.deliver_key_event(raw);
            }
            device.pending_scan = 0;
        }
        EV_SYN => device.pending_scan = 0,
        _ => {}
    }
}

impl CaptureSource for EvdevSource {
    fn name(&self) -> &'static str {
        "evdev"
    }

    fn mode(&self) -> CaptureMode {
        CaptureMode::Terminal
    }

    fn keymap(&self) -> Keymap {
        Keymap::Evdev
    }

    fn run(&mut self, session: &mut CaptureSession) -> Result<(), CaptureError> {
        for path in self.device_paths() {
            info!("Listening on {}", path.display());
        }
        session.begin_capture()?;

        while !session.stop_requested() {
            self.wait_readable()?;
            self.drain(session);
            if self.devices.is_empty() {
                return Err(CaptureError::NoDevices);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(code: u16, value: i32) -> InputEvent {
        InputEvent {
            tv_sec: 12,
            tv_usec: 345_678,
            event_type: EV_KEY,
            code,
            value,
        }
    }

    #[test]
    fn kernel_timestamp_converts_to_ms() {
        assert!((key_event(30, 1).timestamp_ms() - 12_345.678).abs() < 1e-6);
    }

    #[test]
    fn key_values_map_to_kinds() {
        let down = key_event(30, 1).to_raw(0x70004).unwrap();
        assert_eq!(down.kind, crate::keyboard::RawEventKind::KeyDown);
        assert_eq!(down.key_code, 30);
        assert_eq!(down.scan_code, 0x70004);
        assert!(!down.is_repeat);

        let repeat = key_event(30, 2).to_raw(0).unwrap();
        assert!(repeat.is_repeat);

        let up = key_event(30, 0).to_raw(0).unwrap();
        assert_eq!(up.kind, crate::keyboard::RawEventKind::KeyUp);

        assert!(key_event(30, 7).to_raw(0).is_none());
    }

    #[test]
    fn input_event_layout_matches_kernel() {
        assert_eq!(INPUT_EVENT_SIZE, 24);
    }

    #[test]
    fn device_discovery_does_not_panic() {
        // Result depends on the machine and permissions
        let _ = find_keyboard_devices();
    }
}
