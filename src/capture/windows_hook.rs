//! Windows global capture through a `WH_KEYBOARD_LL` hook
//!
//! The hook procedure runs on this thread while it pumps messages, so the
//! session is reached through a thread-local pointer that is only set for
//! the duration of [`HookSource::run`]. A stop request posts `WM_QUIT` to
//! end the message loop.
//!
//! The low-level hook does not say whether a press is an auto-repeat; every
//! event is recorded with `is_repeat = 0`.

use super::{CaptureError, CaptureSource};
use crate::keyboard::{CharacterProbe, Keymap, ModifierMask, RawKeyEvent};
use crate::session::{CaptureMode, CaptureSession, EventSink};
use log::info;
use std::cell::Cell;
use std::ptr;
use windows::Win32::Foundation::{HMODULE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, GetKeyboardLayout, GetKeyboardState, ToUnicodeEx, VIRTUAL_KEY, VK_CONTROL,
    VK_LWIN, VK_MENU, VK_RWIN, VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
    TranslateMessage, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, MSG, WH_KEYBOARD_LL,
    WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

thread_local! {
    static ACTIVE_SESSION: Cell<*mut CaptureSession> = const { Cell::new(ptr::null_mut()) };
}

/// `ToUnicodeEx` flag: leave the keyboard's dead-key state untouched
const TO_UNICODE_NO_STATE_CHANGE: u32 = 0x4;

fn key_held(vk: VIRTUAL_KEY) -> bool {
    unsafe { (GetAsyncKeyState(vk.0 as i32) as u16 & 0x8000) != 0 }
}

/// Current modifier levels in canonical bit layout
fn async_modifier_flags() -> u64 {
    let mask = ModifierMask::CANONICAL;
    let mut flags = 0;
    if key_held(VK_SHIFT) {
        flags |= mask.shift;
    }
    if key_held(VK_CONTROL) {
        flags |= mask.ctrl;
    }
    if key_held(VK_MENU) {
        flags |= mask.alt;
    }
    if key_held(VK_LWIN) || key_held(VK_RWIN) {
        flags |= mask.meta;
    }
    flags
}

/// Raw event for one hook notification, without modifier levels.
///
/// The hook data has no repeat bit, so presses are never marked as repeats.
fn hook_raw_event(message: u32, data: &KBDLLHOOKSTRUCT) -> Option<RawKeyEvent> {
    let raw = match message {
        WM_KEYDOWN | WM_SYSKEYDOWN => RawKeyEvent::key_down(data.vkCode),
        WM_KEYUP | WM_SYSKEYUP => RawKeyEvent::key_up(data.vkCode),
        _ => return None,
    };
    // `time` is the GetTickCount clock, milliseconds at ~15ms resolution
    Some(
        raw.with_scan_code(data.scanCode)
            .with_source_timestamp(data.time as f64),
    )
}

/// Interpret a `GetMessageW` return: `true` to dispatch, `false` on `WM_QUIT`
fn pump_continues(status: i32) -> Result<bool, CaptureError> {
    match status {
        -1 => Err(CaptureError::Registration(format!(
            "GetMessageW failed: {}",
            std::io::Error::last_os_error()
        ))),
        0 => Ok(false),
        _ => Ok(true),
    }
}

unsafe extern "system" fn keyboard_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == 0 {
        let data = *(lparam.0 as *const KBDLLHOOKSTRUCT);
        if let Some(raw) = hook_raw_event(wparam.0 as u32, &data) {
            let raw = raw.with_modifier_flags(async_modifier_flags());
            ACTIVE_SESSION.with(|active| {
                let session = active.get();
                if !session.is_null() {
                    (*session).deliver_key_event(raw);
                }
            });
        }
    }
    CallNextHookEx(HHOOK(0), code, wparam, lparam)
}

/// Character under the active keyboard layout via `ToUnicodeEx`
pub struct LayoutProbe;

impl CharacterProbe for LayoutProbe {
    fn probe(&self, key_code: u32, scan_code: u32) -> Option<char> {
        unsafe {
            let mut key_state = [0u8; 256];
            GetKeyboardState(&mut key_state).ok()?;
            let layout = GetKeyboardLayout(0);
            let mut buffer = [0u16; 8];
            let written = ToUnicodeEx(
                key_code,
                scan_code,
                &key_state,
                &mut buffer,
                TO_UNICODE_NO_STATE_CHANGE,
                layout,
            );
            if written != 1 {
                return None;
            }
            char::from_u32(buffer[0] as u32)
        }
    }
}

pub struct HookSource;

impl HookSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HookSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for HookSource {
    fn name(&self) -> &'static str {
        "hook"
    }

    fn mode(&self) -> CaptureMode {
        CaptureMode::Terminal
    }

    fn keymap(&self) -> Keymap {
        Keymap::WindowsVirtual
    }

    fn probe(&self) -> Box<dyn CharacterProbe> {
        Box::new(LayoutProbe)
    }

    fn run(&mut self, session: &mut CaptureSession) -> Result<(), CaptureError> {
        let hook = unsafe {
            let module = GetModuleHandleW(None).unwrap_or(HMODULE::default());
            SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), module, 0)
        }
        .map_err(|e| CaptureError::Registration(format!("SetWindowsHookExW failed: {}", e)))?;

        if let Err(e) = session.begin_capture() {
            unsafe {
                let _ = UnhookWindowsHookEx(hook);
            }
            return Err(e.into());
        }
        info!("Keyboard hook installed");

        let stop = session.stop_signal().clone();
        let thread_id = unsafe { GetCurrentThreadId() };
        stop.set_waker(move || unsafe {
            let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        });

        ACTIVE_SESSION.with(|active| active.set(session as *mut CaptureSession));
        let pumped = unsafe {
            let mut msg = MSG::default();
            loop {
                match pump_continues(GetMessageW(&mut msg, HWND(0), 0, 0).0) {
                    Ok(true) => {
                        TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                        if stop.is_requested() {
                            break Ok(());
                        }
                    }
                    Ok(false) => break Ok(()),
                    Err(e) => break Err(e),
                }
            }
        };
        ACTIVE_SESSION.with(|active| active.set(ptr::null_mut()));

        stop.clear_waker();
        unsafe {
            let _ = UnhookWindowsHookEx(hook);
        }
        pumped
    }
}
