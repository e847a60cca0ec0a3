//! Owned-window capture in the terminal
//!
//! Takes over the terminal (raw mode, alternate screen) and records every
//! key the terminal reports. Press, release and repeat events need a
//! terminal that speaks the kitty keyboard protocol. The Windows console
//! reports presses and releases but no repeat flag, so a press of a key that
//! is still held is recorded as a repeat. Elsewhere only presses are
//! available. Terminals carry no event timestamp, so `event_timestamp_ms` is
//! always 0.

use super::{CaptureError, CaptureSource};
use crate::config::{Config, Theme};
use crate::keyboard::keymap::terminal as keys;
use crate::keyboard::{CharacterProbe, CodepointProbe, Keymap, RawKeyEvent};
use crate::session::{CaptureMode, CaptureSession, EventSink};
use crate::ui::{self, CaptureView, ThemeColors};
use crossterm::{
    event::{
        self, Event, KeyCode as CtKeyCode, KeyEvent as CtKeyEvent, KeyEventKind as CtKeyEventKind,
        KeyModifiers, KeyboardEnhancementFlags, ModifierKeyCode, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use log::warn;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::HashSet;
use std::io::{self, stdout, Stdout};
use std::time::{Duration, Instant};

/// Terminal key code for a crossterm key
pub fn key_code_of(code: CtKeyCode) -> u32 {
    match code {
        CtKeyCode::Char(c) => c as u32,
        CtKeyCode::Esc => keys::ESCAPE,
        CtKeyCode::Enter => keys::RETURN,
        CtKeyCode::Tab => keys::TAB,
        CtKeyCode::BackTab => keys::BACKTAB,
        CtKeyCode::Backspace => keys::BACKSPACE,
        CtKeyCode::Delete => keys::DELETE,
        CtKeyCode::Insert => keys::INSERT,
        CtKeyCode::Home => keys::HOME,
        CtKeyCode::End => keys::END,
        CtKeyCode::PageUp => keys::PAGE_UP,
        CtKeyCode::PageDown => keys::PAGE_DOWN,
        CtKeyCode::Left => keys::LEFT,
        CtKeyCode::Right => keys::RIGHT,
        CtKeyCode::Up => keys::UP,
        CtKeyCode::Down => keys::DOWN,
        CtKeyCode::CapsLock => keys::CAPS_LOCK,
        CtKeyCode::F(n) => keys::FUNCTION + n as u32,
        CtKeyCode::Modifier(modifier) => match modifier {
            ModifierKeyCode::LeftShift => keys::SHIFT_L,
            ModifierKeyCode::RightShift => keys::SHIFT_R,
            ModifierKeyCode::LeftControl => keys::CTRL_L,
            ModifierKeyCode::RightControl => keys::CTRL_R,
            ModifierKeyCode::LeftAlt => keys::ALT_L,
            ModifierKeyCode::RightAlt => keys::ALT_R,
            ModifierKeyCode::LeftSuper | ModifierKeyCode::LeftMeta => keys::META_L,
            ModifierKeyCode::RightSuper | ModifierKeyCode::RightMeta => keys::META_R,
            _ => keys::UNKNOWN,
        },
        _ => keys::UNKNOWN,
    }
}

/// Raw event for a crossterm key event, with level modifier flags
pub fn to_raw(key: &CtKeyEvent) -> RawKeyEvent {
    let code = key_code_of(key.code);
    let raw = match key.kind {
        CtKeyEventKind::Press => RawKeyEvent::key_down(code),
        CtKeyEventKind::Repeat => RawKeyEvent::key_down(code).with_repeat(true),
        CtKeyEventKind::Release => RawKeyEvent::key_up(code),
    };
    let levels = key.modifiers
        & (KeyModifiers::SHIFT | KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
    raw.with_modifier_flags(levels.bits() as u64)
}

fn is_interrupt(key: &CtKeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, CtKeyCode::Char('c') | CtKeyCode::Char('C'))
}

/// Terminal in capture mode; restored on drop
struct CaptureTerminal {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    enhanced: bool,
}

impl CaptureTerminal {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let mut screen = Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout))?,
            enhanced: false,
        };

        if matches!(supports_keyboard_enhancement(), Ok(true)) {
            execute!(
                screen.terminal.backend_mut(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )?;
            screen.enhanced = true;
        }
        Ok(screen)
    }

    fn reports_releases(&self) -> bool {
        self.enhanced || cfg!(target_os = "windows")
    }

    /// Releases arrive but repeats are not marked
    fn infers_repeats(&self) -> bool {
        self.reports_releases() && !self.enhanced
    }
}

impl Drop for CaptureTerminal {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(self.terminal.backend_mut(), PopKeyboardEnhancementFlags);
        }
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Capture from an owned terminal window
pub struct WindowSource {
    stop_key: u32,
    stop_key_name: String,
    refresh: Duration,
    theme: Theme,
    /// Mark a press of an already-held key as a repeat
    infer_repeats: bool,
    held: HashSet<u32>,
}

impl WindowSource {
    pub fn new(config: &Config) -> Self {
        let stop_key = Keymap::Terminal
            .code_for_name(&config.capture.stop_key)
            .unwrap_or_else(|| {
                warn!(
                    "Unknown stop key '{}', using escape",
                    config.capture.stop_key
                );
                keys::ESCAPE
            });
        Self {
            stop_key,
            stop_key_name: Keymap::Terminal
                .named_key(stop_key)
                .map(str::to_string)
                .unwrap_or_else(|| config.capture.stop_key.clone()),
            refresh: config.refresh_interval(),
            theme: config.ui.theme,
            infer_repeats: false,
            held: HashSet::new(),
        }
    }

    /// Route one terminal key event. The stop key and Ctrl+C end the
    /// session and are not recorded.
    fn handle_key(&mut self, key: &CtKeyEvent, session: &mut CaptureSession) {
        let mut raw = to_raw(key);
        if key.kind == CtKeyEventKind::Press && (raw.key_code == self.stop_key || is_interrupt(key)) {
            session.request_stop();
            return;
        }
        match key.kind {
            CtKeyEventKind::Press => {
                let newly_held = self.held.insert(raw.key_code);
                if self.infer_repeats && !newly_held {
                    raw = raw.with_repeat(true);
                }
            }
            CtKeyEventKind::Release => {
                self.held.remove(&raw.key_code);
            }
            CtKeyEventKind::Repeat => {}
        }
        session.deliver_key_event(raw);
    }
}

impl CaptureSource for WindowSource {
    fn name(&self) -> &'static str {
        "window"
    }

    fn mode(&self) -> CaptureMode {
        CaptureMode::Gui
    }

    fn keymap(&self) -> Keymap {
        Keymap::Terminal
    }

    fn probe(&self) -> Box<dyn CharacterProbe> {
        Box::new(CodepointProbe)
    }

    fn run(&mut self, session: &mut CaptureSession) -> Result<(), CaptureError> {
        let mut screen = CaptureTerminal::enter()
            .map_err(|e| CaptureError::Registration(format!("cannot open terminal window: {}", e)))?;
        session.begin_capture()?;
        self.infer_repeats = screen.infers_repeats();
        self.held.clear();

        let message = if screen.reports_releases() {
            None
        } else {
            warn!("Terminal does not report key releases; only key_down events are recorded");
            Some("terminal reports presses only")
        };
        let colors = ThemeColors::from_theme(self.theme);
        let started = Instant::now();
        let mut last_draw: Option<Instant> = None;

        while !session.stop_requested() {
            if last_draw.map_or(true, |t| t.elapsed() >= self.refresh) {
                let view = CaptureView {
                    session: &*session,
                    source: self.name(),
                    stop_key: &self.stop_key_name,
                    elapsed: started.elapsed(),
                    message,
                    colors,
                };
                screen.terminal.draw(|frame| ui::draw(frame, &view))?;
                last_draw = Some(Instant::now());
            }

            if event::poll(self.refresh)? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(&key, session),
                    Event::Resize(..) => last_draw = None,
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
