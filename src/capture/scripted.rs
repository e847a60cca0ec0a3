//! Replay of a fixed sequence of raw events
//!
//! Used for dry runs and for exercising the whole pipeline without a
//! keyboard. Paired with a [`ManualClock`](crate::keyboard::ManualClock)
//! the resulting session is fully deterministic.

use super::{CaptureError, CaptureSource};
use crate::keyboard::{CharacterProbe, CodepointProbe, Keymap, NoProbe, RawKeyEvent};
use crate::session::{CaptureMode, CaptureSession, EventSink};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptStep {
    /// Explicit press or release
    Key(RawKeyEvent),
    /// Direction-less modifier change
    Modifier(RawKeyEvent),
    /// Raise the session's stop signal, as a stop key or closed window would
    Stop,
}

#[derive(Debug, Clone)]
pub struct ScriptedSource {
    keymap: Keymap,
    mode: CaptureMode,
    steps: Vec<ScriptStep>,
    registration_error: Option<String>,
}

impl ScriptedSource {
    pub fn new(keymap: Keymap, mode: CaptureMode) -> Self {
        Self {
            keymap,
            mode,
            steps: Vec::new(),
            registration_error: None,
        }
    }

    /// Source whose registration fails with `message`
    pub fn failing(keymap: Keymap, mode: CaptureMode, message: &str) -> Self {
        Self {
            registration_error: Some(message.to_string()),
            ..Self::new(keymap, mode)
        }
    }

    pub fn key(mut self, raw: RawKeyEvent) -> Self {
        self.steps.push(ScriptStep::Key(raw));
        self
    }

    pub fn modifier(mut self, raw: RawKeyEvent) -> Self {
        self.steps.push(ScriptStep::Modifier(raw));
        self
    }

    pub fn stop(mut self) -> Self {
        self.steps.push(ScriptStep::Stop);
        self
    }
}

impl CaptureSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn mode(&self) -> CaptureMode {
        self.mode
    }

    fn keymap(&self) -> Keymap {
        self.keymap
    }

    fn probe(&self) -> Box<dyn CharacterProbe> {
        match self.keymap {
            Keymap::Terminal => Box::new(CodepointProbe),
            _ => Box::new(NoProbe),
        }
    }

    fn run(&mut self, session: &mut CaptureSession) -> Result<(), CaptureError> {
        if let Some(message) = &self.registration_error {
            return Err(CaptureError::Registration(message.clone()));
        }
        session.begin_capture()?;

        for step in &self.steps {
            if session.stop_requested() {
                break;
            }
            match *step {
                ScriptStep::Key(raw) => {
                    session.deliver_key_event(raw);
                }
                ScriptStep::Modifier(raw) => {
                    session.deliver_modifier_event(raw);
                }
                ScriptStep::Stop => session.request_stop(),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{EventNormalizer, KeyNameResolver, ManualClock};
    use crate::session::{SessionState, StopSignal};

    fn session_for(source: &ScriptedSource) -> CaptureSession {
        let normalizer = EventNormalizer::new(
            Box::new(ManualClock::new(vec![1.0, 2.0, 3.0, 4.0])),
            KeyNameResolver::new(source.keymap(), source.probe()),
        );
        CaptureSession::new(source.mode(), normalizer, 100, StopSignal::new())
    }

    #[test]
    fn replays_until_stop_step() {
        let mut source = ScriptedSource::new(Keymap::Evdev, CaptureMode::Terminal)
            .key(RawKeyEvent::key_down(30))
            .stop()
            .key(RawKeyEvent::key_up(30));
        let mut session = session_for(&source);

        source.run(&mut session).unwrap();
        assert_eq!(session.buffer().len(), 1);
        assert!(session.stop_requested());
        assert_eq!(session.state(), SessionState::Capturing);
    }

    #[test]
    fn failed_registration_leaves_session_idle() {
        let mut source = ScriptedSource::failing(Keymap::Evdev, CaptureMode::Terminal, "denied");
        let mut session = session_for(&source);

        let err = source.run(&mut session).unwrap_err();
        assert!(matches!(err, CaptureError::Registration(_)));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn terminal_keymap_probes_code_points() {
        let mut source = ScriptedSource::new(Keymap::Terminal, CaptureMode::Gui)
            .key(RawKeyEvent::key_down('Z' as u32));
        let mut session = session_for(&source);

        source.run(&mut session).unwrap();
        assert_eq!(session.buffer().snapshot()[0].character.to_string(), "Z");
    }
}
