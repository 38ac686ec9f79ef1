//! Scripted keypad input.
//!
//! A headless run has no keyboard, so key presses are replayed from a YAML
//! timeline keyed by frame number:
//!
//! ```yaml
//! - frame: 30
//!   key: 5
//! - frame: 34
//!   key: 5
//!   pressed: false
//! - frame: 60
//!   key: "A"
//! ```
use std::{collections::VecDeque, io::Read};

use chip8::{KeyCode, Keypad};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyEvent {
    /// Frame at which the event is delivered, counted from 0.
    pub frame: u64,
    pub key: KeyCode,
    /// Key down when `true`, key up when `false`.
    #[serde(default = "default_pressed")]
    pub pressed: bool,
}

fn default_pressed() -> bool {
    true
}

/// Key events in frame order, drained as the driver advances.
#[derive(Debug, Default)]
pub struct InputScript {
    events: VecDeque<KeyEvent>,
}

impl InputScript {
    pub fn from_reader(reader: impl Read) -> Result<Self, AppError> {
        let mut events: Vec<KeyEvent> = serde_yaml::from_reader(reader)?;
        log::debug!("loaded {} input events", events.len());

        // Stable sort keeps the file order of events on the same frame.
        events.sort_by_key(|ev| ev.frame);

        Ok(Self {
            events: events.into(),
        })
    }

    pub fn from_file(filepath: &str) -> Result<Self, AppError> {
        let file = std::fs::File::open(filepath)?;
        Self::from_reader(file)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Deliver every event scheduled up to and including `frame` into the keypad.
    pub fn apply(&mut self, frame: u64, keypad: &mut Keypad) -> usize {
        let mut count = 0;

        while let Some(event) = self.events.front() {
            if event.frame > frame {
                break;
            }
            log::trace!(
                "frame {frame}: {} {}",
                event.key,
                if event.pressed { "down" } else { "up" }
            );
            keypad.set_key(event.key, event.pressed);
            self.events.pop_front();
            count += 1;
        }

        count
    }
}

#[cfg(test)]
mod test {
    use chip8::KeyInput;

    use super::*;

    const SCRIPT: &str = r#"
- frame: 4
  key: 5
  pressed: false
- frame: 2
  key: 5
- frame: 4
  key: "0xA"
"#;

    #[test]
    fn test_parse() {
        let script = InputScript::from_reader(SCRIPT.as_bytes()).unwrap();
        let events: Vec<_> = script.events.iter().cloned().collect();

        assert_eq!(
            events,
            vec![
                KeyEvent { frame: 2, key: KeyCode::Key5, pressed: true },
                KeyEvent { frame: 4, key: KeyCode::Key5, pressed: false },
                KeyEvent { frame: 4, key: KeyCode::KeyA, pressed: true },
            ]
        );
    }

    #[test]
    fn test_apply_by_frame() {
        let mut script = InputScript::from_reader(SCRIPT.as_bytes()).unwrap();
        let mut keypad = Keypad::new();

        assert_eq!(script.apply(1, &mut keypad), 0);
        assert_eq!(script.apply(2, &mut keypad), 1);
        assert!(keypad.is_held(KeyCode::Key5));

        assert_eq!(script.apply(10, &mut keypad), 2);
        assert!(!keypad.is_held(KeyCode::Key5));
        assert!(keypad.is_held(KeyCode::KeyA));
        assert_eq!(keypad.take_pending(), Some(KeyCode::KeyA));
        assert!(script.is_empty());
    }

    #[test]
    fn test_invalid_key() {
        let err = InputScript::from_reader("- frame: 1\n  key: 16\n".as_bytes()).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::Script(_)));
    }
}
