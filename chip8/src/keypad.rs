//! Keypad input latch.
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::*;

/// Input hooks the interpreter consults while stepping.
///
/// Owned by the caller and handed to each [`crate::prelude::Chip8Vm::step`].
pub trait KeyInput {
    /// Take the most recently pressed key, clearing the latch.
    fn take_pending(&mut self) -> Option<KeyCode>;

    /// Checks immediately whether the given key is currently held down.
    fn is_held(&self, key: KeyCode) -> bool;
}

/// Single threaded keypad state.
///
/// A key press both latches the key as pending, for the wait instruction,
/// and marks it as held, for the skip instructions.
#[derive(Debug, Default, Clone)]
pub struct Keypad {
    /// Last key pressed that was not yet consumed. Last write wins.
    pending: Option<KeyCode>,
    /// Pressed is a 1 bit, released is a 0 bit.
    held: u16,
}

impl Keypad {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn on_key_down(&mut self, key: KeyCode) {
        self.pending = Some(key);
        self.held |= 1 << key.as_u8();
    }

    /// Releases the key. A pending press is kept.
    pub fn on_key_up(&mut self, key: KeyCode) {
        self.held &= !(1 << key.as_u8());
    }

    /// Convenience for drivers that map host events to a pressed flag.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.on_key_down(key)
        } else {
            self.on_key_up(key)
        }
    }

    pub fn pending(&self) -> Option<KeyCode> {
        self.pending
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_held(&self) -> bool {
        self.held > 0
    }

    /// Iterate the keys currently held down, in ascending order.
    pub fn iter_held(&self) -> impl Iterator<Item = KeyCode> + '_ {
        (0..KEY_COUNT)
            .filter_map(|k| KeyCode::try_from(k).ok())
            .filter(|k| self.is_held(*k))
    }

    /// Release every key and drop the pending press.
    pub fn clear(&mut self) {
        self.pending = None;
        self.held = 0;
    }
}

impl KeyInput for Keypad {
    fn take_pending(&mut self) -> Option<KeyCode> {
        self.pending.take()
    }

    #[inline]
    fn is_held(&self, key: KeyCode) -> bool {
        self.held & (1 << key.as_u8()) != 0
    }
}

/// Keypad handle that can be shared between threads.
///
/// For drivers where a UI thread receives key events while
/// another thread steps the interpreter.
#[derive(Debug, Default, Clone)]
pub struct SharedKeypad(Arc<Mutex<Keypad>>);

impl SharedKeypad {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn on_key_down(&self, key: KeyCode) {
        self.lock().on_key_down(key)
    }

    pub fn on_key_up(&self, key: KeyCode) {
        self.lock().on_key_up(key)
    }

    /// A poisoned lock only means another thread panicked mid update.
    /// The keypad state is two plain integers, so it is still usable.
    fn lock(&self) -> MutexGuard<'_, Keypad> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyInput for SharedKeypad {
    fn take_pending(&mut self) -> Option<KeyCode> {
        self.lock().take_pending()
    }

    fn is_held(&self, key: KeyCode) -> bool {
        self.lock().is_held(key)
    }
}

/// The 16 keys of the COSMAC VIP hex keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    const ALL: [KeyCode; KEY_COUNT as usize] = [
        Self::Key0,
        Self::Key1,
        Self::Key2,
        Self::Key3,
        Self::Key4,
        Self::Key5,
        Self::Key6,
        Self::Key7,
        Self::Key8,
        Self::Key9,
        Self::KeyA,
        Self::KeyB,
        Self::KeyC,
        Self::KeyD,
        Self::KeyE,
        Self::KeyF,
    ];

    #[inline(always)]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Key named by the low nibble of a register value.
    #[inline(always)]
    pub fn from_nibble(value: u8) -> Self {
        Self::ALL[(value & 0xF) as usize]
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(key_id as usize)
            .copied()
            .ok_or(InvalidKeyCode)
    }
}

#[derive(Debug)]
pub struct InvalidKeyCode;

impl std::error::Error for InvalidKeyCode {}

impl std::fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "keycode must be in range 0 <= keycode < 16")
    }
}

#[cfg(feature = "serde")]
mod de {
    use std::fmt::Display;

    use serde::de::{Deserialize, Error, Expected, Unexpected, Visitor};

    use super::*;

    impl Expected for InvalidKeyCode {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            <Self as Display>::fmt(self, f)
        }
    }

    impl<'de> Deserialize<'de> for KeyCode {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(KeyCodeVisitor)
        }
    }

    /// Accepts integers `0..16`, or hex digit strings such as `"a"`, `"0xA"` or `"kA"`.
    struct KeyCodeVisitor;

    impl<'de> Visitor<'de> for KeyCodeVisitor {
        type Value = KeyCode;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "an integer between 0 and 15, or a hex digit")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            u8::try_from(v)
                .ok()
                .and_then(|k| KeyCode::try_from(k).ok())
                .ok_or_else(|| E::invalid_value(Unexpected::Unsigned(v), &InvalidKeyCode))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            u8::try_from(v)
                .ok()
                .and_then(|k| KeyCode::try_from(k).ok())
                .ok_or_else(|| E::invalid_value(Unexpected::Signed(v), &InvalidKeyCode))
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            let digits = v.trim();
            let digits = digits
                .strip_prefix("0x")
                .or_else(|| digits.strip_prefix('k'))
                .unwrap_or(digits);

            u8::from_str_radix(digits, 16)
                .ok()
                .and_then(|k| KeyCode::try_from(k).ok())
                .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &InvalidKeyCode))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut keypad = Keypad::new();

        keypad.on_key_down(KeyCode::Key0);
        assert_eq!(keypad.held, 0b00000000_00000001);
        assert!(keypad.is_held(KeyCode::Key0));
        assert!(!keypad.is_held(KeyCode::Key1));
        assert!(!keypad.is_held(KeyCode::Key7));

        keypad.on_key_down(KeyCode::Key7);
        assert_eq!(keypad.held, 0b00000000_10000001);

        keypad.on_key_up(KeyCode::Key0);
        assert_eq!(keypad.held, 0b00000000_10000000);
        assert!(!keypad.is_held(KeyCode::Key0));
        assert!(keypad.is_held(KeyCode::Key7));

        keypad.set_key(KeyCode::KeyF, true);
        assert_eq!(keypad.held, 0b10000000_10000000);
        assert_eq!(
            keypad.iter_held().collect::<Vec<_>>(),
            vec![KeyCode::Key7, KeyCode::KeyF]
        );
    }

    #[test]
    fn test_pending_last_write_wins() {
        let mut keypad = Keypad::new();
        assert_eq!(keypad.take_pending(), None);

        keypad.on_key_down(KeyCode::Key3);
        keypad.on_key_down(KeyCode::KeyB);
        keypad.on_key_up(KeyCode::KeyB);

        // Releasing does not cancel the pending press.
        assert_eq!(keypad.take_pending(), Some(KeyCode::KeyB));
        assert_eq!(keypad.take_pending(), None);
        assert!(keypad.is_held(KeyCode::Key3));
    }

    #[test]
    fn test_shared_keypad() {
        let mut shared = SharedKeypad::new();
        let remote = shared.clone();

        std::thread::spawn(move || remote.on_key_down(KeyCode::Key9))
            .join()
            .unwrap();

        assert!(shared.is_held(KeyCode::Key9));
        assert_eq!(shared.take_pending(), Some(KeyCode::Key9));
        assert_eq!(shared.take_pending(), None);

        shared.on_key_up(KeyCode::Key9);
        assert!(!shared.is_held(KeyCode::Key9));
    }

    #[test]
    fn test_keycode_conversion() {
        assert_eq!(KeyCode::try_from(0xA).unwrap(), KeyCode::KeyA);
        assert!(KeyCode::try_from(16).is_err());
        assert_eq!(KeyCode::from_nibble(0x3C), KeyCode::KeyC);
        assert_eq!(u8::from(KeyCode::KeyE), 0xE);
        assert_eq!(KeyCode::KeyD.to_string(), "kd");
    }
}
