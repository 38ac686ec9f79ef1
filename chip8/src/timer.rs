//! Delay and sound timers.

/// Two independent countdown registers, decremented at 60Hz by the driver.
#[derive(Debug, Default, Clone)]
pub struct Timers {
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline(always)]
    pub fn delay(&self) -> u8 {
        self.delay
    }

    #[inline(always)]
    pub fn sound(&self) -> u8 {
        self.sound
    }

    /// Buzzer should be on while the sound timer counts down.
    #[inline(always)]
    pub fn is_buzzing(&self) -> bool {
        self.sound > 0
    }

    /// Count both timers down by one, stopping at zero.
    #[inline]
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tick_stops_at_zero() {
        let mut timers = Timers { delay: 5, sound: 2 };

        for _ in 0..5 {
            timers.tick();
        }
        assert_eq!(timers.delay(), 0);
        assert_eq!(timers.sound(), 0);

        timers.tick();
        assert_eq!(timers.delay(), 0);
        assert!(!timers.is_buzzing());
    }

    #[test]
    fn test_independent() {
        let mut timers = Timers { delay: 0, sound: 3 };
        assert!(timers.is_buzzing());

        timers.tick();
        assert_eq!(timers.delay(), 0);
        assert_eq!(timers.sound(), 2);
        assert!(timers.is_buzzing());
    }
}
