//! Frame clock for drivers.
use std::{
    thread,
    time::{Duration, Instant},
};

/// Timer to synchronize a driver thread with the software clock of the virtual machine.
///
/// It is designed to work with the yielding cooperative pattern
/// of the interpreter loop. When the VM yields control back to the
/// caller, time elapses until it is resumed. Once the interpreter
/// is resumed, the elapsed time is taken into account when determining
/// the next cycle.
pub struct Clock {
    start: Instant,
    interval: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(interval: impl Into<Duration>) -> Self {
        Self {
            start: Instant::now(),
            interval: interval.into(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Check whether a full interval has elapsed, without blocking.
    ///
    /// Resets the clock when it has.
    pub fn tick(&mut self) -> bool {
        if self.start.elapsed() >= self.interval {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        loop {
            let elapsed = self.start.elapsed();
            if elapsed < self.interval {
                // Sleep does not have enough resolution for short intervals,
                // so only sleep off the bulk and yield for the remainder.
                let remaining = self.interval - elapsed;
                if remaining > Duration::from_millis(2) {
                    thread::sleep(remaining - Duration::from_millis(1));
                } else {
                    thread::yield_now();
                }
            } else {
                // Reset back to zero, rather than trying to catch up.
                //
                // If the VM was paused for debugging, and a large
                // amount of time has elapsed until it is resumed,
                // it should simply continue at the next cycle running
                // at its usual speed.
                self.reset();
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Hz;

    #[test]
    fn test_zero_interval_never_blocks() {
        let mut clock = Clock::new(Hz(0));
        assert!(clock.tick());
        clock.wait();
    }

    #[test]
    fn test_wait_elapses_interval() {
        let mut clock = Clock::new(Duration::from_millis(5));
        assert!(!clock.tick());

        let start = Instant::now();
        clock.wait();
        assert!(start.elapsed() >= Duration::from_millis(4));
    }
}
