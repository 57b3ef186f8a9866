//! CPU Clock.
use std::{
    thread,
    time::{Duration, Instant},
};

const NANOS_IN_SECOND: u64 = 1_000_000_000;

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(transparent)]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Timer to synchronize the driving loop with the software clock of the virtual CPU.
///
/// Time spent outside the VM between two cycles is taken into account
/// when determining the next cycle.
pub struct Clock {
    start: Instant,
    cycle_time: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(frequency: Hz) -> Self {
        Self {
            start: Instant::now(),
            cycle_time: frequency.into(),
        }
    }

    /// A clock that never blocks.
    pub fn is_unthrottled(&self) -> bool {
        self.cycle_time.is_zero()
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        if self.is_unthrottled() {
            return;
        }

        loop {
            if self.start.elapsed() < self.cycle_time {
                // Sleep does not have enough resolution, and causes
                // the clock to run at 30 FPS.
                //
                // Spinning a loop causes high CPU usage and fan madness.
                //
                // Yielding in a loop is the best alternative.
                thread::yield_now();
            } else {
                // Reset back to zero, rather than trying to catch up.
                self.reset();
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clock_hz() {
        let interval: Duration = Hz(60).into();
        assert_eq!(interval.as_millis(), 16);

        let interval: Duration = Hz(0).into();
        assert!(interval.is_zero());
    }

    #[test]
    fn test_clock_wait() {
        let mut clock = Clock::new(Hz(1000));
        assert!(!clock.is_unthrottled());

        let start = Instant::now();
        clock.wait();
        clock.wait();
        assert!(start.elapsed() >= Duration::from_millis(2));
    }

    #[test]
    fn test_unthrottled_clock() {
        let mut clock = Clock::new(Hz(0));
        assert!(clock.is_unthrottled());
        clock.wait();
    }
}
