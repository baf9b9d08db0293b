//! An injectable clock.
//!
//! The engine never runs timers or reads wall-clock time on its own; the
//! host advances this clock from its event loop, and tests set it directly.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Shared monotonic time source.
///
/// Clones share the same underlying time.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    time: Rc<Cell<Duration>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(time: Duration) -> Self {
        Self {
            time: Rc::new(Cell::new(time)),
        }
    }

    pub fn now(&self) -> Duration {
        self.time.get()
    }

    /// Sets the time. Time never moves backwards; earlier values are ignored.
    pub fn set_time(&self, time: Duration) {
        if time > self.time.get() {
            self.time.set(time);
        }
    }

    pub fn advance(&self, by: Duration) {
        self.time.set(self.time.get() + by);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = Clock::with_time(Duration::from_millis(10));
        let other = clock.clone();
        other.advance(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(15));
    }

    #[test]
    fn time_does_not_move_backwards() {
        let clock = Clock::with_time(Duration::from_millis(10));
        clock.set_time(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(10));
    }
}
