//! Wall-clock abstraction for message timestamps
//!
//! Chat lines carry an `[HH:MM:SS]` prefix. Production code reads the local
//! wall clock; tests inject a fixed time so rendered lines are stable.

use chrono::{Local, NaiveTime};

/// Source of the wall-clock time used in message timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveTime;
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// A clock pinned to one instant, for deterministic formatting in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(NaiveTime);

impl FixedClock {
    pub fn at(hour: u32, min: u32, sec: u32) -> Self {
        Self(NaiveTime::from_hms_opt(hour, min, sec).expect("valid wall-clock time"))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let clock = FixedClock::at(9, 30, 0);
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().format("%H:%M:%S").to_string(), "09:30:00");
    }
}
