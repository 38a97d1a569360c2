//! Time source for entry timestamps

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of Unix-second timestamps stamped onto written entries.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Manually driven clock, for deterministic tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward and return the new time.
    pub fn advance(&self, secs: i64) -> i64 {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        assert_eq!(clock.advance(5), 105);
        clock.set(42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
