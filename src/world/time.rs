use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic milliseconds since the clock was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Millis(pub u64);

impl Millis {
    pub fn saturating_elapsed_since(self, earlier: Millis) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Millis;
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        let elapsed = self.started.elapsed().as_millis();
        Millis(elapsed.min(u64::MAX as u128) as u64)
    }
}

#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicU64::new(start.0),
        }
    }

    pub fn advance(&self, duration: Duration) -> Millis {
        let step = duration.as_millis().min(u64::MAX as u128) as u64;
        let previous = self.now.fetch_add(step, Ordering::AcqRel);
        Millis(previous.saturating_add(step))
    }

    pub fn set(&self, at: Millis) {
        self.now.store(at.0, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        Millis(self.now.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Millis(1_000));
        assert_eq!(clock.advance(Duration::from_millis(250)), Millis(1_250));
        assert_eq!(clock.now(), Millis(1_250));
        clock.set(Millis(5));
        assert_eq!(clock.now(), Millis(5));
    }

    #[test]
    fn elapsed_saturates_when_clock_moves_backwards() {
        let later = Millis(10);
        let earlier = Millis(40);
        assert_eq!(later.saturating_elapsed_since(earlier), Duration::ZERO);
        assert_eq!(
            Millis(540).saturating_elapsed_since(Millis(40)),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
