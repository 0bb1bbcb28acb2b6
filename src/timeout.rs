use std::thread;
use std::time::{Duration, Instant};

/// A wall-clock budget started at construction.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn start(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn expired(&self) -> bool {
        self.elapsed() > self.limit
    }

    /// Sleeps for at most `tick`, never past the deadline by more than a tick.
    pub fn nap(&self, tick: Duration) {
        let remaining = self.limit.checked_sub(self.elapsed()).unwrap_or_default();
        thread::sleep(tick.min(remaining).max(Duration::from_millis(1)));
    }
}
