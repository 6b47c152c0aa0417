#![forbid(unsafe_code)]

//! Trailing-edge flush throttling.
//!
//! [`FlushScheduler`] bounds how often staged values are emitted. The first
//! [`request`](FlushScheduler::request) after a quiet period arms a deadline
//! one interval ahead; further requests inside the window are absorbed.
//! When the host loop [`poll`](FlushScheduler::poll)s past the deadline the
//! window closes and the caller flushes whatever is staged *at that moment*.
//!
//! This is throttling, not debouncing: a request inside an armed window never
//! pushes the deadline back, so a continuous stream of updates still flushes
//! once per interval.
//!
//! # Invariants
//!
//! 1. At most one deadline is armed at a time.
//! 2. `poll` returns true at most once per armed window.
//! 3. A request made after a fired window arms a fresh window measured from
//!    that request.
//!
//! # Usage
//!
//! ```
//! use showmirror_runtime::flush::FlushScheduler;
//! use web_time::{Duration, Instant};
//!
//! let mut flush = FlushScheduler::new(Duration::from_millis(100));
//! let t0 = Instant::now();
//! assert!(flush.request(t0));
//! assert!(!flush.request(t0 + Duration::from_millis(40)));
//! assert!(!flush.poll(t0 + Duration::from_millis(99)));
//! assert!(flush.poll(t0 + Duration::from_millis(100)));
//! assert!(!flush.is_armed());
//! ```

use web_time::{Duration, Instant};

/// Default flush interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Counters kept by a [`FlushScheduler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Total `request` calls.
    pub requests: u64,
    /// Requests absorbed by an already armed window.
    pub coalesced: u64,
    /// Windows that fired.
    pub flushes: u64,
}

/// Deadline-based trailing-edge throttle.
///
/// Time is passed in by the caller; the scheduler never reads a clock.
#[derive(Debug, Clone)]
pub struct FlushScheduler {
    interval: Duration,
    deadline: Option<Instant>,
    stats: FlushStats,
}

impl Default for FlushScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl FlushScheduler {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            stats: FlushStats::default(),
        }
    }

    /// Ask for a flush. Returns true when this call armed a new window.
    pub fn request(&mut self, now: Instant) -> bool {
        self.stats.requests += 1;
        if self.deadline.is_some() {
            self.stats.coalesced += 1;
            return false;
        }
        self.deadline = Some(now + self.interval);
        tracing::trace!(
            target: "showmirror.flush",
            interval_ms = self.interval.as_millis() as u64,
            "flush window armed"
        );
        true
    }

    /// Returns true exactly when an armed deadline has been reached, and
    /// disarms it. The caller must flush when this returns true.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.stats.flushes += 1;
                true
            }
            _ => false,
        }
    }

    /// Disarm without firing. Returns whether a window was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn stats(&self) -> FlushStats {
        self.stats
    }
}
