//! Deadline clocks shared between a behavior and its host.

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::time::Instant;

/// A source of monotonic time, shared with the host scheduler.
///
/// Deadlines produced by a behavior are only meaningful to a host reading the same clock.
pub trait Clock: Debug + Send + Sync {
    /// The current time.
    fn now(&self) -> Instant;
}

/// Reads tokio's clock.
///
/// Honours paused time in tests (`tokio::time::pause()`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock which only moves when told to.
///
/// Cheap to clone. Clones share the same time, so a host (or a test) can hold one clone and hand
/// another to a behavior.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// A clock stopped at the current instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// A clock stopped at `origin`.
    pub fn starting_at(origin: Instant) -> Self {
        Self {
            origin,
            elapsed_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The instant this clock started at.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// How far this clock has moved since its origin.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::Acquire))
    }

    /// Move the clock forwards.
    ///
    /// Saturates rather than wrapping, so the clock never goes backwards.
    pub fn advance(&self, duration: Duration) {
        let nanos = saturating_nanos(duration);
        // The closure always returns `Some`, so this can't fail.
        let _ = self
            .elapsed_nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |elapsed| {
                Some(elapsed.saturating_add(nanos))
            });
    }

    /// Set the time to `origin + elapsed`.
    ///
    /// Moving backwards is ignored: the clock stays monotonic.
    pub fn set_elapsed(&self, elapsed: Duration) {
        self.elapsed_nanos
            .fetch_max(saturating_nanos(elapsed), Ordering::AcqRel);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Whole milliseconds, for recording in spans and events.
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
