use std::{
    fmt::{self, Debug},
    pin::pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use rand::rngs::StdRng;
use tokio::{sync::Notify, time::Instant};
use tracing::{debug, span, trace, Level};

use crate::{
    builder::BehaviorBuilder,
    clock::{saturating_millis, Clock, TokioClock},
    error::{ConfigError, TickError, TickResult},
    random::{RngSource, UniformSource},
    tick::OnTick,
};

/// Draws outside of (0, 1) are discarded. Give up after this many in a row.
const MAX_DRAWS: usize = 32;

/// Used when a sampled delay would overflow `Instant`. Roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A behavior which ticks on a Poisson arrival process.
///
/// The time between ticks is exponentially distributed with the configured mean, so the number of
/// ticks in any window follows a Poisson distribution with rate `1 / mean`.
///
/// The behavior doesn't run by itself. A host scheduler drives it:
///
/// 1. [`start()`](Self::start) once, which schedules the first deadline.
/// 2. [`resume()`](Self::resume) whenever the host decides to run it. Each call says what the
///    behavior wants next, see [`Resume`].
/// 3. [`is_done()`](Self::is_done) before each resume. Once it returns `true` the host should
///    retire the behavior.
///
/// [`reset()`](Self::reset) makes a finished behavior reusable. It needs to be started again.
///
/// See [`spawn()`](Self::spawn) for a host built on tokio.
pub struct PoissonBehavior<T, C = TokioClock, R = RngSource<StdRng>> {
    name: String,
    mean: Duration,

    tick_count: u64,
    next_wakeup: Option<Instant>,
    started: bool,

    stop: StopHandle,

    on_tick: T,
    clock: C,
    random: R,
}

/// What a behavior wants the host to do after being resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Resume {
    /// Don't resume before this deadline.
    SuspendUntil(Instant),
    /// A tick just happened. Resume again whenever convenient.
    Fired {
        /// The tick count including this tick.
        tick_count: u64,
        /// The deadline for the next tick.
        next_wakeup: Instant,
    },
    /// The behavior has been stopped. Retire it.
    Done,
}

/// Where a behavior is in its lifecycle.
///
/// Firing happens inside [`PoissonBehavior::resume()`] so it is never observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorState {
    /// Not started since it was created or last reset.
    Created,
    /// Waiting for the next tick.
    Waiting {
        /// When the next tick is due.
        deadline: Instant,
    },
    /// Stopped.
    Terminated,
}

/// Stops a behavior from anywhere.
///
/// Cheap to clone. Stopping is idempotent and takes effect the next time the host checks
/// [`PoissonBehavior::is_done()`]. It never interrupts a tick in progress.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    inner: Arc<StopState>,
}

#[derive(Debug, Default)]
struct StopState {
    stopped: AtomicBool,
    /// Wakes hosts suspended on this behavior.
    notify: Notify,
}

impl<T: OnTick> PoissonBehavior<T> {
    /// Create a behavior ticking on average once every `mean`, using tokio's clock and an
    /// OS-seeded random source.
    pub fn new(mean: Duration, on_tick: T) -> Result<Self, ConfigError> {
        Self::builder(on_tick).mean(mean).build()
    }

    /// Configure a new behavior.
    pub fn builder(on_tick: T) -> BehaviorBuilder<T> {
        BehaviorBuilder::new(on_tick)
    }
}

impl<T, C, R> PoissonBehavior<T, C, R>
where
    T: OnTick,
    C: Clock,
    R: UniformSource,
{
    pub(crate) fn from_parts(
        name: String,
        mean: Duration,
        on_tick: T,
        clock: C,
        random: R,
    ) -> Result<Self, ConfigError> {
        if mean.is_zero() {
            return Err(ConfigError::NonPositiveMean(mean));
        }

        Ok(Self {
            name,
            mean,

            tick_count: 0,
            next_wakeup: None,
            started: false,

            stop: StopHandle::default(),

            on_tick,
            clock,
            random,
        })
    }

    /// Schedule the first tick.
    ///
    /// Must be called before the first [`resume()`](Self::resume), and again after each
    /// [`reset()`](Self::reset).
    pub fn start(&mut self) -> TickResult<Resume, T::Error> {
        let next_wakeup = self.schedule_next()?;
        self.started = true;

        debug!(
            behavior.name = %self.name,
            behavior.mean_ms = saturating_millis(self.mean),
            "Poisson behavior started"
        );

        Ok(Resume::SuspendUntil(next_wakeup))
    }

    /// Tick if the deadline has passed.
    ///
    /// Resuming early just asks to be suspended until the same deadline again. Otherwise, the tick
    /// count is incremented, the callback is called, and the next deadline is sampled.
    ///
    /// A callback error is returned as [`TickError::Callback`]. By then the next deadline is
    /// already scheduled, so resuming again won't retry the failed tick.
    ///
    /// If no next deadline can be sampled, the behavior goes back to needing a
    /// [`start()`](Self::start), so it can't tick again against the deadline it just used.
    pub fn resume(&mut self) -> TickResult<Resume, T::Error> {
        if self.is_done() {
            return Ok(Resume::Done);
        }

        let deadline = match self.next_wakeup {
            Some(deadline) if self.started => deadline,
            _ => return Err(TickError::NotStarted),
        };

        let now = self.clock.now();
        if deadline > now {
            trace!(
                behavior.name = %self.name,
                remaining_ms = saturating_millis(deadline - now),
                "Resumed before deadline"
            );
            return Ok(Resume::SuspendUntil(deadline));
        }

        self.tick_count += 1;

        let outcome = {
            let span = span!(
                Level::INFO,
                "on_tick()",
                behavior.name = %self.name,
                tick.count = self.tick_count
            );
            let _enter = span.enter();

            self.on_tick.on_tick(self.tick_count)
        };

        let scheduled = self.schedule_next();

        let next_wakeup = match (outcome, scheduled) {
            (Ok(()), scheduled) => scheduled?,
            (Err(err), Ok(_)) => {
                debug!(
                    behavior.name = %self.name,
                    tick.count = self.tick_count,
                    "Tick failed: {}",
                    err
                );
                return Err(TickError::Callback(err));
            }
            (Err(err), Err(TickError::DegenerateSample { attempts })) => {
                return Err(TickError::CallbackAndDegenerateSample {
                    error: err,
                    attempts,
                });
            }
            (Err(err), Err(_)) => return Err(TickError::Callback(err)),
        };

        Ok(Resume::Fired {
            tick_count: self.tick_count,
            next_wakeup,
        })
    }

    /// Stop ticking. The behavior reports itself done from now on, until reset.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Returns `true` once [`stop()`](Self::stop) has been called.
    pub fn is_done(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Return to a reusable state: no ticks, not stopped.
    ///
    /// The previous deadline is kept but not used. A new one is sampled by the next
    /// [`start()`](Self::start).
    pub fn reset(&mut self) {
        self.tick_count = 0;
        self.started = false;
        self.stop.clear();

        debug!(behavior.name = %self.name, "Poisson behavior reset");
    }

    /// Tell the callback that the host has retired this behavior.
    pub fn end(&mut self) {
        self.on_tick.on_end();
    }

    fn schedule_next(&mut self) -> TickResult<Instant, T::Error> {
        let delay = match self.sample_delay() {
            Ok(delay) => delay,
            Err(err) => {
                self.started = false;
                return Err(err);
            }
        };

        let next_wakeup = deadline_after(self.clock.now(), delay);
        self.next_wakeup = Some(next_wakeup);

        Ok(next_wakeup)
    }

    fn sample_delay(&mut self) -> TickResult<Duration, T::Error> {
        for _ in 0..MAX_DRAWS {
            let u = self.random.next_uniform();
            if u > 0.0 && u < 1.0 {
                return Ok(exponential_delay(self.mean, u));
            }

            trace!(behavior.name = %self.name, u, "Discarding degenerate uniform draw");
        }

        Err(TickError::DegenerateSample {
            attempts: MAX_DRAWS,
        })
    }
}

impl<T, C, R> PoissonBehavior<T, C, R> {
    /// The name used in tracing spans and events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mean time between ticks.
    pub fn mean(&self) -> Duration {
        self.mean
    }

    /// How many times the callback has been called, including any call in progress.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The most recently scheduled deadline, if any.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.next_wakeup
    }

    /// A handle which can stop this behavior from another task or thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Where this behavior is in its lifecycle.
    pub fn state(&self) -> BehaviorState {
        if self.stop.is_stopped() {
            return BehaviorState::Terminated;
        }
        match self.next_wakeup {
            Some(deadline) if self.started => BehaviorState::Waiting { deadline },
            _ => BehaviorState::Created,
        }
    }
}

impl<T, C: Debug, R: Debug> Debug for PoissonBehavior<T, C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoissonBehavior")
            .field("name", &self.name)
            .field("mean", &self.mean)
            .field("tick_count", &self.tick_count)
            .field("next_wakeup", &self.next_wakeup)
            .field("started", &self.started)
            .field("stopped", &self.stop.is_stopped())
            .field("clock", &self.clock)
            .field("random", &self.random)
            .finish_non_exhaustive()
    }
}

impl StopHandle {
    /// Stop the behavior, and wake any host waiting on it.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::AcqRel) {
            debug!("Poisson behavior stop requested");
        }
        self.inner.notify.notify_waiters();
    }

    /// Whether [`stop()`](Self::stop) has been called (since the last reset).
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Wait until the behavior is stopped.
    pub async fn stopped(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            // Register before checking the flag so a concurrent stop can't be missed.
            notified.as_mut().enable();

            if self.is_stopped() {
                return;
            }

            notified.await;
        }
    }

    fn clear(&self) {
        self.inner.stopped.store(false, Ordering::Release);
    }
}

/// `now + delay`, or as far in the future as `Instant` allows.
fn deadline_after(now: Instant, delay: Duration) -> Instant {
    if let Some(deadline) = now.checked_add(delay) {
        return deadline;
    }

    let mut step = FAR_FUTURE.min(delay);
    while !step.is_zero() {
        if let Some(deadline) = now.checked_add(step) {
            return deadline;
        }
        step /= 2;
    }
    now
}

/// Inverse-transform sample of an exponential distribution, rounded to whole milliseconds.
///
/// `u` must be in (0, 1).
pub(crate) fn exponential_delay(mean: Duration, u: f64) -> Duration {
    let mean_ms = mean.as_secs_f64() * 1000.0;
    let millis = (-mean_ms * u.ln()).round();

    // Saturates for absurdly large values.
    Duration::from_millis(millis as u64)
}
