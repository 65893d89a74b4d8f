use tokio::task::JoinHandle;
use tracing::{debug, span, Instrument, Level};

use crate::{
    behavior::{PoissonBehavior, Resume, StopHandle},
    clock::{saturating_millis, TokioClock},
    error::{DriverError, TickResult},
    random::UniformSource,
    tick::OnTick,
};

type DriverResult<T, C, R> =
    Result<PoissonBehavior<T, C, R>, DriverError<<T as OnTick>::Error>>;

/// A handle to a behavior running on its own tokio task.
///
/// ## Drop
///
/// Dropping the handle without calling [`join()`](Self::join) aborts the task.
#[derive(Debug)]
pub struct BehaviorHandle<T: OnTick, R> {
    stop: StopHandle,
    handle: Option<JoinHandle<DriverResult<T, TokioClock, R>>>,
}

impl<T, R> PoissonBehavior<T, TokioClock, R>
where
    T: OnTick + 'static,
    R: UniformSource + 'static,
{
    /// Run this behavior on a new tokio task.
    ///
    /// The task sleeps until each deadline and resumes the behavior, yielding to the runtime after
    /// every tick. It finishes once the behavior is stopped, or as soon as starting or resuming it
    /// fails. Stopping wakes the task even while it is sleeping.
    ///
    /// [`OnTick::on_end()`] is called when the task finishes, whether or not it failed. A failed
    /// behavior is dropped after that. A panicking callback skips `on_end`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> BehaviorHandle<T, R> {
        let stop = self.stop_handle();

        let span = span!(
            Level::INFO,
            "poisson behavior",
            behavior.name = self.name(),
            behavior.mean_ms = saturating_millis(self.mean())
        );

        let handle = tokio::spawn(drive(self).instrument(span));

        BehaviorHandle {
            stop,
            handle: Some(handle),
        }
    }
}

async fn drive<T, R>(
    mut behavior: PoissonBehavior<T, TokioClock, R>,
) -> DriverResult<T, TokioClock, R>
where
    T: OnTick,
    R: UniformSource,
{
    let result = run(&mut behavior).await;

    match &result {
        Ok(()) => debug!(ticks = behavior.tick_count(), "Poisson behavior finished"),
        Err(err) => debug!(
            ticks = behavior.tick_count(),
            "Poisson behavior failed: {}",
            err
        ),
    }
    behavior.end();

    result.map(|()| behavior).map_err(DriverError::from)
}

async fn run<T, R>(behavior: &mut PoissonBehavior<T, TokioClock, R>) -> TickResult<(), T::Error>
where
    T: OnTick,
    R: UniformSource,
{
    let stop = behavior.stop_handle();

    let mut next = behavior.start()?;

    while !behavior.is_done() {
        match next {
            Resume::SuspendUntil(deadline) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {}
                    _ = stop.stopped() => {}
                }
            }
            Resume::Fired { .. } => {
                // Let other tasks run between ticks, even if the next one is already due.
                tokio::task::yield_now().await;
            }
            Resume::Done => break,
        }

        if behavior.is_done() {
            break;
        }
        next = behavior.resume()?;
    }

    Ok(())
}

impl<T, R> BehaviorHandle<T, R>
where
    T: OnTick,
{
    /// Stop the behavior. The task finishes soon after.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// A handle which can stop the behavior without owning this handle.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Whether the task has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |handle| handle.is_finished())
    }

    /// Wait for the task to finish.
    ///
    /// Returns the behavior, which can be reset and used again.
    pub async fn join(mut self) -> DriverResult<T, TokioClock, R> {
        match self.handle.take() {
            Some(handle) => handle.await?,
            None => Err(DriverError::Cancelled),
        }
    }
}

impl<T: OnTick, R> Drop for BehaviorHandle<T, R> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
