use std::fmt::{Debug, Display};

/// Called for each arrival of the Poisson process.
///
/// Implemented for any `FnMut(u64) -> Result<(), E>` closure.
pub trait OnTick: Send {
    /// The error type that can be returned from a tick.
    type Error: Send + Clone + Display + Debug;

    /// Handle one arrival.
    ///
    /// `tick_count` already includes this arrival, so the first call receives `1`.
    ///
    /// Errors are returned to whoever resumed the behavior. They don't stop it.
    fn on_tick(&mut self, tick_count: u64) -> Result<(), Self::Error>;

    /// Called once by a host when it retires a finished behavior.
    fn on_end(&mut self) {}
}

impl<F, E> OnTick for F
where
    F: FnMut(u64) -> Result<(), E> + Send,
    E: Send + Clone + Display + Debug,
{
    type Error = E;

    fn on_tick(&mut self, tick_count: u64) -> Result<(), E> {
        self(tick_count)
    }
}
