//! Errors returned by behaviors and by the tokio driver.

use std::{fmt::Display, time::Duration};

use thiserror::Error;
use tokio::task::JoinError;

/// An error in the configuration of a behavior.
///
/// Returned at construction time. A behavior is never created from an invalid configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The mean interarrival time must be strictly positive.
    #[error("Mean interarrival time must be positive, got {0:?}")]
    NonPositiveMean(Duration),
}

/// An error that occurred while starting or resuming a behavior.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TickError<E: Display> {
    /// The tick callback failed.
    ///
    /// The tick is still counted and the next deadline has already been scheduled.
    #[error("The tick callback failed: {0}")]
    Callback(E),

    /// The behavior was resumed before it was ever started.
    #[error("The behavior was resumed before being started")]
    NotStarted,

    /// The random source kept producing values outside of (0, 1).
    ///
    /// No deadline is scheduled, so the behavior has to be started again before it can be
    /// resumed.
    #[error("Unable to sample a delay: {attempts} degenerate uniform draws in a row")]
    DegenerateSample {
        /// How many draws were rejected.
        attempts: usize,
    },

    /// The tick callback failed, and then no next deadline could be sampled.
    ///
    /// Same as [`TickError::DegenerateSample`]: the behavior has to be started again.
    #[error(
        "The tick callback failed: {error}. Then unable to sample a delay: {attempts} degenerate \
         uniform draws in a row"
    )]
    CallbackAndDegenerateSample {
        /// The callback's error.
        error: E,
        /// How many draws were rejected.
        attempts: usize,
    },
}

/// An error that ended a behavior running on the built-in driver.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum DriverError<E: Display> {
    /// Starting or resuming the behavior failed.
    #[error("{0}")]
    Tick(TickError<E>),

    /// The tick callback panicked.
    #[error("The behavior panicked")]
    Panic,

    /// The driver task was cancelled before the behavior finished.
    #[error("The behavior task was cancelled")]
    Cancelled,
}

/// The result of starting or resuming a behavior.
pub type TickResult<T, E> = std::result::Result<T, TickError<E>>;

impl<E: Display> From<TickError<E>> for DriverError<E> {
    fn from(err: TickError<E>) -> Self {
        DriverError::Tick(err)
    }
}

impl<E: Display> From<JoinError> for DriverError<E> {
    fn from(join_err: JoinError) -> Self {
        if join_err.is_cancelled() {
            DriverError::Cancelled
        } else {
            DriverError::Panic
        }
    }
}

impl<E> TickError<E>
where
    E: Display,
{
    /// Get the inner error for callback failures, otherwise self.
    pub fn inner(self) -> TickResult<E, E> {
        match self {
            TickError::Callback(source)
            | TickError::CallbackAndDegenerateSample { error: source, .. } => Ok(source),
            _ => Err(self),
        }
    }
}

impl<E> DriverError<E>
where
    E: Display,
{
    /// Get the inner error for callback failures, otherwise self.
    pub fn inner(self) -> Result<E, Self> {
        match self {
            DriverError::Tick(
                TickError::Callback(source)
                | TickError::CallbackAndDegenerateSample { error: source, .. },
            ) => Ok(source),
            _ => Err(self),
        }
    }
}
