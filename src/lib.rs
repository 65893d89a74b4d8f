//! A behavior which ticks on a Poisson arrival process.
//!
//! Some recurring work shouldn't happen on a fixed period: simulated arrivals, background health
//! checks, traffic generation. A Poisson process fires at random, with exponentially distributed
//! gaps between ticks around a configured mean.
//!
//! A [`PoissonBehavior`] doesn't run itself. It is driven by a cooperative host scheduler which
//! starts it, resumes it, and retires it once it reports that it is done. Each resume returns a
//! [`Resume`] saying what the behavior wants next, so the host stays in control of time.
//!
//! [`PoissonBehavior::spawn()`] is a ready-made host which runs a behavior on a tokio task.
//!
//! See the README for an example.

#![deny(missing_docs)]

#[cfg(doctest)]
use doc_comment::doctest;
#[cfg(doctest)]
doctest!("../README.md");

mod behavior;
mod builder;
pub mod clock;
mod driver;
pub mod error;
pub mod random;
mod tick;

pub use behavior::{BehaviorState, PoissonBehavior, Resume, StopHandle};
pub use builder::BehaviorBuilder;
pub use clock::{Clock, ManualClock, TokioClock};
pub use driver::BehaviorHandle;
pub use error::{ConfigError, DriverError, TickError};
pub use random::{FixedSequence, RngSource, UniformSource};
pub use tick::OnTick;
