use std::time::Duration;

use rand::rngs::StdRng;

use crate::{
    clock::{Clock, TokioClock},
    error::ConfigError,
    random::{RngSource, UniformSource},
    tick::OnTick,
    PoissonBehavior,
};

const DEFAULT_NAME: &str = "poisson";
const DEFAULT_MEAN: Duration = Duration::from_secs(1);

/// Configures a [`PoissonBehavior`].
///
/// Defaults to a mean of one second, tokio's clock and an OS-seeded random source.
#[derive(Debug)]
pub struct BehaviorBuilder<T, C = TokioClock, R = RngSource<StdRng>> {
    on_tick: T,
    name: Option<String>,
    mean: Duration,
    clock: C,
    random: R,
}

impl<T> BehaviorBuilder<T>
where
    T: OnTick,
{
    pub(crate) fn new(on_tick: T) -> Self {
        Self {
            on_tick,
            name: None,
            mean: DEFAULT_MEAN,
            clock: TokioClock,
            random: RngSource::from_os_rng(),
        }
    }
}

impl<T, C> BehaviorBuilder<T, C, RngSource<StdRng>> {
    /// Use a reproducible random source seeded with `seed`.
    pub fn seed(self, seed: u64) -> Self {
        Self {
            random: RngSource::seeded(seed),
            ..self
        }
    }
}

impl<T, C, R> BehaviorBuilder<T, C, R>
where
    T: OnTick,
    C: Clock,
    R: UniformSource,
{
    /// Name the behavior. Used in tracing spans and events.
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// The mean time between ticks. Must be positive.
    pub fn mean(self, mean: Duration) -> Self {
        Self { mean, ..self }
    }

    /// The clock used to schedule deadlines. The host must read the same clock.
    pub fn clock<C2: Clock>(self, clock: C2) -> BehaviorBuilder<T, C2, R> {
        BehaviorBuilder {
            on_tick: self.on_tick,
            name: self.name,
            mean: self.mean,
            clock,
            random: self.random,
        }
    }

    /// The source of uniform draws used to sample delays.
    pub fn random<R2: UniformSource>(self, random: R2) -> BehaviorBuilder<T, C, R2> {
        BehaviorBuilder {
            on_tick: self.on_tick,
            name: self.name,
            mean: self.mean,
            clock: self.clock,
            random,
        }
    }

    /// Build the behavior.
    pub fn build(self) -> Result<PoissonBehavior<T, C, R>, ConfigError> {
        PoissonBehavior::from_parts(
            self.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            self.mean,
            self.on_tick,
            self.clock,
            self.random,
        )
    }
}
