//! Sources of uniform random draws.

use std::fmt::Debug;

use rand::{distr::Open01, rngs::StdRng, Rng, SeedableRng};

/// Supplies uniform random draws in `[0, 1)`.
///
/// One accepted draw is used per sampled delay.
pub trait UniformSource: Debug + Send {
    /// The next uniform variate.
    fn next_uniform(&mut self) -> f64;
}

/// Draws from a [`rand::Rng`] over the open interval `(0, 1)`, so it never produces zero.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    /// Wrap an existing generator.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// A reproducible source.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// A source seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R> UniformSource for RngSource<R>
where
    R: Rng + Debug + Send,
{
    fn next_uniform(&mut self) -> f64 {
        self.rng.sample(Open01)
    }
}

/// Replays a fixed sequence of draws, cycling back to the start once exhausted.
#[derive(Debug, Clone)]
pub struct FixedSequence {
    values: Vec<f64>,
    next: usize,
}

impl FixedSequence {
    /// Replay `values` in order, forever.
    ///
    /// # Panics
    ///
    /// If `values` is empty.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values.into();
        assert!(!values.is_empty(), "a fixed sequence needs at least one value");

        Self { values, next: 0 }
    }

    /// Always draw `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl UniformSource for FixedSequence {
    fn next_uniform(&mut self) -> f64 {
        let value = self.values[self.next];
        self.next = (self.next + 1) % self.values.len();
        value
    }
}
