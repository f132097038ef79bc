use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Source of the opponent's randomness.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn unit(&mut self) -> f64 {
        (**self).unit()
    }

    fn index(&mut self, len: usize) -> usize {
        (**self).index(len)
    }
}

impl<S: RandomSource + ?Sized> RandomSource for Box<S> {
    fn unit(&mut self) -> f64 {
        (**self).unit()
    }

    fn index(&mut self, len: usize) -> usize {
        (**self).index(len)
    }
}

/// Adapts any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R>(R);

impl<R: RngCore> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    fn unit(&mut self) -> f64 {
        self.0.gen_range(0.0..1.0)
    }

    fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

/// Replays fixed draws in order, cycling when exhausted.
///
/// Indices are reduced modulo the requested length. An empty script yields
/// `0.0` and index `0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    units: Vec<f64>,
    indices: Vec<usize>,
    next_unit: usize,
    next_index: usize,
}

impl ScriptedSource {
    pub fn new(units: Vec<f64>, indices: Vec<usize>) -> Self {
        Self {
            units,
            indices,
            next_unit: 0,
            next_index: 0,
        }
    }

    pub fn constant(unit: f64) -> Self {
        Self::new(vec![unit], Vec::new())
    }
}

impl RandomSource for ScriptedSource {
    fn unit(&mut self) -> f64 {
        if self.units.is_empty() {
            return 0.0;
        }
        let value = self.units[self.next_unit % self.units.len()];
        self.next_unit += 1;
        value
    }

    fn index(&mut self, len: usize) -> usize {
        if self.indices.is_empty() || len == 0 {
            return 0;
        }
        let value = self.indices[self.next_index % self.indices.len()];
        self.next_index += 1;
        value % len
    }
}
