//! A deterministic, seedable random source owned by the test runner, so a
//! plan run is reproducible given a fixed seed.

use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Wraps a [`SmallRng`] seeded at construction time.
///
/// `SmallRng` is not cryptographically secure, which is fine here: the
/// generator only needs plausible, schema-conforming values, not
/// unpredictability — this isn't a fuzzer.
#[derive(Debug, Clone)]
pub struct EngineRng(SmallRng);

impl EngineRng {
    /// Creates a new RNG seeded with `seed`. The same seed always produces
    /// the same sequence of generated values.
    pub fn new(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }

    /// Borrows the inner [`rand::Rng`] implementation.
    pub fn inner(&mut self) -> &mut impl rand::Rng {
        &mut self.0
    }
}

impl Default for EngineRng {
    fn default() -> Self {
        Self::new(0)
    }
}
