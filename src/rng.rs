//! Seedable random number generator for deterministic testing.
//!
//! When a seed is provided via [`Config::rng_seed`](crate::Config::rng_seed), the
//! server random and session identifiers become deterministic. Ephemeral keys
//! and CBC IVs always come from the crypto provider's secure random source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A random number generator that can be seeded for deterministic behavior.
pub struct SeededRng {
    inner: StdRng,
    seeded: bool,
}

impl SeededRng {
    /// Create a new RNG with an optional seed.
    ///
    /// Without a seed the generator is initialised from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => SeededRng {
                inner: StdRng::seed_from_u64(seed),
                seeded: true,
            },
            None => SeededRng {
                inner: StdRng::from_entropy(),
                seeded: false,
            },
        }
    }

    /// Fill a slice with random bytes.
    pub fn fill(&mut self, out: &mut [u8]) {
        self.inner.fill(out);
    }
}

impl std::fmt::Debug for SeededRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededRng")
            .field("seeded", &self.seeded)
            .finish()
    }
}
