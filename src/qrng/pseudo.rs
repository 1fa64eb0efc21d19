//! Pseudo-random source for testing
//!
//! Uses the `rand` crate's thread-local RNG. This is NOT quantum random,
//! but provides a fast, deterministic-when-seeded source for development
//! and testing.

use crate::error::{Error, Result};
use crate::qrng::{BitString, RandomBitSource};
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Mutex;

pub(crate) const DESCRIPTION: &str = "Pseudo-random number generator (for testing)";

/// Pseudo-random bit source backed by the thread RNG
#[derive(Debug, Default)]
pub struct PseudoSource;

impl PseudoSource {
    /// Create a new pseudo-random source
    pub fn new() -> Self {
        Self
    }
}

impl RandomBitSource for PseudoSource {
    fn name(&self) -> &'static str {
        "pseudo"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn bits(&self, n: usize) -> Result<BitString> {
        let mut rng = rand::thread_rng();
        Ok((0..n).map(|_| rng.gen::<bool>()).collect())
    }
}

/// Seeded pseudo-random source for deterministic testing
pub struct SeededPseudoSource {
    rng: Mutex<rand::rngs::StdRng>,
}

impl SeededPseudoSource {
    /// Create a new seeded pseudo-random source
    ///
    /// Using the same seed will produce the same sequence of bits.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(rand::rngs::StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomBitSource for SeededPseudoSource {
    fn name(&self) -> &'static str {
        "pseudo-seeded"
    }

    fn description(&self) -> &'static str {
        "Seeded pseudo-random number generator (for reproducible testing)"
    }

    fn bits(&self, n: usize) -> Result<BitString> {
        let mut bytes = vec![0u8; n.div_ceil(8)];
        self.rng
            .lock()
            .map_err(|_| Error::Qrng("Seeded RNG lock poisoned".to_string()))?
            .fill_bytes(&mut bytes);
        Ok(BitString::from_bytes(&bytes, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pseudo_source_bits() {
        let source = PseudoSource::new();
        let bits = source.bits(100).unwrap();
        assert_eq!(bits.len(), 100);
    }

    #[test]
    fn test_seeded_source_reproducible() {
        let source1 = SeededPseudoSource::new(42);
        let source2 = SeededPseudoSource::new(42);

        assert_eq!(source1.bits(208).unwrap(), source2.bits(208).unwrap());
    }

    #[test]
    fn test_seeded_source_odd_lengths() {
        let source = SeededPseudoSource::new(7);
        for n in [1, 7, 9, 63, 65] {
            assert_eq!(source.bits(n).unwrap().len(), n);
        }
    }
}
