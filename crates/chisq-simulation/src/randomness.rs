//! Seeded Randomness
//!
//! The single random source of a simulation. It is seeded from OS entropy by
//! default; the seed is always retained so that any run can be replayed by
//! configuring the same seed.

//-----------------------------------------------------------------------------
// Imports
//-----------------------------------------------------------------------------

use rand::prelude::{RngCore, SeedableRng, StdRng};
use rand::Error as RandError;
use rand_distr::{Binomial, Distribution};

/// A wrapper around a seeded PRNG that remembers its seed.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: StdRng,
    seed: u64,
}

impl SeededRng {
    /// Creates a new RNG instance seeded with the given 64-bit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Creates a new RNG instance from entropy.
    /// The seed is drawn from entropy and stored, so the run stays replayable.
    pub fn from_entropy() -> Self {
        let mut entropy_rng = StdRng::from_entropy();
        Self::new(entropy_rng.next_u64())
    }

    /// Seeded when `seed` is given, entropy-seeded otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::new)
    }

    /// Returns the seed used to initialize this RNG.
    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    /// Draw one multinomial sample of `trials` draws over `probabilities`.
    ///
    /// Uses the conditional binomial method: category `i` receives
    /// `Binomial(remaining, p_i / remaining_mass)` draws and the last category
    /// takes whatever is left, so the counts always sum to `trials`.
    /// `probabilities` must be non-empty with positive entries summing to ~1.
    pub fn multinomial(&mut self, trials: u64, probabilities: &[f64]) -> Vec<u64> {
        let mut counts = vec![0u64; probabilities.len()];
        let Some((_, leading)) = probabilities.split_last() else {
            return counts;
        };

        let mut remaining = trials;
        let mut remaining_mass = 1.0_f64;
        for (index, &p) in leading.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let conditional = if remaining_mass > 0.0 {
                (p / remaining_mass).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let drawn = match Binomial::new(remaining, conditional) {
                Ok(binomial) => binomial.sample(&mut self.rng),
                // NaN probability; validated distributions never get here.
                Err(_) => 0,
            };
            counts[index] = drawn;
            remaining -= drawn;
            remaining_mass -= p;
        }
        counts[leading.len()] = remaining;
        counts
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), RandError> {
        self.rng.try_fill_bytes(dest)
    }
}

//-----------------------------------------------------------------------------
// Tests
//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_seeded_rng_deterministic() {
        let mut rng1 = SeededRng::new(12345);
        let mut rng2 = SeededRng::new(12345);

        assert_eq!(rng1.next_u32(), rng2.next_u32());
        assert_eq!(rng1.gen_range(0..100), rng2.gen_range(0..100));
        assert_eq!(
            rng1.multinomial(100, &[0.25; 4]),
            rng2.multinomial(100, &[0.25; 4])
        );
    }

    #[test]
    fn test_from_entropy_keeps_seed() {
        let mut rng = SeededRng::from_entropy();
        let mut replay = SeededRng::new(rng.get_seed());
        assert_eq!(rng.next_u64(), replay.next_u64());
    }

    #[test]
    fn test_from_optional_seed() {
        assert_eq!(SeededRng::from_optional_seed(Some(9)).get_seed(), 9);
    }

    #[test]
    fn test_multinomial_sums_to_trials() {
        let mut rng = SeededRng::new(1);
        let probabilities = [0.1, 0.2, 0.3, 0.4];
        for trials in [0u64, 1, 7, 100, 10_000] {
            let counts = rng.multinomial(trials, &probabilities);
            assert_eq!(counts.len(), 4);
            assert_eq!(counts.iter().sum::<u64>(), trials);
        }
    }

    #[test]
    fn test_multinomial_tracks_probabilities() {
        let mut rng = SeededRng::new(2024);
        let probabilities = [0.5, 0.3, 0.2];
        let counts = rng.multinomial(100_000, &probabilities);
        for (count, p) in counts.iter().zip(probabilities) {
            let share = *count as f64 / 100_000.0;
            assert!((share - p).abs() < 0.01, "share {share} too far from {p}");
        }
    }

    #[test]
    fn test_multinomial_empty_probabilities() {
        let mut rng = SeededRng::new(3);
        assert!(rng.multinomial(10, &[]).is_empty());
    }
}
