//! Resampling primitives for permutation inference.
//!
//! Every permutation draws its own RNG seeded from `(base_seed, index)`, so
//! the null distribution does not depend on how iterations are split across
//! threads.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Counter-based RNG seed generation using SplitMix64.
///
/// This is a stateless PRF that generates deterministic, well-distributed
/// seeds from a base seed and counter. Using this instead of simple addition
/// avoids sequential correlation between neighbouring streams.
///
/// # Arguments
///
/// * `base_seed` - Base random seed
/// * `counter` - Stream counter (permutation index, pair index, ...)
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    // SplitMix64, see https://xoshiro.di.unimi.it/splitmix64.c
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// RNG for one permutation stream.
#[inline]
pub fn stream_rng(base_seed: u64, counter: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(base_seed, counter))
}

/// Write the sign pattern encoded by the bits of `index` into `out`.
///
/// Bit `j` set means sample `j` is flipped. Index 0 is the observed data.
pub fn sign_pattern_into(index: u64, out: &mut [f64]) {
    for (j, sign) in out.iter_mut().enumerate() {
        *sign = if (index >> j) & 1 == 1 { -1.0 } else { 1.0 };
    }
}

/// Fill `out` with independent fair ±1 signs.
pub fn random_signs_into<R: Rng>(rng: &mut R, out: &mut [f64]) {
    for sign in out.iter_mut() {
        *sign = if rng.random_bool(0.5) { -1.0 } else { 1.0 };
    }
}

/// Reset `out` to the identity ordering and shuffle it.
///
/// Row `j` of the permuted design takes the label of row `out[j]`.
pub fn shuffled_rows_into<R: Rng>(rng: &mut R, out: &mut [usize]) {
    for (j, slot) in out.iter_mut().enumerate() {
        *slot = j;
    }
    out.shuffle(rng);
}

/// Number of distinct relabellings of groups with the given sizes
/// (multinomial coefficient), saturating at `u128::MAX`.
pub fn label_space_size(group_sizes: &[usize]) -> u128 {
    let mut total: u128 = 1;
    let mut placed: u128 = 0;
    for &size in group_sizes {
        for k in 1..=size as u128 {
            placed += 1;
            // C(placed, k) built incrementally stays integral
            total = match total.checked_mul(placed) {
                Some(v) => v / k,
                None => return u128::MAX,
            };
        }
    }
    total
}
