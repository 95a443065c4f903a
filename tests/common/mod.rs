//! Synthetic curve generators shared by the integration suites.

#![allow(dead_code)]

use curve_spm::{Curves, Group};
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;

pub fn rng(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

/// I.i.d. N(mean, 1) at every sample and timepoint.
pub fn white_noise(rng: &mut Xoshiro256PlusPlus, rows: usize, q: usize, mean: f64) -> Curves {
    let normal = Normal::new(mean, 1.0).unwrap();
    DMatrix::from_fn(rows, q, |_, _| normal.sample(rng))
}

/// Unit-variance Gaussian-smoothed noise plus `mean`.
pub fn smooth_noise(rng: &mut Xoshiro256PlusPlus, rows: usize, q: usize, mean: f64, sigma: f64) -> Curves {
    let half = (3.0 * sigma).ceil() as isize;
    let kernel: Vec<f64> = (-half..=half)
        .map(|k| (-(k as f64).powi(2) / (2.0 * sigma * sigma)).exp())
        .collect();
    let norm = kernel.iter().map(|w| w * w).sum::<f64>().sqrt();
    let padded = q + 2 * half as usize;

    let mut y = DMatrix::zeros(rows, q);
    for j in 0..rows {
        let raw = white_noise(rng, 1, padded, 0.0);
        for t in 0..q {
            let acc: f64 = kernel.iter().enumerate().map(|(k, w)| w * raw[(0, t + k)]).sum();
            y[(j, t)] = mean + acc / norm;
        }
    }
    y
}

pub fn group(name: &str, data: Curves) -> Group {
    Group::new(name, data)
}
