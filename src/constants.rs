//! Numeric constants and defaults.

/// 4·ln 2, the Gaussian-kernel roughness factor used in resel conversions.
pub const FOUR_LN2: f64 = 2.772_588_722_239_781;

/// Default family-wise significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Default permutation count for main-effect nonparametric inference.
pub const DEFAULT_ITERATIONS: usize = 500;

/// Default permutation count for each post-hoc pair.
pub const DEFAULT_POSTHOC_ITERATIONS: usize = 1_000;

/// Default seed when the caller does not supply one.
pub const DEFAULT_SEED: u64 = 42;

/// Minimum samples for the D'Agostino–Pearson K² statistic.
pub const K2_MIN_SAMPLES: usize = 8;

/// Default absolute tolerance for the RFT threshold solve.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default iteration cap for the RFT threshold solve.
pub const DEFAULT_SOLVER_ITERATIONS: usize = 200;

/// Largest sign-flip space that will be enumerated exactly (2^20 arrangements).
pub const MAX_EXACT_SIGN_FLIP_SAMPLES: usize = 20;
