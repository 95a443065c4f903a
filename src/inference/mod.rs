//! Inference engines for statistic fields.
//!
//! Two engines share one result contract ([`InferenceResult`]):
//!
//! 1. **RFT** ([`rft`]): threshold from the residual smoothness and the
//!    expected Euler characteristic of a smooth random field
//! 2. **Permutation** ([`permutation`]): threshold from the max-statistic
//!    distribution under sign flips or label permutation
//!
//! Both extract suprathreshold clusters with [`clusters`] and attach a
//! family-wise corrected p-value to each.

mod clusters;
mod permutation;
mod rft;
mod smoothness;

pub use permutation::{run_permutation_inference, PermutationInput};
pub use rft::{run_rft_inference, solve_threshold, EcDensity, RftInput};
pub use smoothness::{estimate_smoothness, resel_count};

use crate::constants::DEFAULT_SEED;
use crate::error::SpmResult;
use crate::result::{InferenceResult, StatisticResult};
use crate::statistics::{Design, DesignOptions};
use crate::types::{Group, TestKind};

/// RFT inference with default solver settings.
///
/// # Errors
///
/// See [`run_rft_inference`].
pub fn parametric_inference(stat: &StatisticResult, alpha: f64, two_tailed: bool) -> SpmResult<InferenceResult> {
    run_rft_inference(stat, &RftInput::new(alpha, two_tailed))
}

/// Permutation inference on raw groups.
///
/// `seed` defaults to a fixed value so unseeded runs are still reproducible.
///
/// # Errors
///
/// See [`Design::from_groups`] and [`run_permutation_inference`].
pub fn nonparametric_inference(
    kind: TestKind,
    groups: &[Group],
    options: &DesignOptions,
    alpha: f64,
    iterations: usize,
    two_tailed: bool,
    seed: Option<u64>,
) -> SpmResult<InferenceResult> {
    let design = Design::from_groups(kind, groups, options)?;
    run_permutation_inference(
        &design,
        &PermutationInput {
            alpha,
            two_tailed,
            iterations,
            seed: seed.unwrap_or(DEFAULT_SEED),
            interp: true,
        },
    )
}
