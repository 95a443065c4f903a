//! Configuration for SPM analyses.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ALPHA, DEFAULT_ITERATIONS, DEFAULT_POSTHOC_ITERATIONS, DEFAULT_SOLVER_ITERATIONS,
    DEFAULT_TOLERANCE,
};

/// Configuration options for [`SpmAnalyzer`](crate::SpmAnalyzer) and the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Family-wise significance level (default: 0.05).
    pub alpha: f64,

    /// Significance level for normality screening (default: 0.05).
    pub normality_alpha: f64,

    /// Two-tailed inference for t-type fields (default: true).
    ///
    /// F and K² fields are always one-tailed.
    pub two_tailed: bool,

    /// Permutations for nonparametric inference (default: 500).
    pub iterations: usize,

    /// Permutations per post-hoc pair (default: 1,000).
    pub posthoc_iterations: usize,

    /// Optional deterministic seed for permutation schedules.
    ///
    /// Two runs with the same inputs and seed produce identical thresholds
    /// and cluster p-values.
    pub seed: Option<u64>,

    /// Interpolate cluster endpoints to the threshold crossing (default: true).
    pub interp: bool,

    /// Absolute tolerance for the RFT threshold solve (default: 1e-6).
    pub tolerance: f64,

    /// Iteration cap for the RFT threshold solve (default: 200).
    pub max_solver_iterations: usize,

    /// Residual smoothness estimator for RFT inference.
    pub smoothness: SmoothnessEstimator,
}

/// Estimator for the FWHM of the residual field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmoothnessEstimator {
    /// Mean-squared spatial gradient of the residuals, normalized per node.
    Gradient,

    /// Lag-1 autocorrelation of standardized residuals.
    Autocorrelation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            normality_alpha: DEFAULT_ALPHA,
            two_tailed: true,
            iterations: DEFAULT_ITERATIONS,
            posthoc_iterations: DEFAULT_POSTHOC_ITERATIONS,
            seed: None,
            interp: true,
            tolerance: DEFAULT_TOLERANCE,
            max_solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            smoothness: SmoothnessEstimator::Gradient,
        }
    }
}

impl Default for SmoothnessEstimator {
    fn default() -> Self {
        Self::Gradient
    }
}
