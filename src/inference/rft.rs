//! Random field theory inference for 1D statistic fields.
//!
//! The critical threshold solves `E[EC(u)] = α` for a smooth 1D field of the
//! observed resel count, where
//!
//! ```text
//! E[EC(u)] = R0·ρ0(u) + R1·ρ1(u),   R0 = 1,   R1 = (Q - 1) / FWHM
//! ```
//!
//! and `ρ0`, `ρ1` are the Worsley EC densities of the field's distribution
//! family. Cluster-level p-values use the Poisson clumping approximation for
//! the extent of an upcrossing.

use std::f64::consts::PI;

use statrs::distribution::{ChiSquared, ContinuousCDF, DiscreteCDF, FisherSnedecor, Poisson, StudentsT};
use statrs::function::gamma::ln_gamma;
use tracing::debug;

use crate::config::{Config, SmoothnessEstimator};
use crate::constants::{DEFAULT_SOLVER_ITERATIONS, DEFAULT_TOLERANCE, FOUR_LN2};
use crate::error::{check_alpha, SpmError, SpmResult};
use crate::result::{Dof, InferenceResult, Smoothness, StatFamily, StatisticResult};
use crate::types::Method;

use super::clusters::{extract_clusters, ClusterSpan};
use super::smoothness::estimate_smoothness;

/// Doublings allowed while bracketing the threshold.
const MAX_BRACKET_DOUBLINGS: usize = 64;

/// Γ(3/2) = √π / 2.
const GAMMA_THREE_HALVES: f64 = 0.886_226_925_452_758;

/// Parameters for one RFT inference run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RftInput {
    /// Family-wise significance level.
    pub alpha: f64,
    /// Test both tails (ignored for F and χ² fields).
    pub two_tailed: bool,
    /// Interpolate cluster endpoints.
    pub interp: bool,
    /// Absolute tolerance of the threshold solve.
    pub tolerance: f64,
    /// Iteration cap of the threshold solve.
    pub max_iterations: usize,
    /// Residual smoothness estimator.
    pub estimator: SmoothnessEstimator,
}

impl RftInput {
    /// Defaults at the given alpha.
    pub fn new(alpha: f64, two_tailed: bool) -> Self {
        Self {
            alpha,
            two_tailed,
            interp: true,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_SOLVER_ITERATIONS,
            estimator: SmoothnessEstimator::Gradient,
        }
    }

    /// Solver and cluster settings from `config`, at the given alpha.
    pub fn from_config(config: &Config, alpha: f64, two_tailed: bool) -> Self {
        Self {
            alpha,
            two_tailed,
            interp: config.interp,
            tolerance: config.tolerance,
            max_iterations: config.max_solver_iterations,
            estimator: config.smoothness,
        }
    }
}

enum Survival {
    T(StudentsT),
    F(FisherSnedecor),
    ChiSquare(ChiSquared),
}

/// EC densities ρ0, ρ1 of a t, F or χ² random field.
pub struct EcDensity {
    dof: Dof,
    survival: Survival,
}

impl EcDensity {
    /// Densities for `family` with degrees of freedom `dof`.
    ///
    /// t and χ² use `dof.denominator`; F uses `(numerator, denominator)`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the degrees of freedom are not positive and finite.
    pub fn new(family: StatFamily, dof: Dof) -> SpmResult<Self> {
        fn bad_dof(e: impl std::fmt::Display) -> SpmError {
            SpmError::invalid("degrees of freedom", e.to_string())
        }
        let survival = match family {
            StatFamily::T => Survival::T(StudentsT::new(0.0, 1.0, dof.denominator).map_err(bad_dof)?),
            StatFamily::F => Survival::F(FisherSnedecor::new(dof.numerator, dof.denominator).map_err(bad_dof)?),
            StatFamily::ChiSquare => Survival::ChiSquare(ChiSquared::new(dof.denominator).map_err(bad_dof)?),
        };
        Ok(Self { dof, survival })
    }

    /// ρ0(u): the upper-tail probability.
    pub fn rho0(&self, u: f64) -> f64 {
        match &self.survival {
            Survival::T(d) => d.sf(u),
            Survival::F(d) => {
                if u <= 0.0 {
                    1.0
                } else {
                    d.sf(u)
                }
            }
            Survival::ChiSquare(d) => {
                if u <= 0.0 {
                    1.0
                } else {
                    d.sf(u)
                }
            }
        }
    }

    /// ρ1(u): expected upcrossings per resel.
    pub fn rho1(&self, u: f64) -> f64 {
        let v = self.dof.denominator;
        match self.survival {
            Survival::T(_) => FOUR_LN2.sqrt() / (2.0 * PI) * (1.0 + u * u / v).powf(-(v - 1.0) / 2.0),
            Survival::ChiSquare(_) => {
                if u <= 0.0 {
                    return 0.0;
                }
                (FOUR_LN2 / (2.0 * PI)).sqrt()
                    * ((v - 1.0) / 2.0 * u.ln() - u / 2.0 - (v - 2.0) / 2.0 * std::f64::consts::LN_2 - ln_gamma(v / 2.0))
                        .exp()
            }
            Survival::F(_) => {
                if u <= 0.0 {
                    return 0.0;
                }
                let k = self.dof.numerator;
                let ratio = k * u / v;
                (FOUR_LN2 / (2.0 * PI)).sqrt()
                    * (ln_gamma((v + k - 1.0) / 2.0) - ln_gamma(v / 2.0) - ln_gamma(k / 2.0)).exp()
                    * std::f64::consts::SQRT_2
                    * ratio.powf((k - 1.0) / 2.0)
                    * (1.0 + ratio).powf(-(v + k - 2.0) / 2.0)
            }
        }
    }

    /// Expected Euler characteristic of the excursion set above `u`.
    pub fn expected_ec(&self, u: f64, resels: f64) -> f64 {
        self.rho0(u) + resels * self.rho1(u)
    }
}

/// Find `u` with `E[EC(u)] = target` by bracketed bisection.
///
/// # Errors
///
/// `ConvergenceFailure` if no bracket is found or the bracket does not shrink
/// below `tolerance` within `max_iterations`.
pub fn solve_threshold(
    density: &EcDensity,
    resels: f64,
    target: f64,
    tolerance: f64,
    max_iterations: usize,
) -> SpmResult<f64> {
    let f = |u: f64| density.expected_ec(u, resels) - target;
    let failure = |iterations: usize, detail: String| SpmError::ConvergenceFailure {
        iterations,
        tolerance,
        detail,
    };

    // E[EC] decreases in u: find lo with f ≥ 0 and hi with f ≤ 0.
    let mut lo = 0.0;
    let mut step = 1.0;
    let mut doublings = 0;
    while f(lo) < 0.0 {
        lo = -step;
        step *= 2.0;
        doublings += 1;
        if doublings > MAX_BRACKET_DOUBLINGS {
            return Err(failure(doublings, format!("no lower bracket for target {target:e}")));
        }
    }
    let mut hi = lo.max(0.0) + 1.0;
    doublings = 0;
    while f(hi) > 0.0 {
        lo = hi;
        hi *= 2.0;
        doublings += 1;
        if doublings > MAX_BRACKET_DOUBLINGS {
            return Err(failure(doublings, format!("no upper bracket for target {target:e}")));
        }
    }

    for _ in 0..max_iterations {
        let mid = 0.5 * (lo + hi);
        if hi - lo < tolerance {
            return Ok(mid);
        }
        if f(mid) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Err(failure(
        max_iterations,
        format!("bracket [{lo}, {hi}] still wider than tolerance"),
    ))
}

/// Probability that an upcrossing above `zstar` spans at least `width` nodes.
fn extent_probability(density: &EcDensity, zstar: f64, smoothness: &Smoothness, width: f64) -> f64 {
    let expected_resels = density.rho0(zstar) * smoothness.resels;
    let expected_upcrossings = smoothness.resels * density.rho1(zstar);
    let mean_extent = expected_resels / expected_upcrossings;
    if !(mean_extent.is_finite() && mean_extent > 0.0) {
        return 1.0;
    }
    let beta = (GAMMA_THREE_HALVES / mean_extent).powi(2);
    let k0 = width / smoothness.fwhm;
    (-beta * k0 * k0).exp()
}

/// Cluster-level p-value of one cluster.
fn cluster_p_value(
    density: &EcDensity,
    zstar: f64,
    smoothness: &Smoothness,
    span: &ClusterSpan,
    two_tailed: bool,
) -> f64 {
    let ec = density.expected_ec(zstar, smoothness.resels);
    let p_extent = extent_probability(density, zstar, smoothness, span.effective_width());
    let p = 1.0 - (-ec * p_extent).exp();
    if two_tailed {
        (2.0 * p).min(1.0)
    } else {
        p
    }
}

/// Set-level p-value: probability of at least `c` clusters as large as the smallest one.
fn set_p_value(
    density: &EcDensity,
    zstar: f64,
    smoothness: &Smoothness,
    spans: &[ClusterSpan],
    two_tailed: bool,
) -> Option<f64> {
    if spans.is_empty() {
        return None;
    }
    let min_width = spans.iter().map(ClusterSpan::effective_width).fold(f64::INFINITY, f64::min);
    let tails = if two_tailed { 2.0 } else { 1.0 };
    let lambda =
        tails * density.expected_ec(zstar, smoothness.resels) * extent_probability(density, zstar, smoothness, min_width);
    if !(lambda.is_finite() && lambda > 0.0) {
        return Some(0.0);
    }
    let poisson = Poisson::new(lambda).ok()?;
    Some((1.0 - poisson.cdf(spans.len() as u64 - 1)).clamp(0.0, 1.0))
}

/// Run RFT inference on a statistic field.
///
/// # Errors
///
/// * `InvalidParameter` for alpha outside (0, 1) or unusable degrees of freedom
/// * `DegenerateField` if the residuals carry no variance
/// * `ConvergenceFailure` if the threshold solve fails
pub fn run_rft_inference(stat: &StatisticResult, input: &RftInput) -> SpmResult<InferenceResult> {
    check_alpha(input.alpha)?;
    let two_tailed = input.two_tailed && stat.supports_two_tailed();
    if input.two_tailed && !two_tailed {
        debug!(test = stat.kind().name(), "two-tailed inference not defined for this field, using one tail");
    }

    let smoothness = estimate_smoothness(stat.residuals(), input.estimator)?;
    let density = EcDensity::new(stat.family(), stat.dof())?;
    let target = if two_tailed { input.alpha / 2.0 } else { input.alpha };
    let zstar = solve_threshold(&density, smoothness.resels, target, input.tolerance, input.max_iterations)?;

    let spans = extract_clusters(stat.z(), zstar, two_tailed, input.interp);
    let p_set = set_p_value(&density, zstar, &smoothness, &spans, two_tailed);
    let clusters: Vec<_> = spans
        .into_iter()
        .map(|span| {
            let p = cluster_p_value(&density, zstar, &smoothness, &span, two_tailed);
            span.into_cluster(p)
        })
        .collect();

    debug!(
        test = stat.kind().name(),
        fwhm = smoothness.fwhm,
        resels = smoothness.resels,
        zstar,
        n_clusters = clusters.len(),
        "RFT inference complete"
    );

    Ok(InferenceResult {
        method: Method::Parametric,
        alpha: input.alpha,
        two_tailed,
        zstar,
        h0reject: !clusters.is_empty(),
        n_clusters: clusters.len(),
        clusters,
        p_set,
        smoothness: Some(smoothness),
        permutation: None,
    })
}
