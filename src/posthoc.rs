//! Post-hoc pairwise comparisons after a one-way ANOVA.
//!
//! Every unordered pair of groups is compared with a Welch two-sample t field
//! and two-tailed inference at a corrected per-comparison alpha. Timepoints
//! where either group of a pair has zero variance are dropped for that pair
//! only; the kept original indices travel with the result so exports stay
//! aligned to the full domain.

use nalgebra::DMatrix;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::Config;
use crate::constants::DEFAULT_SEED;
use crate::error::{check_alpha, SpmError, SpmResult};
use crate::inference::{run_permutation_inference, run_rft_inference, PermutationInput, RftInput};
use crate::result::{InferenceResult, PairComparison, PairOutcome, PosthocResult, StatisticResult};
use crate::statistics::{column_moments, compute_design, counter_rng_seed, Design};
use crate::types::{ensure_same_width, Curves, Group, Method};

/// Per-comparison alpha keeping the family-wise error at `alpha` over
/// `n_comparisons` independent tests: `1 - (1 - alpha)^(1 / C)`.
///
/// Equals `alpha` for a single comparison and decreases strictly in `C`.
/// Slightly less conservative than `alpha / C`.
///
/// # Errors
///
/// `InvalidParameter` for alpha outside (0, 1) or zero comparisons.
pub fn p_critical_bonf(alpha: f64, n_comparisons: usize) -> SpmResult<f64> {
    check_alpha(alpha)?;
    if n_comparisons == 0 {
        return Err(SpmError::invalid("n_comparisons", "need at least one comparison"));
    }
    if n_comparisons == 1 {
        return Ok(alpha);
    }
    Ok(1.0 - (1.0 - alpha).powf(1.0 / n_comparisons as f64))
}

/// Family-wise p-value for a per-comparison `p` over `n_comparisons` tests:
/// `1 - (1 - p)^C`, the inverse of [`p_critical_bonf`].
pub fn p_corrected_bonf(p: f64, n_comparisons: usize) -> f64 {
    (1.0 - (1.0 - p).powi(n_comparisons as i32)).clamp(0.0, 1.0)
}

/// Drop timepoints where either matrix has zero variance.
///
/// Returns the reduced matrices and the original indices of the kept columns.
pub fn remove_zero_variance_columns(a: &Curves, b: &Curves) -> (Curves, Curves, Vec<usize>) {
    let (ma, mb) = (column_moments(a), column_moments(b));
    let kept: Vec<usize> = ma
        .iter()
        .zip(&mb)
        .enumerate()
        .filter(|(_, (x, y))| x.var > 0.0 && y.var > 0.0)
        .map(|(q, _)| q)
        .collect();

    let select = |m: &Curves| DMatrix::from_fn(m.nrows(), kept.len(), |j, k| m[(j, kept[k])]);
    (select(a), select(b), kept)
}

/// Everything a single pair needs besides its data.
struct PairSettings<'a> {
    method: Method,
    alpha_corrected: f64,
    iterations: usize,
    base_seed: u64,
    config: &'a Config,
}

fn compare_pair(
    index: usize,
    a: &Curves,
    b: &Curves,
    kept: &[usize],
    settings: &PairSettings<'_>,
) -> SpmResult<(StatisticResult, InferenceResult)> {
    if kept.is_empty() {
        return Err(SpmError::degenerate("post-hoc pair (every timepoint has zero variance)", None));
    }

    let design = Design::TwoSample { a: a.clone(), b: b.clone() };
    let stat = compute_design(&design)?;
    let inference = match settings.method {
        Method::Parametric => run_rft_inference(
            &stat,
            &RftInput::from_config(settings.config, settings.alpha_corrected, true),
        )?,
        Method::Nonparametric => run_permutation_inference(
            &design,
            &PermutationInput {
                alpha: settings.alpha_corrected,
                two_tailed: true,
                iterations: settings.iterations,
                seed: counter_rng_seed(settings.base_seed, index as u64),
                interp: settings.config.interp,
            },
        )?,
    };
    Ok((stat, inference))
}

/// Run all pairwise comparisons between `groups`.
///
/// # Errors
///
/// Only whole-batch problems are errors:
/// * `InsufficientData` with fewer than 2 groups
/// * `ShapeMismatch` if the groups disagree on Q
/// * `InvalidParameter` for alpha outside (0, 1) or, for permutation
///   inference, fewer than 2 iterations
///
/// A failing pair is recorded as [`PairOutcome::Failed`] and the remaining
/// pairs still run.
pub fn run_posthoc(
    groups: &[Group],
    method: Method,
    alpha: f64,
    iterations: usize,
    config: &Config,
) -> SpmResult<PosthocResult> {
    if groups.len() < 2 {
        return Err(SpmError::InsufficientData {
            test: "post-hoc comparison",
            required: 2,
            actual: groups.len(),
        });
    }
    ensure_same_width(groups, "post-hoc groups")?;
    if method == Method::Nonparametric && iterations < 2 {
        return Err(SpmError::invalid(
            "iterations",
            format!("{iterations} permutations is too few, need at least 2"),
        ));
    }

    let pairs: Vec<(usize, usize)> = (0..groups.len())
        .flat_map(|i| (i + 1..groups.len()).map(move |j| (i, j)))
        .collect();
    let n_comparisons = pairs.len();
    let alpha_corrected = p_critical_bonf(alpha, n_comparisons)?;
    debug!(n_comparisons, alpha, alpha_corrected, method = method.name(), "running post-hoc comparisons");

    let settings = PairSettings {
        method,
        alpha_corrected,
        iterations,
        base_seed: config.seed.unwrap_or(DEFAULT_SEED),
        config,
    };

    let run_pair = |index: usize, (i, j): (usize, usize)| -> PairComparison {
        let (ga, gb) = (&groups[i], &groups[j]);
        let name = format!("{} vs {}", ga.name, gb.name);
        let (a, b, kept) = remove_zero_variance_columns(&ga.data, &gb.data);
        if kept.len() < ga.n_timepoints() {
            debug!(pair = %name, dropped = ga.n_timepoints() - kept.len(), "dropped zero-variance timepoints");
        }

        let outcome = match compare_pair(index, &a, &b, &kept, &settings) {
            Ok((statistic, inference)) => PairOutcome::Completed { statistic, inference },
            Err(err) => {
                warn!(pair = %name, error = %err, "post-hoc comparison failed");
                PairOutcome::from(err)
            }
        };

        PairComparison {
            name,
            group_a: ga.name.clone(),
            group_b: gb.name.clone(),
            alpha_corrected,
            n_comparisons,
            kept_timepoints: kept,
            outcome,
        }
    };

    #[cfg(feature = "parallel")]
    let comparisons: Vec<PairComparison> = crate::thread_pool::install(|| {
        pairs
            .par_iter()
            .enumerate()
            .map(|(index, &pair)| run_pair(index, pair))
            .collect()
    });

    #[cfg(not(feature = "parallel"))]
    let comparisons: Vec<PairComparison> = pairs
        .iter()
        .enumerate()
        .map(|(index, &pair)| run_pair(index, pair))
        .collect();

    Ok(PosthocResult {
        method,
        alpha,
        alpha_corrected,
        n_comparisons,
        pairs: comparisons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_comparison_is_uncorrected() {
        assert_eq!(p_critical_bonf(0.05, 1).unwrap(), 0.05);
    }

    #[test]
    fn test_correction_decreases_with_comparisons() {
        let mut last = 0.05;
        for c in 2..12 {
            let a = p_critical_bonf(0.05, c).unwrap();
            assert!(a < last, "C = {c}: {a} !< {last}");
            // Šidák is never more conservative than alpha / C.
            assert!(a >= 0.05 / c as f64);
            last = a;
        }
        let three = p_critical_bonf(0.05, 3).unwrap();
        assert!((three - 0.016_952_427_508_441_6).abs() < 1e-12, "{three}");
    }

    #[test]
    fn test_corrected_p_inverts_critical() {
        let crit = p_critical_bonf(0.05, 6).unwrap();
        assert!((p_corrected_bonf(crit, 6) - 0.05).abs() < 1e-12);
        assert!(p_critical_bonf(0.05, 0).is_err());
        assert!(p_critical_bonf(1.5, 3).is_err());
    }

    #[test]
    fn test_zero_variance_columns_removed_pairwise() {
        let a = DMatrix::from_fn(4, 5, |j, q| if q == 1 { 3.0 } else { (j + q) as f64 });
        let b = DMatrix::from_fn(3, 5, |j, q| if q == 3 { 1.0 } else { (j * 2 + q) as f64 });
        let (ra, rb, kept) = remove_zero_variance_columns(&a, &b);
        assert_eq!(kept, vec![0, 2, 4]);
        assert_eq!(ra.shape(), (4, 3));
        assert_eq!(rb.shape(), (3, 3));
        assert_eq!(ra[(2, 1)], a[(2, 2)]);
    }

    #[test]
    fn test_all_degenerate_pair_is_isolated() {
        let flat = Group::new("flat", DMatrix::from_element(5, 8, 1.0));
        let x = Group::new("x", DMatrix::from_fn(5, 8, |j, q| (j * 3 + q % 4) as f64 + 0.5 * (q as f64).sin()));
        let y = Group::new("y", DMatrix::from_fn(6, 8, |j, q| (j * 2 + q % 3) as f64 - 0.3 * (q as f64).cos()));
        let result = run_posthoc(&[flat, x, y], Method::Parametric, 0.05, 0, &Config::default()).unwrap();

        assert_eq!(result.n_comparisons, 3);
        let failed = result.get("flat vs x").unwrap();
        assert!(matches!(failed.outcome, PairOutcome::Failed { .. }));
        assert!(failed.kept_timepoints.is_empty());
        assert_eq!(failed.significant(), None);
        assert!(result.get("y vs x").unwrap().significant().is_some());
    }

    #[test]
    fn test_requires_two_groups() {
        let g = Group::new("A", DMatrix::from_element(3, 4, 1.0));
        let err = run_posthoc(&[g], Method::Parametric, 0.05, 100, &Config::default()).unwrap_err();
        assert!(matches!(err, SpmError::InsufficientData { .. }));
    }
}
