//! Nonparametric (permutation) inference.
//!
//! The null distribution is built from the maximum of the statistic field
//! under random rearrangements of the data:
//! - one-sample and paired designs flip the sign of whole curves
//! - two-sample and ANOVA designs permute group labels across curves
//!
//! Using the domain-wide maximum M = max_q z(q) (or max_q |z(q)| when
//! two-tailed) controls the family-wise error over the whole curve without
//! any smoothness assumption. Under a symmetric null the (1-α) quantile of
//! max|z| is the same as splitting α/2 to each tail.
//!
//! Permutation `i` draws from its own counter-seeded stream, so results are
//! identical whether iterations run serially or across threads.

use tracing::{debug, warn};

use crate::constants::MAX_EXACT_SIGN_FLIP_SAMPLES;
use crate::error::{check_alpha, SpmError, SpmResult};
use crate::result::{InferenceResult, PermutationSummary};
use crate::statistics::{
    column_moments_rows, compute_design, compute_quantile, label_rows, label_space_size, one_sample_t,
    random_signs_into, shuffled_rows_into, sign_pattern_into, stack_matrices, stream_rng,
    subtract_mu, upper_tail_fraction, welch_f, welch_t, Design, Moments,
};
use crate::types::{Curves, Method};

use super::clusters::extract_clusters;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Parameters for one permutation inference run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PermutationInput {
    /// Family-wise significance level.
    pub alpha: f64,
    /// Test both tails (ignored for F fields).
    pub two_tailed: bool,
    /// Requested number of permutations.
    pub iterations: usize,
    /// Base seed for the permutation streams.
    pub seed: u64,
    /// Interpolate cluster endpoints.
    pub interp: bool,
}

/// How the null rearranges the data.
enum NullModel {
    /// Sign flips of difference curves (J×Q).
    SignFlip { d: Curves },
    /// Welch t under label permutation of two stacked groups.
    TwoSample { y: Curves, labels: Vec<usize> },
    /// Welch F under label permutation of k stacked groups.
    Anova { y: Curves, labels: Vec<usize> },
}

/// Per-worker buffers reused across permutations.
struct Scratch {
    signs: Vec<f64>,
    order: Vec<usize>,
    labels: Vec<usize>,
    column: Vec<Moments>,
}

impl NullModel {
    fn from_design(design: &Design) -> SpmResult<Self> {
        match design {
            Design::OneSample { y, mu } => Ok(NullModel::SignFlip { d: subtract_mu(y, mu)? }),
            Design::Paired { a, b } => Ok(NullModel::SignFlip { d: a - b }),
            Design::TwoSample { a, b } => {
                let (y, labels) = stack_matrices(&[a, b]);
                Ok(NullModel::TwoSample { y, labels })
            }
            Design::Anova { y, labels } => Ok(NullModel::Anova {
                y: y.clone(),
                labels: labels.clone(),
            }),
            Design::Regression { .. } | Design::Normality { .. } => Err(SpmError::UnsupportedCombination {
                test: design.kind().name(),
                method: Method::Nonparametric.name(),
            }),
        }
    }

    fn n_rows(&self) -> usize {
        match self {
            NullModel::SignFlip { d } => d.nrows(),
            NullModel::TwoSample { y, .. } | NullModel::Anova { y, .. } => y.nrows(),
        }
    }

    fn scratch(&self) -> Scratch {
        let n = self.n_rows();
        Scratch {
            signs: vec![1.0; n],
            order: (0..n).collect(),
            labels: vec![0; n],
            column: Vec::new(),
        }
    }

    /// Size of the arrangement space, saturating.
    fn space_size(&self) -> u128 {
        match self {
            NullModel::SignFlip { d } => {
                if d.nrows() >= 127 {
                    u128::MAX
                } else {
                    1u128 << d.nrows()
                }
            }
            NullModel::TwoSample { labels, .. } | NullModel::Anova { labels, .. } => {
                let sizes: Vec<usize> = label_rows(labels).iter().map(Vec::len).collect();
                label_space_size(&sizes)
            }
        }
    }

    /// Arrange the data for permutation `index` in `scratch`.
    fn arrange(&self, index: usize, exact: bool, seed: u64, scratch: &mut Scratch) {
        match self {
            NullModel::SignFlip { .. } => {
                if exact {
                    sign_pattern_into(index as u64, &mut scratch.signs);
                } else if index == 0 {
                    scratch.signs.fill(1.0);
                } else {
                    random_signs_into(&mut stream_rng(seed, index as u64), &mut scratch.signs);
                }
            }
            NullModel::TwoSample { labels, .. } | NullModel::Anova { labels, .. } => {
                if index == 0 {
                    scratch.labels.copy_from_slice(labels);
                } else {
                    shuffled_rows_into(&mut stream_rng(seed, index as u64), &mut scratch.order);
                    for (slot, &source) in scratch.labels.iter_mut().zip(scratch.order.iter()) {
                        *slot = labels[source];
                    }
                }
            }
        }
    }

    /// Maximum of the statistic field under the current arrangement.
    ///
    /// Timepoints where the statistic is undefined contribute zero.
    fn field_max(&self, scratch: &mut Scratch, two_tailed: bool) -> f64 {
        let fold = |best: f64, z: f64| best.max(if two_tailed { z.abs() } else { z });
        match self {
            NullModel::SignFlip { d } => {
                let rows = d.nrows();
                d.as_slice()
                    .chunks_exact(rows)
                    .map(|col| {
                        let m = Moments::from_values(col.iter().zip(&scratch.signs).map(|(v, s)| v * s));
                        one_sample_t(&m, 0.0).unwrap_or(0.0)
                    })
                    .fold(f64::NEG_INFINITY, fold)
            }
            NullModel::TwoSample { y, .. } => {
                let groups = label_rows(&scratch.labels);
                let (ma, mb) = (column_moments_rows(y, &groups[0]), column_moments_rows(y, &groups[1]));
                ma.iter()
                    .zip(&mb)
                    .map(|(a, b)| welch_t(a, b).map_or(0.0, |(t, _)| t))
                    .fold(f64::NEG_INFINITY, fold)
            }
            NullModel::Anova { y, .. } => {
                let moments: Vec<Vec<Moments>> = label_rows(&scratch.labels)
                    .iter()
                    .map(|rows| column_moments_rows(y, rows))
                    .collect();
                let mut best = f64::NEG_INFINITY;
                for q in 0..y.ncols() {
                    scratch.column.clear();
                    scratch.column.extend(moments.iter().map(|g| g[q]));
                    best = fold(best, welch_f(&scratch.column).map_or(0.0, |(f, _)| f));
                }
                best
            }
        }
    }
}

/// Build the max-statistic null distribution.
fn max_statistic_null(model: &NullModel, iterations: usize, exact: bool, seed: u64, two_tailed: bool) -> Vec<f64> {
    #[cfg(feature = "parallel")]
    let null: Vec<f64> = crate::thread_pool::install(|| {
        let mut out = vec![0.0_f64; iterations];

        out.par_iter_mut()
            .enumerate()
            .map_init(
                || model.scratch(),
                |scratch, (i, out)| {
                    model.arrange(i, exact, seed, scratch);
                    *out = model.field_max(scratch, two_tailed);
                },
            )
            .count(); // Force execution

        out
    });

    #[cfg(not(feature = "parallel"))]
    let null: Vec<f64> = {
        let mut scratch = model.scratch();
        (0..iterations)
            .map(|i| {
                model.arrange(i, exact, seed, &mut scratch);
                model.field_max(&mut scratch, two_tailed)
            })
            .collect()
    };

    null
}

/// Run permutation inference on a design.
///
/// The observed field is computed first so degenerate or undersized input is
/// reported exactly as the statistic engine reports it.
///
/// # Errors
///
/// * `InvalidParameter` for alpha outside (0, 1) or fewer than 2 iterations
/// * `UnsupportedCombination` for regression and K² designs
/// * anything the statistic engine returns for the observed data
pub fn run_permutation_inference(design: &Design, input: &PermutationInput) -> SpmResult<InferenceResult> {
    check_alpha(input.alpha)?;
    if input.iterations < 2 {
        return Err(SpmError::invalid(
            "iterations",
            format!("{} permutations is too few, need at least 2", input.iterations),
        ));
    }

    let model = NullModel::from_design(design)?;
    let stat = compute_design(design)?;
    let two_tailed = input.two_tailed && stat.supports_two_tailed();

    let space = model.space_size();
    let exact = matches!(model, NullModel::SignFlip { .. })
        && model.n_rows() <= MAX_EXACT_SIGN_FLIP_SAMPLES
        && space <= input.iterations as u128;
    let iterations = if exact { space as usize } else { input.iterations };
    if !exact && space < input.iterations as u128 {
        warn!(
            test = stat.kind().name(),
            requested = input.iterations,
            distinct = %space,
            "fewer distinct permutations than requested, sampling with repeats"
        );
    }

    let null = max_statistic_null(&model, iterations, exact, input.seed, two_tailed);
    let zstar = compute_quantile(&mut null.clone(), 1.0 - input.alpha)
        .ok_or_else(|| SpmError::invalid("iterations", "empty permutation distribution"))?;

    let clusters: Vec<_> = extract_clusters(stat.z(), zstar, two_tailed, input.interp)
        .into_iter()
        .map(|span| {
            let p = upper_tail_fraction(&null, span.height());
            span.into_cluster(p)
        })
        .collect();

    debug!(
        test = stat.kind().name(),
        iterations,
        exact,
        zstar,
        n_clusters = clusters.len(),
        "permutation inference complete"
    );

    Ok(InferenceResult {
        method: Method::Nonparametric,
        alpha: input.alpha,
        two_tailed,
        zstar,
        h0reject: !clusters.is_empty(),
        n_clusters: clusters.len(),
        clusters,
        p_set: None,
        smoothness: None,
        permutation: Some(PermutationSummary { iterations, exact }),
    })
}
