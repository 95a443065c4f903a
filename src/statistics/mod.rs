//! Curve statistic engine.
//!
//! This module turns groups of curves into pointwise statistic fields:
//! - One-sample, paired and Welch two-sample t
//! - Welch one-way ANOVA F
//! - Simple regression t
//! - D'Agostino–Pearson K² normality
//!
//! plus the quantile and resampling primitives the permutation engine shares.

mod anova;
mod moments;
mod normality;
mod quantile;
mod regression;
mod resample;
mod ttest;

pub use anova::anova1;
pub use moments::{column_moments, column_moments_rows, one_sample_t, welch_f, welch_t, Moments};
pub use normality::k2;
pub use quantile::{compute_quantile, upper_tail_fraction};
pub use regression::regress;
pub use resample::{
    counter_rng_seed, label_space_size, random_signs_into, shuffled_rows_into, sign_pattern_into,
    stream_rng,
};
pub use ttest::{one_sample, paired, two_sample};

pub(crate) use anova::label_rows;
pub(crate) use ttest::subtract_mu;

use nalgebra::DMatrix;
use tracing::debug;

use crate::error::{SpmError, SpmResult};
use crate::result::StatisticResult;
use crate::types::{ensure_same_width, Curves, Group, Mu, TestKind};

/// Test-specific inputs that do not live in the groups themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignOptions {
    /// Reference for the one-sample t (default: scalar 0).
    pub mu: Mu,
    /// Scalar predictor for regression, one value per curve.
    pub x: Option<Vec<f64>>,
}

/// A fully specified test design: the matrices one statistic is computed from.
#[derive(Debug, Clone, PartialEq)]
pub enum Design {
    /// `Y` against `mu`.
    OneSample {
        /// Curves.
        y: Curves,
        /// Reference.
        mu: Mu,
    },
    /// Independent `A` versus `B`.
    TwoSample {
        /// First group.
        a: Curves,
        /// Second group.
        b: Curves,
    },
    /// Row-matched `A` versus `B`.
    Paired {
        /// First condition.
        a: Curves,
        /// Second condition.
        b: Curves,
    },
    /// Stacked curves with one group label per row.
    Anova {
        /// All curves, stacked.
        y: Curves,
        /// Group label per row.
        labels: Vec<usize>,
    },
    /// Curves regressed on `x`.
    Regression {
        /// Curves.
        y: Curves,
        /// Predictor, one value per row of `y`.
        x: Vec<f64>,
    },
    /// Pointwise normality of `y`.
    Normality {
        /// Curves.
        y: Curves,
    },
}

impl Design {
    /// Assemble the design for `kind` from named groups.
    ///
    /// # Errors
    ///
    /// * `InvalidParameter` for a group count the test cannot take, or a
    ///   missing regression predictor
    /// * `ShapeMismatch` if the groups disagree on Q
    pub fn from_groups(kind: TestKind, groups: &[Group], options: &DesignOptions) -> SpmResult<Self> {
        ensure_same_width(groups, kind.name())?;

        let single = || match groups {
            [g] => Ok(g.data.clone()),
            _ => Err(SpmError::invalid(
                "groups",
                format!("{} takes exactly 1 group, got {}", kind.name(), groups.len()),
            )),
        };
        let pair = || match groups {
            [a, b] => Ok((a.data.clone(), b.data.clone())),
            _ => Err(SpmError::invalid(
                "groups",
                format!("{} takes exactly 2 groups, got {}", kind.name(), groups.len()),
            )),
        };

        match kind {
            TestKind::OneSampleT => Ok(Design::OneSample {
                y: single()?,
                mu: options.mu.clone(),
            }),
            TestKind::TwoSampleT => {
                let (a, b) = pair()?;
                Ok(Design::TwoSample { a, b })
            }
            TestKind::PairedT => {
                let (a, b) = pair()?;
                Ok(Design::Paired { a, b })
            }
            TestKind::Anova1 => {
                if groups.len() < 2 {
                    return Err(SpmError::InsufficientData {
                        test: "one-way ANOVA",
                        required: 2,
                        actual: groups.len(),
                    });
                }
                let (y, labels) = stack_groups(groups);
                Ok(Design::Anova { y, labels })
            }
            TestKind::Regression => {
                let x = options
                    .x
                    .clone()
                    .ok_or_else(|| SpmError::invalid("x", "regression needs a predictor"))?;
                Ok(Design::Regression { y: single()?, x })
            }
            TestKind::NormalityK2 => Ok(Design::Normality { y: single()? }),
        }
    }

    /// Test kind this design feeds.
    pub fn kind(&self) -> TestKind {
        match self {
            Design::OneSample { .. } => TestKind::OneSampleT,
            Design::TwoSample { .. } => TestKind::TwoSampleT,
            Design::Paired { .. } => TestKind::PairedT,
            Design::Anova { .. } => TestKind::Anova1,
            Design::Regression { .. } => TestKind::Regression,
            Design::Normality { .. } => TestKind::NormalityK2,
        }
    }
}

/// Stack groups row-wise; row labels are group positions.
pub(crate) fn stack_groups(groups: &[Group]) -> (Curves, Vec<usize>) {
    let parts: Vec<&Curves> = groups.iter().map(|g| &g.data).collect();
    stack_matrices(&parts)
}

/// Stack matrices of equal width row-wise; row labels are part positions.
pub(crate) fn stack_matrices(parts: &[&Curves]) -> (Curves, Vec<usize>) {
    let rows: usize = parts.iter().map(|p| p.nrows()).sum();
    let q = parts.first().map_or(0, |p| p.ncols());
    let mut y = DMatrix::zeros(rows, q);
    let mut labels = Vec::with_capacity(rows);
    let mut offset = 0;
    for (i, part) in parts.iter().enumerate() {
        y.rows_mut(offset, part.nrows()).copy_from(*part);
        labels.extend(std::iter::repeat(i).take(part.nrows()));
        offset += part.nrows();
    }
    (y, labels)
}

/// Compute the statistic field of `kind` over `groups`.
///
/// # Errors
///
/// See [`Design::from_groups`] and the individual tests.
pub fn compute(kind: TestKind, groups: &[Group], options: &DesignOptions) -> SpmResult<StatisticResult> {
    compute_design(&Design::from_groups(kind, groups, options)?)
}

/// Compute the statistic field of an assembled design.
pub fn compute_design(design: &Design) -> SpmResult<StatisticResult> {
    debug!(test = design.kind().name(), "computing statistic field");
    Ok(match design {
        Design::OneSample { y, mu } => StatisticResult::OneSampleT(one_sample(y, mu)?),
        Design::TwoSample { a, b } => StatisticResult::TwoSampleT(two_sample(a, b)?),
        Design::Paired { a, b } => StatisticResult::PairedT(paired(a, b)?),
        Design::Anova { y, labels } => StatisticResult::Anova1(anova1(y, labels)?),
        Design::Regression { y, x } => StatisticResult::Regression(regress(y, x)?),
        Design::Normality { y } => StatisticResult::NormalityK2(k2(y)?),
    })
}

pub(crate) fn check_nonempty(y: &Curves, context: &'static str) -> SpmResult<()> {
    if y.ncols() == 0 || y.nrows() == 0 {
        return Err(SpmError::shape(
            context,
            format!("curves are {}×{}", y.nrows(), y.ncols()),
        ));
    }
    Ok(())
}

pub(crate) fn check_min_samples(n: usize, required: usize, test: &'static str) -> SpmResult<()> {
    if n < required {
        return Err(SpmError::InsufficientData {
            test,
            required,
            actual: n,
        });
    }
    Ok(())
}

pub(crate) fn check_finite(y: &Curves, name: &'static str) -> SpmResult<()> {
    match y.iter().position(|v| !v.is_finite()) {
        None => Ok(()),
        Some(idx) => {
            // column-major storage
            let (j, q) = (idx % y.nrows(), idx / y.nrows());
            Err(SpmError::invalid(name, format!("non-finite value at sample {j}, timepoint {q}")))
        }
    }
}
