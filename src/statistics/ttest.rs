//! One-sample, paired and Welch two-sample t fields.

use nalgebra::DMatrix;

use crate::error::{SpmError, SpmResult};
use crate::result::{Dof, FieldBase, TField, WelchTField};
use crate::types::{Curves, Mu};

use super::moments::{column_moments, one_sample_t, welch_t};
use super::{check_finite, check_min_samples, check_nonempty};

/// One-sample t field of `y` against `mu`.
///
/// `t(q) = (mean(Y[:,q]) - mu(q)) / (sd(Y[:,q]) / sqrt(J))`
///
/// # Errors
///
/// * `InsufficientData` if J < 2
/// * `ShapeMismatch` if `mu` does not broadcast to J×Q
/// * `InvalidParameter` on non-finite input
/// * `DegenerateField` at the first zero-variance timepoint
pub fn one_sample(y: &Curves, mu: &Mu) -> SpmResult<TField> {
    check_nonempty(y, "one-sample t")?;
    check_min_samples(y.nrows(), 2, "one-sample t")?;
    check_finite(y, "Y")?;

    let centered = subtract_mu(y, mu)?;
    t_from_differences(&centered, "one-sample t")
}

/// Paired t field on the per-sample difference `a - b`.
///
/// # Errors
///
/// * `ShapeMismatch` if the groups differ in sample or timepoint count
/// * plus everything [`one_sample`] returns
pub fn paired(a: &Curves, b: &Curves) -> SpmResult<TField> {
    if a.shape() != b.shape() {
        return Err(SpmError::shape(
            "paired t",
            format!("A is {}×{}, B is {}×{}", a.nrows(), a.ncols(), b.nrows(), b.ncols()),
        ));
    }
    check_nonempty(a, "paired t")?;
    check_min_samples(a.nrows(), 2, "paired t")?;
    check_finite(a, "YA")?;
    check_finite(b, "YB")?;

    t_from_differences(&(a - b), "paired t")
}

/// Welch two-sample t field of `a` versus `b`.
///
/// Degrees of freedom are computed per timepoint with Welch–Satterthwaite;
/// the scalar df used for inference is their mean.
///
/// # Errors
///
/// * `InsufficientData` if either group has fewer than 2 samples
/// * `ShapeMismatch` if the groups differ in Q
/// * `InvalidParameter` on non-finite input
/// * `DegenerateField` where both groups have zero variance
pub fn two_sample(a: &Curves, b: &Curves) -> SpmResult<WelchTField> {
    if a.ncols() != b.ncols() {
        return Err(SpmError::shape(
            "two-sample t",
            format!("A has {} timepoints, B has {}", a.ncols(), b.ncols()),
        ));
    }
    check_nonempty(a, "two-sample t")?;
    check_min_samples(a.nrows(), 2, "two-sample t")?;
    check_min_samples(b.nrows(), 2, "two-sample t")?;
    check_finite(a, "YA")?;
    check_finite(b, "YB")?;

    let ma = column_moments(a);
    let mb = column_moments(b);

    let mut z = Vec::with_capacity(ma.len());
    let mut pointwise_dof = Vec::with_capacity(ma.len());
    for (q, (ca, cb)) in ma.iter().zip(&mb).enumerate() {
        let (t, df) = welch_t(ca, cb).ok_or_else(|| SpmError::degenerate("two-sample t", Some(q)))?;
        z.push(t);
        pointwise_dof.push(df);
    }

    let na = a.nrows();
    let residuals = DMatrix::from_fn(na + b.nrows(), a.ncols(), |j, q| {
        if j < na {
            a[(j, q)] - ma[q].mean
        } else {
            b[(j - na, q)] - mb[q].mean
        }
    });

    let dof = Dof {
        numerator: 1.0,
        denominator: pointwise_dof.iter().sum::<f64>() / pointwise_dof.len() as f64,
    };

    Ok(WelchTField {
        base: FieldBase {
            z,
            dof,
            residuals,
            n_samples: na + b.nrows(),
        },
        mean_a: ma.iter().map(|m| m.mean).collect(),
        mean_b: mb.iter().map(|m| m.mean).collect(),
        pointwise_dof,
    })
}

/// Broadcast `mu` against `y` and return `y - mu`.
pub(crate) fn subtract_mu(y: &Curves, mu: &Mu) -> SpmResult<Curves> {
    let (j, q) = y.shape();
    match mu {
        Mu::Scalar(m) => {
            if !m.is_finite() {
                return Err(SpmError::invalid("mu", format!("{m} is not finite")));
            }
            Ok(y.map(|v| v - m))
        }
        Mu::Curve(curve) => {
            if curve.len() != q {
                return Err(SpmError::shape(
                    "one-sample t",
                    format!("mu has {} timepoints, Y has {q}", curve.len()),
                ));
            }
            if curve.iter().any(|v| !v.is_finite()) {
                return Err(SpmError::invalid("mu", "reference curve contains non-finite values"));
            }
            Ok(DMatrix::from_fn(j, q, |r, c| y[(r, c)] - curve[c]))
        }
        Mu::Curves(reference) => {
            check_finite(reference, "mu")?;
            match reference.shape() {
                (1, cols) if cols == q => Ok(DMatrix::from_fn(j, q, |r, c| y[(r, c)] - reference[(0, c)])),
                (rows, cols) if rows == j && cols == q => Ok(y - reference),
                (rows, cols) => Err(SpmError::shape(
                    "one-sample t",
                    format!("mu is {rows}×{cols}, expected 1×{q} or {j}×{q}"),
                )),
            }
        }
    }
}

/// t field of difference curves against zero.
fn t_from_differences(d: &Curves, context: &'static str) -> SpmResult<TField> {
    let moments = column_moments(d);

    let mut z = Vec::with_capacity(moments.len());
    for (q, m) in moments.iter().enumerate() {
        z.push(one_sample_t(m, 0.0).ok_or_else(|| SpmError::degenerate(context, Some(q)))?);
    }

    let residuals = DMatrix::from_fn(d.nrows(), d.ncols(), |j, q| d[(j, q)] - moments[q].mean);

    Ok(TField {
        base: FieldBase {
            z,
            dof: Dof {
                numerator: 1.0,
                denominator: (d.nrows() - 1) as f64,
            },
            residuals,
            n_samples: d.nrows(),
        },
        mean: moments.iter().map(|m| m.mean).collect(),
        sd: moments.iter().map(|m| m.sd()).collect(),
    })
}
