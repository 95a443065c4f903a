//! Simple linear regression of curves on a scalar predictor.

use nalgebra::DMatrix;

use crate::error::{SpmError, SpmResult};
use crate::result::{Dof, FieldBase, RegressionField};
use crate::types::Curves;

use super::{check_finite, check_min_samples, check_nonempty};

/// Regress every column of `y` on `x` and convert the correlation to t.
///
/// ```text
/// r(q) = Sxy / sqrt(Sxx · Syy)
/// t(q) = r · sqrt((J - 2) / (1 - r²))
/// ```
///
/// `1 - r²` is floored at machine epsilon so a perfect fit yields a large
/// finite t instead of infinity.
///
/// # Errors
///
/// * `InsufficientData` if J < 3
/// * `ShapeMismatch` if `x.len() != J`
/// * `InvalidParameter` if `x` is constant or anything is non-finite
/// * `DegenerateField` at a timepoint where `y` is constant
pub fn regress(y: &Curves, x: &[f64]) -> SpmResult<RegressionField> {
    check_nonempty(y, "simple regression")?;
    check_min_samples(y.nrows(), 3, "simple regression")?;
    if x.len() != y.nrows() {
        return Err(SpmError::shape(
            "simple regression",
            format!("x has {} values, Y has {} curves", x.len(), y.nrows()),
        ));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SpmError::invalid("x", "predictor contains non-finite values"));
    }
    check_finite(y, "Y")?;

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let sxx: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
    if sxx <= 0.0 {
        return Err(SpmError::invalid("x", "predictor is constant"));
    }

    let q_len = y.ncols();
    let mut z = Vec::with_capacity(q_len);
    let mut slope = Vec::with_capacity(q_len);
    let mut intercept = Vec::with_capacity(q_len);
    let mut r = Vec::with_capacity(q_len);
    let df = n - 2.0;

    for (q, col) in y.column_iter().enumerate() {
        let y_mean = col.mean();
        let mut sxy = 0.0;
        let mut syy = 0.0;
        for (xi, yi) in x.iter().zip(col.iter()) {
            sxy += (xi - x_mean) * (yi - y_mean);
            syy += (yi - y_mean).powi(2);
        }
        if syy <= 0.0 {
            return Err(SpmError::degenerate("simple regression", Some(q)));
        }

        let rq = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
        let b = sxy / sxx;
        let one_minus_r2 = (1.0 - rq * rq).max(f64::EPSILON);

        z.push(rq * (df / one_minus_r2).sqrt());
        slope.push(b);
        intercept.push(y_mean - b * x_mean);
        r.push(rq);
    }

    let residuals = DMatrix::from_fn(y.nrows(), q_len, |j, q| y[(j, q)] - (intercept[q] + slope[q] * x[j]));

    Ok(RegressionField {
        base: FieldBase {
            z,
            dof: Dof {
                numerator: 1.0,
                denominator: df,
            },
            residuals,
            n_samples: y.nrows(),
        },
        slope,
        intercept,
        r,
    })
}
