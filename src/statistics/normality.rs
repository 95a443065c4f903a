//! D'Agostino–Pearson K² omnibus normality field.
//!
//! Each timepoint's sample is reduced to its skewness and kurtosis, both
//! transformed to approximately standard normal scores, and combined as
//! `K² = Z_s² + Z_k²` which is approximately χ² with 2 df under normality.

use nalgebra::DMatrix;

use crate::constants::K2_MIN_SAMPLES;
use crate::error::{SpmError, SpmResult};
use crate::result::{Dof, FieldBase, K2Field};
use crate::types::Curves;

use super::moments::columns;
use super::{check_finite, check_min_samples, check_nonempty};

/// Biased central moments m2, m3, m4 and the mean.
fn central_moments(values: impl Iterator<Item = f64> + Clone) -> (f64, f64, f64, f64) {
    let (n, sum) = values.clone().fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    let n = n as f64;
    let mean = sum / n;
    let (m2, m3, m4) = values.fold((0.0, 0.0, 0.0), |(a, b, c), v| {
        let d = v - mean;
        let d2 = d * d;
        (a + d2, b + d2 * d, c + d2 * d2)
    });
    (mean, m2 / n, m3 / n, m4 / n)
}

/// D'Agostino's transform of sample skewness `b1` to a normal score.
pub(crate) fn skew_z(b1: f64, n: f64) -> f64 {
    let y = b1 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    let ya = y / alpha;
    delta * (ya + (ya * ya + 1.0).sqrt()).ln()
}

/// Anscombe–Glynn transform of sample kurtosis `b2` to a normal score.
pub(crate) fn kurtosis_z(b2: f64, n: f64) -> f64 {
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let var = 24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0).powi(2) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / var.sqrt();
    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0 + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    let term2 = ((1.0 - 2.0 / a) / denom).cbrt();
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}

/// K² normality field of `y`, one value per timepoint.
///
/// # Errors
///
/// * `InsufficientData` if J < 8
/// * `InvalidParameter` on non-finite input
/// * `DegenerateField` at a timepoint with zero variance
pub fn k2(y: &Curves) -> SpmResult<K2Field> {
    check_nonempty(y, "K2 normality")?;
    check_min_samples(y.nrows(), K2_MIN_SAMPLES, "K2 normality")?;
    check_finite(y, "Y")?;

    let n = y.nrows() as f64;
    let q_len = y.ncols();
    let mut z = Vec::with_capacity(q_len);
    let mut z_skew = Vec::with_capacity(q_len);
    let mut z_kurtosis = Vec::with_capacity(q_len);
    let mut means = Vec::with_capacity(q_len);

    for (q, col) in columns(y).enumerate() {
        let (mean, m2, m3, m4) = central_moments(col.iter().copied());
        if m2 <= 0.0 {
            return Err(SpmError::degenerate("K2 normality", Some(q)));
        }
        let zs = skew_z(m3 / m2.powf(1.5), n);
        let zk = kurtosis_z(m4 / (m2 * m2), n);
        z.push(zs * zs + zk * zk);
        z_skew.push(zs);
        z_kurtosis.push(zk);
        means.push(mean);
    }

    let residuals = DMatrix::from_fn(y.nrows(), q_len, |j, q| y[(j, q)] - means[q]);

    Ok(K2Field {
        base: FieldBase {
            z,
            dof: Dof {
                numerator: 1.0,
                denominator: 2.0,
            },
            residuals,
            n_samples: y.nrows(),
        },
        z_skew,
        z_kurtosis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f64]) -> Curves {
        DMatrix::from_row_slice(values.len(), 1, values)
    }

    #[test]
    fn test_symmetric_sample_has_zero_skew() {
        let y = column(&[-4.0, -3.0, -2.0, -1.0, 1.0, 2.0, 3.0, 4.0]);
        let field = k2(&y).unwrap();
        assert!(field.z_skew[0].abs() < 1e-12);
        // Uniform-like spacing is platykurtic.
        assert!(field.z_kurtosis[0] < 0.0);
        assert!(field.base.z[0] >= 0.0);
    }

    #[test]
    fn test_heavy_outlier_is_flagged() {
        let y = column(&[0.1, -0.2, 0.0, 0.3, -0.1, 0.2, -0.3, 0.05, 0.15, -0.05, 25.0]);
        let field = k2(&y).unwrap();
        assert!(field.z_skew[0] > 2.0);
        assert!(field.z_kurtosis[0] > 2.0);
        assert!(field.base.z[0] > 10.0);
    }

    #[test]
    fn test_minimum_sample_count() {
        let y = DMatrix::from_fn(7, 5, |j, q| (j * q) as f64 + j as f64);
        let err = k2(&y).unwrap_err();
        assert_eq!(
            err,
            SpmError::InsufficientData {
                test: "K2 normality",
                required: 8,
                actual: 7
            }
        );
    }

    #[test]
    fn test_constant_column_is_degenerate() {
        let y = DMatrix::from_fn(10, 3, |j, q| if q == 1 { 2.0 } else { j as f64 * 0.7 + q as f64 });
        assert_eq!(k2(&y).unwrap_err(), SpmError::degenerate("K2 normality", Some(1)));
    }
}
