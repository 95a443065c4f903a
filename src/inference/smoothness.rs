//! Residual smoothness (FWHM) estimation.

use crate::config::SmoothnessEstimator;
use crate::constants::FOUR_LN2;
use crate::error::{SpmError, SpmResult};
use crate::result::Smoothness;
use crate::types::Curves;

/// Floor for the lag-1 autocorrelation before taking its log.
const MIN_AUTOCORRELATION: f64 = 1e-6;

/// Estimate the FWHM of the residual field.
///
/// # Errors
///
/// `DegenerateField` if no timepoint has non-zero residual variance.
pub fn estimate_smoothness(residuals: &Curves, estimator: SmoothnessEstimator) -> SpmResult<Smoothness> {
    let q = residuals.ncols();
    let ssq = node_sum_squares(residuals);
    if !ssq.iter().any(|s| *s > 0.0) {
        return Err(SpmError::degenerate("smoothness estimation", None));
    }

    let fwhm = if q < 2 {
        f64::INFINITY
    } else {
        match estimator {
            SmoothnessEstimator::Gradient => gradient_fwhm(residuals, &ssq),
            SmoothnessEstimator::Autocorrelation => autocorrelation_fwhm(residuals, &ssq),
        }
    };

    Ok(Smoothness {
        fwhm,
        resels: resel_count(q, fwhm),
    })
}

/// Resel count `(Q - 1) / FWHM`; zero for an infinitely smooth field.
pub fn resel_count(q: usize, fwhm: f64) -> f64 {
    if fwhm.is_finite() && fwhm > 0.0 {
        q.saturating_sub(1) as f64 / fwhm
    } else {
        0.0
    }
}

fn node_sum_squares(residuals: &Curves) -> Vec<f64> {
    residuals.column_iter().map(|c| c.iter().map(|v| v * v).sum()).collect()
}

/// Mean-squared gradient estimator.
///
/// `v(q) = Σ_j (∂R/∂q)² / Σ_j R²`, resels per node `sqrt(v / 4ln2)`,
/// `FWHM = 1 / mean(resels)`. Gradients are central differences, one-sided
/// at the boundaries.
fn gradient_fwhm(residuals: &Curves, ssq: &[f64]) -> f64 {
    let (rows, q) = residuals.shape();
    let mut total = 0.0;
    let mut used = 0usize;

    for node in 0..q {
        if ssq[node] <= 0.0 {
            continue;
        }
        let (lo, hi, span) = match node {
            0 => (0, 1, 1.0),
            n if n == q - 1 => (n - 1, n, 1.0),
            n => (n - 1, n + 1, 2.0),
        };
        let grad_ssq: f64 = (0..rows)
            .map(|j| ((residuals[(j, hi)] - residuals[(j, lo)]) / span).powi(2))
            .sum();
        total += (grad_ssq / ssq[node] / FOUR_LN2).sqrt();
        used += 1;
    }

    let mean_resels = total / used as f64;
    if mean_resels > 0.0 {
        1.0 / mean_resels
    } else {
        f64::INFINITY
    }
}

/// Lag-1 autocorrelation estimator on per-node standardized residuals.
///
/// For a Gaussian kernel, `ρ = exp(-d² · 4ln2 / (4 · FWHM²))` at unit lag,
/// hence `FWHM = sqrt(ln2 / (-0.5 ln ρ))`.
fn autocorrelation_fwhm(residuals: &Curves, ssq: &[f64]) -> f64 {
    let (rows, q) = residuals.shape();
    let scale: Vec<f64> = ssq.iter().map(|s| if *s > 0.0 { 1.0 / s.sqrt() } else { 0.0 }).collect();

    let mut cross = 0.0;
    let mut norm = 0.0;
    for node in 0..q - 1 {
        if scale[node] == 0.0 || scale[node + 1] == 0.0 {
            continue;
        }
        for j in 0..rows {
            let a = residuals[(j, node)] * scale[node];
            let b = residuals[(j, node + 1)] * scale[node + 1];
            cross += a * b;
            norm += 0.5 * (a * a + b * b);
        }
    }

    if norm <= 0.0 {
        return f64::INFINITY;
    }
    let rho = cross / norm;
    if rho >= 1.0 {
        return f64::INFINITY;
    }
    let rho = rho.max(MIN_AUTOCORRELATION);
    (std::f64::consts::LN_2 / (-0.5 * rho.ln())).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    /// Residuals built from Gaussian bumps of the given width.
    fn smooth_residuals(rows: usize, q: usize, width: f64) -> Curves {
        DMatrix::from_fn(rows, q, |j, t| {
            let centre = (j as f64 * 7.3) % q as f64;
            let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
            sign * (-((t as f64 - centre).powi(2)) / (2.0 * width * width)).exp()
                + 0.3 * ((t as f64) / width + j as f64).sin()
        })
    }

    #[test]
    fn test_constant_rows_are_infinitely_smooth() {
        let r = DMatrix::from_fn(6, 20, |j, _| j as f64 - 2.5);
        let s = estimate_smoothness(&r, SmoothnessEstimator::Gradient).unwrap();
        assert!(s.fwhm.is_infinite());
        assert_eq!(s.resels, 0.0);
    }

    #[test]
    fn test_all_zero_residuals_are_degenerate() {
        let r = DMatrix::zeros(5, 10);
        let err = estimate_smoothness(&r, SmoothnessEstimator::Gradient).unwrap_err();
        assert!(matches!(err, SpmError::DegenerateField { .. }));
    }

    #[test]
    fn test_single_timepoint() {
        let r = DMatrix::from_row_slice(3, 1, &[1.0, -2.0, 1.0]);
        let s = estimate_smoothness(&r, SmoothnessEstimator::Gradient).unwrap();
        assert!(s.fwhm.is_infinite());
    }

    #[test]
    fn test_smoother_field_has_larger_fwhm() {
        for estimator in [SmoothnessEstimator::Gradient, SmoothnessEstimator::Autocorrelation] {
            let rough = estimate_smoothness(&smooth_residuals(12, 101, 2.0), estimator).unwrap();
            let smooth = estimate_smoothness(&smooth_residuals(12, 101, 10.0), estimator).unwrap();
            assert!(
                smooth.fwhm > rough.fwhm,
                "{estimator:?}: smooth {} rough {}",
                smooth.fwhm,
                rough.fwhm
            );
            assert!((rough.resels - 100.0 / rough.fwhm).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_variance_nodes_are_skipped() {
        let mut r = smooth_residuals(8, 50, 5.0);
        let baseline = estimate_smoothness(&r, SmoothnessEstimator::Gradient).unwrap();
        for j in 0..8 {
            r[(j, 25)] = 0.0;
        }
        let skipped = estimate_smoothness(&r, SmoothnessEstimator::Gradient).unwrap();
        assert!(skipped.fwhm.is_finite());
        assert!((skipped.fwhm - baseline.fwhm).abs() / baseline.fwhm < 0.5);
    }
}
