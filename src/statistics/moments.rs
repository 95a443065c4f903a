//! Per-timepoint moments and the scalar statistic kernels built on them.
//!
//! The statistic engine and the permutation engine share these kernels so the
//! observed field and every null field are computed by the same arithmetic.
//! Kernels return `None` where the statistic is undefined (vanishing
//! denominator); callers decide whether that is an error or a zero.

use crate::types::Curves;

/// Sample count, mean and unbiased variance of one timepoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    /// Number of values.
    pub n: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample variance (n-1 denominator); 0 for n < 2.
    pub var: f64,
}

impl Moments {
    /// Two-pass mean and variance of a sequence.
    pub fn from_values<I>(values: I) -> Self
    where
        I: Iterator<Item = f64> + Clone,
    {
        let (n, sum) = values.clone().fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
        if n == 0 {
            return Self {
                n: 0,
                mean: 0.0,
                var: 0.0,
            };
        }
        let mean = sum / n as f64;
        let var = if n > 1 {
            values.map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        Self { n, mean, var }
    }

    /// Sample standard deviation.
    pub fn sd(&self) -> f64 {
        self.var.sqrt()
    }
}

/// Columns of `y` as contiguous slices (storage is column-major).
pub(crate) fn columns(y: &Curves) -> impl Iterator<Item = &[f64]> {
    y.as_slice().chunks_exact(y.nrows().max(1))
}

/// Moments of every column of `y`.
pub fn column_moments(y: &Curves) -> Vec<Moments> {
    columns(y).map(|col| Moments::from_values(col.iter().copied())).collect()
}

/// Moments of every column of `y`, restricted to the given rows.
pub fn column_moments_rows(y: &Curves, rows: &[usize]) -> Vec<Moments> {
    columns(y)
        .map(|col| Moments::from_values(rows.iter().map(|&j| col[j])))
        .collect()
}

/// One-sample t of a timepoint against `mu`.
pub fn one_sample_t(m: &Moments, mu: f64) -> Option<f64> {
    let se = m.sd() / (m.n as f64).sqrt();
    if se > 0.0 && se.is_finite() {
        Some((m.mean - mu) / se)
    } else {
        None
    }
}

/// Welch t and Welch–Satterthwaite df of one timepoint.
pub fn welch_t(a: &Moments, b: &Moments) -> Option<(f64, f64)> {
    let va = a.var / a.n as f64;
    let vb = b.var / b.n as f64;
    let se_sq = va + vb;
    if se_sq <= 0.0 || !se_sq.is_finite() {
        return None;
    }

    let t = (a.mean - b.mean) / se_sq.sqrt();
    let df = se_sq.powi(2) / (va * va / (a.n - 1) as f64 + vb * vb / (b.n - 1) as f64);
    Some((t, df))
}

/// Welch one-way F and its denominator df for one timepoint.
///
/// ```text
/// w_i = n_i / s_i²,  W = Σ w_i,  ȳ_w = Σ w_i ȳ_i / W
/// A   = Σ w_i (ȳ_i - ȳ_w)² / (k - 1)
/// λ   = Σ (1 - w_i / W)² / (n_i - 1)
/// F   = A / (1 + 2(k - 2) λ / (k² - 1)),   ν₂ = (k² - 1) / (3λ)
/// ```
pub fn welch_f(groups: &[Moments]) -> Option<(f64, f64)> {
    let k = groups.len();
    if k < 2 || groups.iter().any(|g| g.var <= 0.0 || g.n < 2) {
        return None;
    }

    let kf = k as f64;
    let weights: Vec<f64> = groups.iter().map(|g| g.n as f64 / g.var).collect();
    let w_sum: f64 = weights.iter().sum();
    let weighted_mean = groups
        .iter()
        .zip(&weights)
        .map(|(g, w)| w * g.mean)
        .sum::<f64>()
        / w_sum;

    let between = groups
        .iter()
        .zip(&weights)
        .map(|(g, w)| w * (g.mean - weighted_mean).powi(2))
        .sum::<f64>()
        / (kf - 1.0);

    let lambda = groups
        .iter()
        .zip(&weights)
        .map(|(g, w)| (1.0 - w / w_sum).powi(2) / (g.n - 1) as f64)
        .sum::<f64>();

    let denom = 1.0 + 2.0 * (kf - 2.0) * lambda / (kf * kf - 1.0);
    let f = between / denom;
    let df2 = if lambda > 0.0 {
        (kf * kf - 1.0) / (3.0 * lambda)
    } else {
        f64::INFINITY
    };

    f.is_finite().then_some((f, df2))
}
