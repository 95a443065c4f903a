//! Quantile computation using O(n) selection.
//!
//! Uses `slice.select_nth_unstable_by()` (introselect) for O(n) average time,
//! which matters when the permutation null has tens of thousands of entries.

/// Compute a single quantile from a mutable slice.
///
/// Uses the "R-7" definition (linear interpolation between order statistics).
/// The slice is partially reordered as a side effect.
///
/// # Arguments
///
/// * `data` - Mutable slice of values (will be partially reordered)
/// * `p` - Quantile probability, clamped to [0, 1]
///
/// # Returns
///
/// The quantile value at probability `p`, or `None` for an empty slice.
pub fn compute_quantile(data: &mut [f64], p: f64) -> Option<f64> {
    let n = data.len();
    match n {
        0 => return None,
        1 => return Some(data[0]),
        _ => {}
    }
    let p = p.clamp(0.0, 1.0);

    let h = (n - 1) as f64 * p;
    let h_floor = h.floor() as usize;
    let h_frac = h - h.floor();

    if h_floor >= n - 1 {
        let (_, &mut max, _) = data.select_nth_unstable_by(n - 1, |a, b| a.total_cmp(b));
        return Some(max);
    }

    let (_, &mut lower, upper) = data.select_nth_unstable_by(h_floor, |a, b| a.total_cmp(b));

    if h_frac == 0.0 {
        return Some(lower);
    }

    // Minimum of the upper partition is the next order statistic
    let upper_min = upper.iter().copied().min_by(|a, b| a.total_cmp(b)).unwrap_or(lower);

    Some(lower + h_frac * (upper_min - lower))
}

/// Fraction of `data` at or above `value`.
pub fn upper_tail_fraction(data: &[f64], value: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().filter(|&&d| d >= value).count() as f64 / data.len() as f64
}
