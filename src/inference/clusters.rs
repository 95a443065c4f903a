//! Suprathreshold cluster extraction.

use crate::result::Cluster;
use crate::types::Tail;

/// A suprathreshold run before a p-value has been attached.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClusterSpan {
    pub start: usize,
    pub end: usize,
    pub endpoints: (f64, f64),
    pub peak: f64,
    pub tail: Tail,
}

impl ClusterSpan {
    /// Continuous width used for extent probabilities; a zero-width
    /// single-node cluster counts as one node.
    pub fn effective_width(&self) -> f64 {
        let w = self.endpoints.1 - self.endpoints.0;
        if w > 0.0 {
            w
        } else {
            1.0
        }
    }

    /// Height above the threshold side: `peak` for upper clusters, `-peak` for lower.
    pub fn height(&self) -> f64 {
        match self.tail {
            Tail::Upper => self.peak,
            Tail::Lower => -self.peak,
        }
    }

    pub fn into_cluster(self, p_value: f64) -> Cluster {
        Cluster {
            start_index: self.start,
            end_index: self.end,
            extent: self.end - self.start + 1,
            endpoints: self.endpoints,
            peak: self.peak,
            tail: self.tail,
            p_value,
        }
    }
}

/// Find every maximal run of `z > zstar` (and `z < -zstar` when two-tailed),
/// ordered by start index.
pub(crate) fn extract_clusters(z: &[f64], zstar: f64, two_tailed: bool, interp: bool) -> Vec<ClusterSpan> {
    let mut spans = runs(z, zstar, Tail::Upper, interp);
    if two_tailed {
        spans.extend(runs(z, zstar, Tail::Lower, interp));
        spans.sort_by_key(|s| s.start);
    }
    spans
}

fn runs(z: &[f64], u: f64, tail: Tail, interp: bool) -> Vec<ClusterSpan> {
    // Work on the tail-oriented field so both tails share one code path.
    let sign = match tail {
        Tail::Upper => 1.0,
        Tail::Lower => -1.0,
    };
    let oriented: Vec<f64> = z.iter().map(|v| sign * v).collect();

    let mut spans = Vec::new();
    let mut q = 0;
    while q < oriented.len() {
        if oriented[q] <= u || oriented[q].is_nan() {
            q += 1;
            continue;
        }
        let start = q;
        while q < oriented.len() && oriented[q] > u {
            q += 1;
        }
        let end = q - 1;

        let peak_oriented = oriented[start..=end].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let endpoints = if interp {
            interpolated_endpoints(&oriented, u, start, end)
        } else {
            (start as f64, end as f64)
        };

        spans.push(ClusterSpan {
            start,
            end,
            endpoints,
            peak: sign * peak_oriented,
            tail,
        });
    }
    spans
}

/// Linear threshold crossings on either side of `[start, end]`.
fn interpolated_endpoints(z: &[f64], u: f64, start: usize, end: usize) -> (f64, f64) {
    let mut left = start as f64;
    if start > 0 {
        let (z0, z1) = (z[start - 1], z[start]);
        let x = start as f64 - (z1 - u) / (z1 - z0);
        if x.is_finite() {
            left = x;
        }
    }

    let mut right = end as f64;
    if end + 1 < z.len() {
        let (z0, z1) = (z[end], z[end + 1]);
        let x = end as f64 + (z0 - u) / (z0 - z1);
        if x.is_finite() {
            right = x;
        }
    }
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_clusters_below_threshold() {
        let z = [0.0, 1.0, 2.0, 1.0, 0.0];
        assert!(extract_clusters(&z, 2.5, true, true).is_empty());
    }

    #[test]
    fn test_single_upper_cluster_without_interp() {
        let z = [0.0, 3.0, 4.0, 3.5, 0.0];
        let spans = extract_clusters(&z, 2.0, false, false);
        assert_eq!(spans.len(), 1);
        let c = spans[0].clone().into_cluster(0.01);
        assert_eq!((c.start_index, c.end_index, c.extent), (1, 3, 3));
        assert_eq!(c.endpoints, (1.0, 3.0));
        assert_eq!(c.peak, 4.0);
        assert_eq!(c.tail, Tail::Upper);
    }

    #[test]
    fn test_interpolated_endpoints() {
        // Crosses 2.0 halfway between 0→1 and three quarters between 3→4.
        let z = [1.0, 3.0, 4.0, 3.0, 0.0];
        let spans = extract_clusters(&z, 2.0, false, true);
        let (x0, x1) = spans[0].endpoints;
        assert!((x0 - 0.5).abs() < 1e-12, "x0 = {x0}");
        assert!((x1 - (3.0 + 1.0 / 3.0)).abs() < 1e-12, "x1 = {x1}");
    }

    #[test]
    fn test_cluster_touching_boundary_keeps_node_index() {
        let z = [5.0, 5.0, 0.0];
        let spans = extract_clusters(&z, 2.0, false, true);
        assert_eq!(spans[0].endpoints.0, 0.0);
    }

    #[test]
    fn test_two_tailed_orders_by_start() {
        let z = [-4.0, -3.0, 0.0, 3.0, 0.0, -5.0];
        let spans = extract_clusters(&z, 2.0, true, false);
        let tails: Vec<Tail> = spans.iter().map(|s| s.tail).collect();
        assert_eq!(tails, vec![Tail::Lower, Tail::Upper, Tail::Lower]);
        assert_eq!(spans[0].peak, -4.0);
        assert_eq!(spans[0].height(), 4.0);
        assert_eq!(spans[2].start, 5);

        // One-tailed ignores the lower tail.
        assert_eq!(extract_clusters(&z, 2.0, false, false).len(), 1);
    }

    #[test]
    fn test_single_node_width_floor() {
        let z = [0.0, 3.0, 0.0];
        let spans = extract_clusters(&z, 2.0, false, false);
        assert_eq!(spans[0].effective_width(), 1.0);
    }
}
