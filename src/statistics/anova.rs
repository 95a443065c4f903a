//! One-way ANOVA with unequal group variances (Welch's F).

use nalgebra::DMatrix;

use crate::error::{SpmError, SpmResult};
use crate::result::{Dof, FField, FieldBase};
use crate::types::Curves;

use super::moments::{column_moments_rows, welch_f, Moments};
use super::{check_finite, check_nonempty};

/// Row indices of each distinct label, ordered by label value.
pub(crate) fn label_rows(labels: &[usize]) -> Vec<Vec<usize>> {
    let mut levels: Vec<usize> = labels.to_vec();
    levels.sort_unstable();
    levels.dedup();
    levels
        .iter()
        .map(|&level| {
            labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == level)
                .map(|(j, _)| j)
                .collect()
        })
        .collect()
}

/// Welch one-way F field of stacked curves `y` with group labels `labels`.
///
/// Labels may be any integers; each distinct value is one group.
///
/// # Errors
///
/// * `ShapeMismatch` if `labels.len() != y.nrows()`
/// * `InsufficientData` with fewer than 2 groups or a group under 2 samples
/// * `InvalidParameter` on non-finite input
/// * `DegenerateField` where some group has zero variance
pub fn anova1(y: &Curves, labels: &[usize]) -> SpmResult<FField> {
    if labels.len() != y.nrows() {
        return Err(SpmError::shape(
            "one-way ANOVA",
            format!("{} labels for {} curves", labels.len(), y.nrows()),
        ));
    }
    check_nonempty(y, "one-way ANOVA")?;
    check_finite(y, "Y")?;

    let groups = label_rows(labels);
    if groups.len() < 2 {
        return Err(SpmError::InsufficientData {
            test: "one-way ANOVA",
            required: 2,
            actual: groups.len(),
        });
    }
    if let Some(small) = groups.iter().find(|g| g.len() < 2) {
        return Err(SpmError::InsufficientData {
            test: "one-way ANOVA group",
            required: 2,
            actual: small.len(),
        });
    }

    // moments[g][q]
    let moments: Vec<Vec<Moments>> = groups.iter().map(|rows| column_moments_rows(y, rows)).collect();

    let q_len = y.ncols();
    let mut z = Vec::with_capacity(q_len);
    let mut pointwise_dof = Vec::with_capacity(q_len);
    let mut column = Vec::with_capacity(groups.len());
    for q in 0..q_len {
        column.clear();
        column.extend(moments.iter().map(|g| g[q]));
        let (f, df2) = welch_f(&column).ok_or_else(|| SpmError::degenerate("one-way ANOVA", Some(q)))?;
        z.push(f);
        pointwise_dof.push(df2);
    }

    let mut group_of = vec![0usize; y.nrows()];
    for (g, rows) in groups.iter().enumerate() {
        for &j in rows {
            group_of[j] = g;
        }
    }
    let residuals = DMatrix::from_fn(y.nrows(), q_len, |j, q| y[(j, q)] - moments[group_of[j]][q].mean);

    let dof = Dof {
        numerator: (groups.len() - 1) as f64,
        denominator: pointwise_dof.iter().sum::<f64>() / q_len as f64,
    };

    Ok(FField {
        base: FieldBase {
            z,
            dof,
            residuals,
            n_samples: y.nrows(),
        },
        n_groups: groups.len(),
        pointwise_dof,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacked() -> (Curves, Vec<usize>) {
        let rows: [[f64; 3]; 9] = [
            [5.0, 1.0, 2.0],
            [6.0, 1.5, 2.5],
            [7.0, 2.5, 2.0],
            [8.0, 3.0, 4.0],
            [9.0, 3.5, 4.5],
            [8.5, 2.0, 5.0],
            [4.0, 1.0, 1.5],
            [3.0, 0.5, 1.0],
            [3.5, 2.0, 2.5],
        ];
        let y = DMatrix::from_fn(9, 3, |j, q| rows[j][q]);
        (y, vec![0, 0, 0, 1, 1, 1, 2, 2, 2])
    }

    #[test]
    fn test_anova_shapes() {
        let (y, labels) = stacked();
        let field = anova1(&y, &labels).unwrap();
        assert_eq!(field.base.z.len(), 3);
        assert_eq!(field.n_groups, 3);
        assert_eq!(field.base.dof.numerator, 2.0);
        assert!(field.base.z.iter().all(|f| *f >= 0.0));
    }

    #[test]
    fn test_arbitrary_label_values() {
        let (y, labels) = stacked();
        let relabeled: Vec<usize> = labels.iter().map(|l| l * 10 + 3).collect();
        let a = anova1(&y, &labels).unwrap();
        let b = anova1(&y, &relabeled).unwrap();
        assert_eq!(a.base.z, b.base.z);
    }

    #[test]
    fn test_requires_two_groups() {
        let (y, _) = stacked();
        let err = anova1(&y, &[0; 9]).unwrap_err();
        assert!(matches!(err, SpmError::InsufficientData { actual: 1, .. }));
    }

    #[test]
    fn test_label_count_mismatch() {
        let (y, _) = stacked();
        assert!(matches!(anova1(&y, &[0, 1]), Err(SpmError::ShapeMismatch { .. })));
    }
}
