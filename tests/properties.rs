//! Property-based checks of invariants that must hold for any input.

use curve_spm::output::{curve_rows, from_json, to_json, CurveRow};
use curve_spm::posthoc::{p_critical_bonf, p_corrected_bonf};
use curve_spm::statistics::{compute, two_sample};
use curve_spm::{
    Dof, FieldBase, Group, InferenceResult, Method, StatisticResult, TField, TestKind, DesignOptions,
};
use nalgebra::DMatrix;
use proptest::prelude::*;

const ROWS: usize = 5;
const Q: usize = 6;

fn matrix(values: &[f64]) -> DMatrix<f64> {
    DMatrix::from_column_slice(ROWS, Q, values)
}

fn t_field(z: Vec<f64>) -> StatisticResult {
    let q = z.len();
    StatisticResult::OneSampleT(TField {
        base: FieldBase {
            z,
            dof: Dof {
                numerator: 1.0,
                denominator: 9.0,
            },
            residuals: DMatrix::zeros(2, q),
            n_samples: 10,
        },
        mean: vec![0.0; q],
        sd: vec![1.0; q],
    })
}

fn inference(zstar: f64, two_tailed: bool) -> InferenceResult {
    InferenceResult {
        method: Method::Parametric,
        alpha: 0.05,
        two_tailed,
        zstar,
        h0reject: false,
        clusters: vec![],
        n_clusters: 0,
        p_set: None,
        smoothness: None,
        permutation: None,
    }
}

proptest! {
    #[test]
    fn anova_is_invariant_to_group_order(
        a in proptest::collection::vec(-10.0_f64..10.0, ROWS * Q),
        b in proptest::collection::vec(-10.0_f64..10.0, ROWS * Q),
        c in proptest::collection::vec(-10.0_f64..10.0, ROWS * Q),
    ) {
        let groups = [
            Group::new("A", matrix(&a)),
            Group::new("B", matrix(&b)),
            Group::new("C", matrix(&c)),
        ];
        let reordered = [groups[2].clone(), groups[0].clone(), groups[1].clone()];
        let options = DesignOptions::default();

        match (compute(TestKind::Anova1, &groups, &options), compute(TestKind::Anova1, &reordered, &options)) {
            (Ok(x), Ok(y)) => {
                for (u, v) in x.z().iter().zip(y.z()) {
                    prop_assert!((u - v).abs() <= 1e-9 * u.abs().max(1.0), "{} vs {}", u, v);
                }
                prop_assert!((x.dof().denominator - y.dof().denominator).abs() < 1e-9);
            }
            (Err(x), Err(y)) => prop_assert_eq!(x.kind(), y.kind()),
            (x, y) => prop_assert!(false, "order changed the outcome: {:?} vs {:?}", x, y),
        }
    }

    #[test]
    fn two_sample_is_deterministic(
        a in proptest::collection::vec(-1e3_f64..1e3, ROWS * Q),
        b in proptest::collection::vec(-1e3_f64..1e3, ROWS * Q),
    ) {
        let (a, b) = (matrix(&a), matrix(&b));
        match (two_sample(&a, &b), two_sample(&a, &b)) {
            (Ok(x), Ok(y)) => prop_assert_eq!(x, y),
            (Err(x), Err(y)) => prop_assert_eq!(x, y),
            _ => prop_assert!(false, "repeated calls disagree"),
        }
    }

    #[test]
    fn corrected_alpha_decreases_with_comparisons(alpha in 0.001_f64..0.5, c in 2_usize..60) {
        let one = p_critical_bonf(alpha, 1).unwrap();
        let here = p_critical_bonf(alpha, c).unwrap();
        let next = p_critical_bonf(alpha, c + 1).unwrap();
        prop_assert_eq!(one, alpha);
        prop_assert!(here < alpha);
        prop_assert!(next < here);
        prop_assert!((p_corrected_bonf(here, c) - alpha).abs() < 1e-9);
    }

    #[test]
    fn exported_rows_round_trip_threshold_decisions(
        z in proptest::collection::vec(-8.0_f64..8.0, 1..80),
        zstar in 0.5_f64..6.0,
        two_tailed in any::<bool>(),
    ) {
        let stat = t_field(z.clone());
        let inf = inference(zstar, two_tailed);
        let rows = curve_rows(&stat, &inf);
        let parsed: Vec<CurveRow> = from_json(&to_json(&rows).unwrap()).unwrap();

        prop_assert_eq!(parsed.len(), z.len());
        for (row, &value) in parsed.iter().zip(&z) {
            let direct = if two_tailed { value.abs() > zstar } else { value > zstar };
            prop_assert_eq!(row.above_threshold, direct);
            prop_assert!((row.statistic_value - value).abs() <= 1e-12 * value.abs().max(1.0));
        }
    }
}
