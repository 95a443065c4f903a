//! Post-hoc batches: correction, pair isolation and export alignment.

mod common;

use common::{group, rng, white_noise};
use curve_spm::output::{merged_posthoc_curves, posthoc_summary_rows};
use curve_spm::posthoc::p_critical_bonf;
use curve_spm::{ErrorKind, Method, PairOutcome, SpmAnalyzer};
use nalgebra::DMatrix;

#[test]
fn flat_group_fails_only_its_own_pairs() {
    let mut r = rng(31);
    let groups = [
        group("flat", DMatrix::from_element(9, 30, 2.5)),
        group("X", white_noise(&mut r, 9, 30, 0.0)),
        group("Y", white_noise(&mut r, 9, 30, 0.5)),
    ];
    let result = SpmAnalyzer::new().run_posthoc(&groups).unwrap();

    for name in ["flat vs X", "flat vs Y"] {
        let pair = result.get(name).unwrap();
        match &pair.outcome {
            PairOutcome::Failed { kind, .. } => assert_eq!(*kind, ErrorKind::DegenerateField),
            other => panic!("{name}: expected failure, got {other:?}"),
        }
        assert_eq!(pair.n_clusters(), 0);
    }
    assert!(result.get("X vs Y").unwrap().significant().is_some());

    let rows = posthoc_summary_rows(&result);
    assert_eq!(rows[0].significant, None);
    assert!(rows[0].error.as_deref().unwrap_or_default().contains("degenerate"));
    assert!(rows[2].zstar.is_some());
}

#[test]
fn corrected_alpha_matches_number_of_pairs() {
    let mut r = rng(32);
    let groups: Vec<_> = (0..4)
        .map(|i| group(&format!("G{i}"), white_noise(&mut r, 8, 20, i as f64)))
        .collect();
    let result = SpmAnalyzer::quick()
        .method(Method::Nonparametric)
        .alpha(0.01)
        .run_posthoc(&groups)
        .unwrap();

    assert_eq!(result.n_comparisons, 6);
    assert_eq!(result.alpha_corrected, p_critical_bonf(0.01, 6).unwrap());
    assert_eq!(result.pairs.len(), 6);
    assert_eq!(result.pairs[0].name, "G0 vs G1");
    assert_eq!(result.pairs[5].name, "G2 vs G3");
    for pair in &result.pairs {
        let inference = pair.inference().unwrap();
        assert_eq!(inference.alpha, result.alpha_corrected);
        assert!(inference.two_tailed);
    }
}

#[test]
fn dropped_timepoints_stay_aligned_in_merged_curves() {
    let mut r = rng(33);
    let mut a = white_noise(&mut r, 10, 25, 0.0);
    for j in 0..10 {
        a[(j, 0)] = 1.0;
        a[(j, 24)] = 1.0;
    }
    let groups = [group("A", a), group("B", white_noise(&mut r, 10, 25, 1.0))];
    let result = SpmAnalyzer::new().run_posthoc(&groups).unwrap();

    let pair = &result.pairs[0];
    assert_eq!(pair.kept_timepoints, (1..24).collect::<Vec<_>>());
    assert_eq!(pair.statistic().unwrap().len(), 23);

    let merged = merged_posthoc_curves(&result, 25);
    assert_eq!(merged.rows[0].values[0], None);
    assert_eq!(merged.rows[24].values[0], None);
    assert_eq!(merged.rows[1].values[0], Some(pair.statistic().unwrap().z()[0]));
}
