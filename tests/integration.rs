//! End-to-end scenarios.

mod common;

use common::{group, rng, smooth_noise, white_noise};
use curve_spm::{
    analyze, Method, PairOutcome, SpmAnalyzer, SpmError, StatisticResult, Tail, TestKind,
};

/// Two groups of 10 white-noise curves, B shifted by 2 SD.
#[test]
fn two_sample_white_noise_shift_is_detected() {
    let mut r = rng(101);
    let a = group("A", white_noise(&mut r, 10, 101, 0.0));
    let b = group("B", white_noise(&mut r, 10, 101, 2.0));

    let analysis = analyze(TestKind::TwoSampleT, &[a, b]).unwrap();
    let inference = &analysis.inference;

    assert!(inference.h0reject);
    assert!(inference.n_clusters >= 1);
    let covered: usize = inference.clusters.iter().map(|c| c.extent).sum();
    assert!(covered >= 20, "only {covered} suprathreshold timepoints");
    // A - B is negative, so every cluster sits in the lower tail.
    assert!(inference.clusters.iter().all(|c| c.tail == Tail::Lower));
    assert!(inference.clusters.iter().all(|c| c.p_value < 0.05));
}

#[test]
fn two_sample_smooth_shift_spans_most_of_the_domain() {
    let mut r = rng(7);
    let a = group("A", smooth_noise(&mut r, 10, 101, 3.0, 8.0));
    let b = group("B", smooth_noise(&mut r, 10, 101, 0.0, 8.0));

    let analysis = analyze(TestKind::TwoSampleT, &[a, b]).unwrap();
    let inference = &analysis.inference;
    let smoothness = inference.smoothness.unwrap();

    assert!(smoothness.fwhm > 3.0, "fwhm {}", smoothness.fwhm);
    assert!(inference.h0reject);
    let widest = inference.clusters.iter().map(|c| c.extent).max().unwrap_or(0);
    assert!(widest > 50, "widest cluster covers only {widest} of 101 timepoints");
    assert!(inference.clusters.iter().all(|c| c.tail == Tail::Upper));
}

#[test]
fn null_data_rarely_rejects() {
    let mut rejections = 0;
    for seed in 0..10 {
        let mut r = rng(1000 + seed);
        let a = group("A", smooth_noise(&mut r, 12, 60, 0.0, 4.0));
        let b = group("B", smooth_noise(&mut r, 12, 60, 0.0, 4.0));
        if analyze(TestKind::TwoSampleT, &[a, b]).unwrap().inference.h0reject {
            rejections += 1;
        }
    }
    assert!(rejections <= 3, "{rejections} of 10 null datasets rejected");
}

#[test]
fn anova_with_shifted_group_and_posthoc() {
    let mut r = rng(3);
    let base = white_noise(&mut r, 10, 101, 0.0);
    let groups = [
        group("A", base.clone()),
        group("B", base),
        group("C", white_noise(&mut r, 10, 101, 5.0)),
    ];

    let analysis = analyze(TestKind::Anova1, &groups).unwrap();
    assert!(analysis.inference.h0reject);
    assert!(!analysis.inference.two_tailed);

    for method in [Method::Parametric, Method::Nonparametric] {
        let posthoc = SpmAnalyzer::quick().method(method).run_posthoc(&groups).unwrap();
        assert_eq!(posthoc.n_comparisons, 3);
        assert!(posthoc.alpha_corrected < 0.05);
        assert!((posthoc.alpha_corrected - (1.0 - 0.95_f64.powf(1.0 / 3.0))).abs() < 1e-12);

        assert_eq!(posthoc.get("A vs B").unwrap().significant(), Some(false), "{method:?}");
        assert_eq!(posthoc.get("A vs C").unwrap().significant(), Some(true), "{method:?}");
        assert_eq!(posthoc.get("C vs B").unwrap().significant(), Some(true), "{method:?}");
        for pair in &posthoc.pairs {
            assert_eq!(pair.alpha_corrected, posthoc.alpha_corrected);
            assert!(matches!(pair.outcome, PairOutcome::Completed { .. }));
        }
    }
}

#[test]
fn regression_with_nan_predictor_is_rejected() {
    let mut r = rng(11);
    let y = group("Y", white_noise(&mut r, 8, 30, 0.0));
    let mut x: Vec<f64> = (0..8).map(f64::from).collect();
    x[3] = f64::NAN;

    let err = SpmAnalyzer::new()
        .predictor(x)
        .run(TestKind::Regression, &[y])
        .unwrap_err();
    assert!(matches!(err, SpmError::InvalidParameter { parameter: "x", .. }), "{err}");
}

#[test]
fn regression_detects_linear_trend() {
    let mut r = rng(12);
    let noise = smooth_noise(&mut r, 15, 50, 0.0, 3.0);
    let x: Vec<f64> = (0..15).map(|j| j as f64 / 14.0).collect();
    let y = nalgebra::DMatrix::from_fn(15, 50, |j, t| noise[(j, t)] + 6.0 * x[j]);

    let analysis = SpmAnalyzer::new()
        .predictor(x)
        .run(TestKind::Regression, &[group("Y", y)])
        .unwrap();
    let StatisticResult::Regression(field) = &analysis.statistic else {
        panic!("expected a regression field");
    };
    assert!(field.slope.iter().all(|&b| b > 0.0));
    assert!(field.r.iter().all(|&r| (-1.0..=1.0).contains(&r)));
    assert!(analysis.inference.h0reject);
}

#[test]
fn paired_and_one_sample_agree_on_differences() {
    let mut r = rng(21);
    let a = white_noise(&mut r, 12, 40, 1.0);
    let b = white_noise(&mut r, 12, 40, 0.0);
    let diff = &a - &b;

    let paired = analyze(TestKind::PairedT, &[group("A", a), group("B", b)]).unwrap();
    let one = analyze(TestKind::OneSampleT, &[group("D", diff)]).unwrap();

    for (p, o) in paired.statistic.z().iter().zip(one.statistic.z()) {
        assert!((p - o).abs() < 1e-10);
    }
    assert_eq!(paired.statistic.dof(), one.statistic.dof());
}

#[test]
fn nonparametric_k2_is_unsupported() {
    let mut r = rng(5);
    let err = SpmAnalyzer::new()
        .method(Method::Nonparametric)
        .run(TestKind::NormalityK2, &[group("A", white_noise(&mut r, 10, 20, 0.0))])
        .unwrap_err();
    assert!(matches!(err, SpmError::UnsupportedCombination { .. }));
}
