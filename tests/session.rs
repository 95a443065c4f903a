//! Session state under background workers and concurrent use.

mod common;

use std::thread;
use std::time::Duration;

use common::{group, rng, white_noise};
use curve_spm::{AnalysisJob, AnalysisSession, Group, JobOutput, SpmAnalyzer, SpmError, TestKind, WorkerMessage};

fn groups(seed: u64) -> Vec<Group> {
    let mut r = rng(seed);
    vec![
        group("A", white_noise(&mut r, 10, 40, 0.0)),
        group("B", white_noise(&mut r, 10, 40, 1.0)),
        group("C", white_noise(&mut r, 10, 40, 3.0)),
    ]
}

#[test]
fn newer_job_supersedes_older_one() {
    let mut session = AnalysisSession::new(SpmAnalyzer::quick());
    let old = session.start(AnalysisJob::Analyze {
        kind: TestKind::Anova1,
        groups: groups(1),
    });
    let new = session.start(AnalysisJob::Analyze {
        kind: TestKind::TwoSampleT,
        groups: groups(2)[..2].to_vec(),
    });

    // Deliver out of order: the newer result first, then the stale one.
    assert!(session.accept(new.wait()).unwrap());
    assert!(!session.accept(old.wait()).unwrap());
    assert_eq!(session.analysis().unwrap().statistic.kind(), TestKind::TwoSampleT);
}

#[test]
fn new_analysis_discards_posthoc_but_keeps_normality() {
    let mut session = AnalysisSession::new(SpmAnalyzer::quick());
    let data = groups(3);
    session.run(AnalysisJob::Screen { groups: data.clone() }).unwrap();
    session.run(AnalysisJob::Posthoc { groups: data.clone() }).unwrap();
    assert!(session.posthoc().is_some());

    session
        .run(AnalysisJob::Analyze {
            kind: TestKind::Anova1,
            groups: data,
        })
        .unwrap();
    assert!(session.posthoc().is_none());
    assert!(session.normality().is_some());
    assert!(session.analysis().is_some());
}

#[test]
fn timeout_cancels_without_writing_state() {
    let analyzer = SpmAnalyzer::new().method(curve_spm::Method::Nonparametric).iterations(50_000);
    let mut session = AnalysisSession::new(analyzer);
    let worker = session.start(AnalysisJob::Analyze {
        kind: TestKind::Anova1,
        groups: groups(4),
    });
    let generation = worker.generation();

    let message = worker.wait_timeout(Duration::ZERO);
    // A fast machine may still win the race; either outcome must be consistent.
    match message {
        WorkerMessage::Failed { error, generation: g } => {
            assert_eq!(error, SpmError::Cancelled);
            assert_eq!(g, generation);
            let err = session.accept(WorkerMessage::Failed { generation: g, error }).unwrap_err();
            assert_eq!(err, SpmError::Cancelled);
            assert!(session.analysis().is_none());
        }
        WorkerMessage::Completed { output, .. } => {
            assert!(matches!(output, JobOutput::Analysis(_)));
        }
    }
}

#[test]
fn clear_invalidates_in_flight_worker() {
    let mut session = AnalysisSession::default();
    let worker = session.start(AnalysisJob::Screen { groups: groups(5) });
    session.clear();
    assert!(!session.accept(worker.wait()).unwrap());
    assert!(session.normality().is_none());
}

#[test]
fn analyzer_is_thread_safe() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let data = groups(10 + i);
                SpmAnalyzer::quick()
                    .method(curve_spm::Method::Nonparametric)
                    .seed(i)
                    .run(TestKind::Anova1, &data)
                    .map(|a| a.inference.zstar)
            })
        })
        .collect();

    for handle in handles {
        let zstar = handle.join().unwrap().unwrap();
        assert!(zstar.is_finite() && zstar > 0.0);
    }
}
