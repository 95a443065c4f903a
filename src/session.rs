//! Analysis session state and background workers.
//!
//! An [`AnalysisSession`] owns the latest analysis, post-hoc and normality
//! results. Long runs execute on an [`AnalysisWorker`] thread that reports a
//! single terminal [`WorkerMessage`] over a channel. Every job is stamped with
//! the session generation at start; the session only applies messages from
//! the current generation, so starting a new job invalidates any worker still
//! in flight. State is written only from a complete result, never partially.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::analyzer::SpmAnalyzer;
use crate::error::{SpmError, SpmResult};
use crate::result::{Analysis, NormalityReport, PosthocResult};
use crate::types::{Group, TestKind};

/// A unit of work for a worker thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisJob {
    /// Statistic field plus inference.
    Analyze {
        /// Test to run.
        kind: TestKind,
        /// Input groups.
        groups: Vec<Group>,
    },
    /// Pairwise comparisons.
    Posthoc {
        /// Groups to compare.
        groups: Vec<Group>,
    },
    /// Normality screening.
    Screen {
        /// Groups to screen.
        groups: Vec<Group>,
    },
}

/// Completed output of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutput {
    /// From [`AnalysisJob::Analyze`].
    Analysis(Analysis),
    /// From [`AnalysisJob::Posthoc`].
    Posthoc(PosthocResult),
    /// From [`AnalysisJob::Screen`].
    Normality(NormalityReport),
}

/// Terminal message from a worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    /// The job finished.
    Completed {
        /// Session generation the job was started under.
        generation: u64,
        /// Job output.
        output: JobOutput,
    },
    /// The job failed or was cancelled.
    Failed {
        /// Session generation the job was started under.
        generation: u64,
        /// Why it failed.
        error: SpmError,
    },
}

impl WorkerMessage {
    /// Generation stamp.
    pub fn generation(&self) -> u64 {
        match self {
            Self::Completed { generation, .. } | Self::Failed { generation, .. } => *generation,
        }
    }
}

/// Run a job to completion on the current thread.
///
/// # Errors
///
/// Whatever the underlying engine returns.
pub fn execute(analyzer: &SpmAnalyzer, job: &AnalysisJob) -> SpmResult<JobOutput> {
    match job {
        AnalysisJob::Analyze { kind, groups } => analyzer.run(*kind, groups).map(JobOutput::Analysis),
        AnalysisJob::Posthoc { groups } => analyzer.run_posthoc(groups).map(JobOutput::Posthoc),
        AnalysisJob::Screen { groups } => analyzer.screen(groups).map(JobOutput::Normality),
    }
}

/// Handle to a job running on its own thread.
#[derive(Debug)]
pub struct AnalysisWorker {
    generation: u64,
    receiver: Receiver<WorkerMessage>,
    handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    /// Start `job` on a new thread.
    pub fn spawn(generation: u64, analyzer: SpmAnalyzer, job: AnalysisJob) -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || {
            let message = match execute(&analyzer, &job) {
                Ok(output) => WorkerMessage::Completed { generation, output },
                Err(error) => WorkerMessage::Failed { generation, error },
            };
            // The receiver is gone if the caller gave up waiting.
            let _ = sender.send(message);
        });
        Self {
            generation,
            receiver,
            handle: Some(handle),
        }
    }

    /// Generation this worker was started under.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Non-blocking poll for the terminal message.
    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        match self.receiver.try_recv() {
            Ok(message) => {
                self.join();
                Some(message)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.cancelled()),
        }
    }

    /// Block until the worker finishes.
    ///
    /// A worker that dies without reporting yields `Cancelled`.
    pub fn wait(mut self) -> WorkerMessage {
        let message = self.receiver.recv().unwrap_or_else(|_| self.cancelled());
        self.join();
        message
    }

    /// Block for at most `timeout`.
    ///
    /// On timeout the worker is abandoned and `Cancelled` is returned; its
    /// eventual result is dropped unread.
    pub fn wait_timeout(mut self, timeout: Duration) -> WorkerMessage {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => {
                self.join();
                message
            }
            Err(RecvTimeoutError::Timeout) => {
                debug!(generation = self.generation, ?timeout, "worker timed out, abandoning");
                self.cancelled()
            }
            Err(RecvTimeoutError::Disconnected) => self.cancelled(),
        }
    }

    fn cancelled(&self) -> WorkerMessage {
        WorkerMessage::Failed {
            generation: self.generation,
            error: SpmError::Cancelled,
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Latest results of one interactive analysis.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    analyzer: SpmAnalyzer,
    generation: u64,
    analysis: Option<Analysis>,
    posthoc: Option<PosthocResult>,
    normality: Option<NormalityReport>,
}

impl AnalysisSession {
    /// Empty session using `analyzer` for every job.
    pub fn new(analyzer: SpmAnalyzer) -> Self {
        Self {
            analyzer,
            generation: 0,
            analysis: None,
            posthoc: None,
            normality: None,
        }
    }

    /// Analyzer used for new jobs.
    pub fn analyzer(&self) -> &SpmAnalyzer {
        &self.analyzer
    }

    /// Replace the analyzer. Stored results stay until the next job replaces them.
    pub fn set_analyzer(&mut self, analyzer: SpmAnalyzer) {
        self.analyzer = analyzer;
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Latest analysis.
    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    /// Latest post-hoc result.
    pub fn posthoc(&self) -> Option<&PosthocResult> {
        self.posthoc.as_ref()
    }

    /// Latest normality report.
    pub fn normality(&self) -> Option<&NormalityReport> {
        self.normality.as_ref()
    }

    /// Start `job` in the background, invalidating any worker in flight.
    pub fn start(&mut self, job: AnalysisJob) -> AnalysisWorker {
        self.generation += 1;
        debug!(generation = self.generation, "starting worker");
        AnalysisWorker::spawn(self.generation, self.analyzer.clone(), job)
    }

    /// Apply a worker's message.
    ///
    /// Returns `Ok(true)` when the result was stored and `Ok(false)` when the
    /// message was stale and discarded. A current-generation failure is
    /// returned as the error and leaves every stored result untouched.
    ///
    /// # Errors
    ///
    /// The worker's error, including `Cancelled`.
    pub fn accept(&mut self, message: WorkerMessage) -> SpmResult<bool> {
        if message.generation() != self.generation {
            debug!(
                stale = message.generation(),
                current = self.generation,
                "discarding stale worker message"
            );
            return Ok(false);
        }
        match message {
            WorkerMessage::Completed { output, .. } => {
                self.store(output);
                Ok(true)
            }
            WorkerMessage::Failed { error, .. } => Err(error),
        }
    }

    /// Run `job` to completion and store its output.
    ///
    /// # Errors
    ///
    /// The job's error; stored results are untouched on failure.
    pub fn run(&mut self, job: AnalysisJob) -> SpmResult<()> {
        let worker = self.start(job);
        self.accept(worker.wait()).map(|_| ())
    }

    /// Drop every stored result and invalidate in-flight workers.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.analysis = None;
        self.posthoc = None;
        self.normality = None;
    }

    fn store(&mut self, output: JobOutput) {
        match output {
            JobOutput::Analysis(analysis) => {
                // Post-hoc results belong to the analysis they followed.
                self.posthoc = None;
                self.analysis = Some(analysis);
            }
            JobOutput::Posthoc(posthoc) => self.posthoc = Some(posthoc),
            JobOutput::Normality(report) => self.normality = Some(report),
        }
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new(SpmAnalyzer::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn groups() -> Vec<Group> {
        let make = |name: &str, shift: f64| {
            Group::new(
                name,
                DMatrix::from_fn(8, 25, |j, t| shift + ((j * 3 + t) % 5) as f64 * 0.2 + (t as f64 / 4.0).cos()),
            )
        };
        vec![make("A", 0.0), make("B", 3.0)]
    }

    #[test]
    fn test_run_stores_analysis() {
        let mut session = AnalysisSession::default();
        session
            .run(AnalysisJob::Analyze {
                kind: TestKind::TwoSampleT,
                groups: groups(),
            })
            .unwrap();
        let analysis = session.analysis().unwrap();
        assert_eq!(analysis.statistic.kind(), TestKind::TwoSampleT);
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn test_stale_message_is_discarded() {
        let mut session = AnalysisSession::default();
        let first = session.start(AnalysisJob::Analyze {
            kind: TestKind::TwoSampleT,
            groups: groups(),
        });
        let second = session.start(AnalysisJob::Screen { groups: groups() });

        let stale = first.wait();
        assert_eq!(stale.generation(), 1);
        assert!(!session.accept(stale).unwrap());
        assert!(session.analysis().is_none());

        assert!(session.accept(second.wait()).unwrap());
        assert!(session.normality().is_some());
    }

    #[test]
    fn test_failure_leaves_state_untouched() {
        let mut session = AnalysisSession::default();
        session
            .run(AnalysisJob::Analyze {
                kind: TestKind::TwoSampleT,
                groups: groups(),
            })
            .unwrap();
        let before = session.analysis().cloned();

        let err = session
            .run(AnalysisJob::Analyze {
                kind: TestKind::PairedT,
                groups: groups()[..1].to_vec(),
            })
            .unwrap_err();
        assert!(matches!(err, SpmError::InvalidParameter { .. }));
        assert_eq!(session.analysis().cloned(), before);
    }

    #[test]
    fn test_cancelled_message_is_an_error() {
        let mut session = AnalysisSession::default();
        let worker = session.start(AnalysisJob::Screen { groups: groups() });
        let generation = worker.generation();
        let err = session
            .accept(WorkerMessage::Failed {
                generation,
                error: SpmError::Cancelled,
            })
            .unwrap_err();
        assert_eq!(err, SpmError::Cancelled);
        assert!(session.normality().is_none());
        let _ = worker.wait();
    }
}
