//! # curve-spm
//!
//! Statistical Parametric Mapping for one-dimensional curves.
//!
//! Given groups of curves sampled on a common domain (one row per sample, one
//! column per timepoint), this crate:
//! - computes pointwise test statistic fields (t, Welch t, paired t, Welch F,
//!   regression t, D'Agostino–Pearson K²)
//! - thresholds them with Random Field Theory or with a sign-flip / label
//!   permutation null of the field maximum
//! - reports suprathreshold clusters with family-wise corrected p-values
//! - runs Bonferroni-corrected pairwise post-hoc comparisons
//! - screens groups for pointwise normality and recommends a method
//!
//! ## Quick Start
//!
//! ```ignore
//! use curve_spm::{Group, SpmAnalyzer, TestKind};
//!
//! let control = Group::new("control", control_curves);
//! let treated = Group::new("treated", treated_curves);
//!
//! let analysis = SpmAnalyzer::new().run(TestKind::TwoSampleT, &[control, treated])?;
//! for cluster in &analysis.inference.clusters {
//!     println!("{}..{} p = {:.4}", cluster.start_index, cluster.end_index, cluster.p_value);
//! }
//! ```
//!
//! ## Choosing a method
//!
//! ```ignore
//! let report = SpmAnalyzer::new().screen(&groups)?;
//! let analysis = SpmAnalyzer::new()
//!     .method(report.recommendation.method)
//!     .run(TestKind::Anova1, &groups)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod analyzer;
mod config;
mod constants;
mod error;
mod result;
mod types;

// Functional modules
pub mod inference;
pub mod output;
pub mod posthoc;
pub mod screening;
pub mod session;
pub mod statistics;
pub mod thread_pool;

// Re-exports for public API
pub use analyzer::SpmAnalyzer;
pub use config::{Config, SmoothnessEstimator};
pub use constants::{DEFAULT_ALPHA, DEFAULT_ITERATIONS, DEFAULT_POSTHOC_ITERATIONS, DEFAULT_SEED, K2_MIN_SAMPLES};
pub use error::{ErrorKind, SpmError, SpmResult};
pub use result::{
    Analysis, Cluster, Dof, FField, FieldBase, GroupNormality, InferenceResult, K2Field, NormalityOutcome,
    NormalityReport, PairComparison, PairOutcome, PermutationSummary, PosthocResult, Recommendation,
    RegressionField, Smoothness, StatFamily, StatisticResult, TField, WelchTField,
};
pub use session::{AnalysisJob, AnalysisSession, AnalysisWorker, JobOutput, WorkerMessage};
pub use statistics::{Design, DesignOptions};
pub use types::{Curves, Group, Indicator, Method, Mu, Tail, TestKind};

/// Analyze `groups` with default configuration and parametric inference.
///
/// # Errors
///
/// See [`SpmAnalyzer::run`].
pub fn analyze(kind: TestKind, groups: &[Group]) -> SpmResult<Analysis> {
    SpmAnalyzer::new().run(kind, groups)
}
