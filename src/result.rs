//! Result types produced by the engines.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, SpmError};
use crate::types::{Curves, Method, Tail, TestKind};

// ============================================================================
// Statistic fields
// ============================================================================

/// Degrees of freedom `(numerator, denominator)` of a statistic field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dof {
    /// Numerator df (1 for t fields, k-1 for F fields).
    pub numerator: f64,
    /// Denominator df (ν for t and F, 2 for K²).
    pub denominator: f64,
}

/// Distribution family of a statistic field, used to pick EC densities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatFamily {
    /// Student t field.
    T,
    /// F field.
    F,
    /// χ² field.
    ChiSquare,
}

/// Fields shared by every statistic payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBase {
    /// Test statistic per timepoint.
    pub z: Vec<f64>,
    /// Scalar degrees of freedom used by inference.
    pub dof: Dof,
    /// Model residuals (J×Q), the input to smoothness estimation.
    pub residuals: Curves,
    /// Number of sample curves entering the statistic.
    pub n_samples: usize,
}

/// One-sample or paired t field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TField {
    /// Shared field data.
    pub base: FieldBase,
    /// Mean of (Y - mu) or of the difference curves.
    pub mean: Vec<f64>,
    /// Sample standard deviation (J-1 denominator).
    pub sd: Vec<f64>,
}

/// Welch two-sample t field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelchTField {
    /// Shared field data; `dof.denominator` is the mean pointwise df.
    pub base: FieldBase,
    /// Mean curve of group A.
    pub mean_a: Vec<f64>,
    /// Mean curve of group B.
    pub mean_b: Vec<f64>,
    /// Welch–Satterthwaite df per timepoint.
    pub pointwise_dof: Vec<f64>,
}

/// Welch one-way ANOVA F field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FField {
    /// Shared field data; `dof.denominator` is the mean pointwise df.
    pub base: FieldBase,
    /// Number of groups compared.
    pub n_groups: usize,
    /// Denominator df per timepoint.
    pub pointwise_dof: Vec<f64>,
}

/// Simple regression field; `z` is the t-transform of `r`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionField {
    /// Shared field data.
    pub base: FieldBase,
    /// Least-squares slope per timepoint.
    pub slope: Vec<f64>,
    /// Least-squares intercept per timepoint.
    pub intercept: Vec<f64>,
    /// Pearson correlation per timepoint.
    pub r: Vec<f64>,
}

/// D'Agostino–Pearson K² field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct K2Field {
    /// Shared field data.
    pub base: FieldBase,
    /// Skewness z-score per timepoint.
    pub z_skew: Vec<f64>,
    /// Kurtosis z-score per timepoint.
    pub z_kurtosis: Vec<f64>,
}

/// Pointwise statistic field, tagged by the test that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatisticResult {
    /// One-sample t.
    OneSampleT(TField),
    /// Independent two-sample Welch t.
    TwoSampleT(WelchTField),
    /// Paired t.
    PairedT(TField),
    /// One-way ANOVA.
    Anova1(FField),
    /// Simple regression.
    Regression(RegressionField),
    /// K² normality.
    NormalityK2(K2Field),
}

impl StatisticResult {
    /// Shared field data.
    pub fn base(&self) -> &FieldBase {
        match self {
            Self::OneSampleT(f) | Self::PairedT(f) => &f.base,
            Self::TwoSampleT(f) => &f.base,
            Self::Anova1(f) => &f.base,
            Self::Regression(f) => &f.base,
            Self::NormalityK2(f) => &f.base,
        }
    }

    /// Test statistic per timepoint.
    pub fn z(&self) -> &[f64] {
        &self.base().z
    }

    /// Degrees of freedom used for inference.
    pub fn dof(&self) -> Dof {
        self.base().dof
    }

    /// Test kind that produced this field.
    pub fn kind(&self) -> TestKind {
        match self {
            Self::OneSampleT(_) => TestKind::OneSampleT,
            Self::TwoSampleT(_) => TestKind::TwoSampleT,
            Self::PairedT(_) => TestKind::PairedT,
            Self::Anova1(_) => TestKind::Anova1,
            Self::Regression(_) => TestKind::Regression,
            Self::NormalityK2(_) => TestKind::NormalityK2,
        }
    }

    /// Distribution family of `z`.
    pub fn family(&self) -> StatFamily {
        match self {
            Self::Anova1(_) => StatFamily::F,
            Self::NormalityK2(_) => StatFamily::ChiSquare,
            _ => StatFamily::T,
        }
    }

    /// Whether two-tailed inference makes sense for this field.
    pub fn supports_two_tailed(&self) -> bool {
        self.family() == StatFamily::T
    }

    /// Number of timepoints Q.
    pub fn len(&self) -> usize {
        self.base().z.len()
    }

    /// True when the field has no timepoints.
    pub fn is_empty(&self) -> bool {
        self.base().z.is_empty()
    }

    /// Residuals used for smoothness estimation.
    pub fn residuals(&self) -> &Curves {
        &self.base().residuals
    }
}

// ============================================================================
// Inference
// ============================================================================

/// A contiguous suprathreshold span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// First suprathreshold timepoint (inclusive).
    pub start_index: usize,
    /// Last suprathreshold timepoint (inclusive).
    pub end_index: usize,
    /// Number of timepoints, `end_index - start_index + 1`.
    pub extent: usize,
    /// Threshold crossings, interpolated when requested.
    pub endpoints: (f64, f64),
    /// Most extreme statistic value inside the cluster (signed).
    pub peak: f64,
    /// Which side of the threshold the cluster lies on.
    pub tail: Tail,
    /// Cluster-level corrected p-value.
    pub p_value: f64,
}

impl Cluster {
    /// Continuous width between the two endpoints.
    pub fn width(&self) -> f64 {
        self.endpoints.1 - self.endpoints.0
    }
}

/// Smoothness summary from RFT inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Smoothness {
    /// Full width at half maximum, in timepoints. Infinite for a perfectly smooth field.
    pub fwhm: f64,
    /// Resel count `(Q-1)/FWHM`.
    pub resels: f64,
}

/// Permutation summary from nonparametric inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationSummary {
    /// Permutations in the null distribution.
    pub iterations: usize,
    /// True when every arrangement was enumerated.
    pub exact: bool,
}

/// Thresholded inference over a statistic field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Engine that produced this result.
    pub method: Method,
    /// Significance level used.
    pub alpha: f64,
    /// Whether both tails were tested.
    pub two_tailed: bool,
    /// Critical threshold (applied as ±zstar when two-tailed).
    pub zstar: f64,
    /// True iff at least one cluster survives.
    pub h0reject: bool,
    /// Suprathreshold clusters ordered by start index.
    pub clusters: Vec<Cluster>,
    /// Number of clusters.
    pub n_clusters: usize,
    /// Set-level p-value (RFT only).
    pub p_set: Option<f64>,
    /// Residual smoothness (RFT only).
    pub smoothness: Option<Smoothness>,
    /// Null distribution summary (permutation only).
    pub permutation: Option<PermutationSummary>,
}

impl InferenceResult {
    /// Lower and upper thresholds. One-tailed inference has no lower bound.
    pub fn thresholds(&self) -> (Option<f64>, f64) {
        if self.two_tailed {
            (Some(-self.zstar), self.zstar)
        } else {
            (None, self.zstar)
        }
    }

    /// Whether a statistic value lies beyond the threshold.
    pub fn exceeds(&self, z: f64) -> bool {
        if self.two_tailed {
            z.abs() > self.zstar
        } else {
            z > self.zstar
        }
    }

    /// Cluster p-values in cluster order.
    pub fn p_values(&self) -> Vec<f64> {
        self.clusters.iter().map(|c| c.p_value).collect()
    }

    /// Mean cluster p-value, `None` when there are no clusters.
    pub fn mean_p(&self) -> Option<f64> {
        if self.clusters.is_empty() {
            None
        } else {
            Some(self.clusters.iter().map(|c| c.p_value).sum::<f64>() / self.clusters.len() as f64)
        }
    }
}

/// A statistic field together with its inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Pointwise statistic.
    pub statistic: StatisticResult,
    /// Thresholding and clusters.
    pub inference: InferenceResult,
}

// ============================================================================
// Post-hoc
// ============================================================================

/// Outcome of one pairwise comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PairOutcome {
    /// Statistic and inference both succeeded.
    Completed {
        /// Two-sample t field over the kept timepoints.
        statistic: StatisticResult,
        /// Inference at the corrected alpha.
        inference: InferenceResult,
    },
    /// The comparison failed; other pairs are unaffected.
    Failed {
        /// Error category.
        kind: ErrorKind,
        /// Error message.
        message: String,
    },
}

impl From<SpmError> for PairOutcome {
    fn from(err: SpmError) -> Self {
        PairOutcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One pairwise comparison from a post-hoc run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairComparison {
    /// `"<A> vs <B>"`.
    pub name: String,
    /// First group name.
    pub group_a: String,
    /// Second group name.
    pub group_b: String,
    /// Per-comparison alpha.
    pub alpha_corrected: f64,
    /// Number of comparisons in the family.
    pub n_comparisons: usize,
    /// Original timepoint indices kept after removing zero-variance columns.
    pub kept_timepoints: Vec<usize>,
    /// Result or failure.
    pub outcome: PairOutcome,
}

impl PairComparison {
    /// `Some(h0reject)` on success, `None` on failure.
    pub fn significant(&self) -> Option<bool> {
        match &self.outcome {
            PairOutcome::Completed { inference, .. } => Some(inference.h0reject),
            PairOutcome::Failed { .. } => None,
        }
    }

    /// Inference result when the comparison succeeded.
    pub fn inference(&self) -> Option<&InferenceResult> {
        match &self.outcome {
            PairOutcome::Completed { inference, .. } => Some(inference),
            PairOutcome::Failed { .. } => None,
        }
    }

    /// Statistic field when the comparison succeeded.
    pub fn statistic(&self) -> Option<&StatisticResult> {
        match &self.outcome {
            PairOutcome::Completed { statistic, .. } => Some(statistic),
            PairOutcome::Failed { .. } => None,
        }
    }

    /// Cluster count, 0 when the comparison failed.
    pub fn n_clusters(&self) -> usize {
        self.inference().map_or(0, |i| i.n_clusters)
    }
}

/// All pairwise comparisons following a one-way ANOVA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosthocResult {
    /// Inference method used for every pair.
    pub method: Method,
    /// Nominal family-wise alpha.
    pub alpha: f64,
    /// Per-comparison alpha.
    pub alpha_corrected: f64,
    /// Number of comparisons.
    pub n_comparisons: usize,
    /// Comparisons in `(i, j)`, `i < j` order.
    pub pairs: Vec<PairComparison>,
}

impl PosthocResult {
    /// Look up a pair by `"<A> vs <B>"` name (either order).
    pub fn get(&self, name: &str) -> Option<&PairComparison> {
        self.pairs.iter().find(|p| p.name == name).or_else(|| {
            let (a, b) = name.split_once(" vs ")?;
            self.pairs.iter().find(|p| p.group_a == b && p.group_b == a)
        })
    }
}

// ============================================================================
// Normality screening
// ============================================================================

/// Outcome of screening one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NormalityOutcome {
    /// K² field and inference computed.
    Completed {
        /// K² field.
        statistic: StatisticResult,
        /// One-tailed RFT inference on the K² field.
        inference: InferenceResult,
        /// Mean K² over the domain.
        mean_k2: f64,
        /// Mean cluster p-value, `None` without clusters.
        mean_p: Option<f64>,
        /// `!h0reject`.
        is_normal: bool,
    },
    /// The group could not be screened.
    Failed {
        /// Error category.
        kind: ErrorKind,
        /// Error message.
        message: String,
    },
}

/// Screening result for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNormality {
    /// Group name.
    pub name: String,
    /// Result or failure.
    pub outcome: NormalityOutcome,
}

impl GroupNormality {
    /// `Some(is_normal)` on success, `None` on failure.
    pub fn is_normal(&self) -> Option<bool> {
        match &self.outcome {
            NormalityOutcome::Completed { is_normal, .. } => Some(*is_normal),
            NormalityOutcome::Failed { .. } => None,
        }
    }
}

/// Recommended inference path after screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Parametric if every group is normal, otherwise nonparametric.
    pub method: Method,
    /// Human-readable justification.
    pub reason: String,
    /// Groups classified as normal.
    pub normal_groups: Vec<String>,
    /// `(group, reason)` for non-normal or failed groups.
    pub abnormal_groups: Vec<(String, String)>,
}

/// Normality screening across all groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityReport {
    /// Significance level used.
    pub alpha: f64,
    /// Per-group results in input order.
    pub groups: Vec<GroupNormality>,
    /// Aggregated recommendation.
    pub recommendation: Recommendation,
}

impl NormalityReport {
    /// Look up a group's screening result.
    pub fn group(&self, name: &str) -> Option<&GroupNormality> {
        self.groups.iter().find(|g| g.name == name)
    }
}
