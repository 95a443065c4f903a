//! Curve containers and shared enums.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{SpmError, SpmResult};

/// J×Q matrix of curves: one row per sample, one column per timepoint.
pub type Curves = DMatrix<f64>;

/// A named, ordered collection of curves sharing one length Q.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Display name, used to key post-hoc pairs and screening rows.
    pub name: String,
    /// Samples × timepoints.
    pub data: Curves,
}

impl Group {
    /// Wrap an existing matrix.
    pub fn new(name: impl Into<String>, data: Curves) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Build a group from row vectors, rejecting ragged input.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the rows differ in length.
    pub fn from_rows(name: impl Into<String>, rows: &[Vec<f64>]) -> SpmResult<Self> {
        let name = name.into();
        let q = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != q) {
            return Err(SpmError::shape(
                "group rows",
                format!("{name}: row {i} has {} timepoints, expected {q}", row.len()),
            ));
        }
        let data = DMatrix::from_fn(rows.len(), q, |j, t| rows[j][t]);
        Ok(Self { name, data })
    }

    /// Number of samples J.
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of timepoints Q.
    pub fn n_timepoints(&self) -> usize {
        self.data.ncols()
    }
}

/// One measured variable with several experimental conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    /// Variable name.
    pub name: String,
    /// Conditions compared against each other.
    pub groups: Vec<Group>,
}

impl Indicator {
    /// Create an indicator from its groups.
    pub fn new(name: impl Into<String>, groups: Vec<Group>) -> Self {
        Self {
            name: name.into(),
            groups,
        }
    }

    /// Check that every group shares the same number of timepoints.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` naming each distinct Q and the groups that have it.
    pub fn validate(&self) -> SpmResult<()> {
        ensure_same_width(&self.groups, "indicator groups")
    }

    /// Look up a group by name.
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Reject groups that disagree on Q.
pub(crate) fn ensure_same_width(groups: &[Group], context: &'static str) -> SpmResult<()> {
    let Some(first) = groups.first() else {
        return Ok(());
    };
    let q = first.n_timepoints();
    if groups.iter().all(|g| g.n_timepoints() == q) {
        return Ok(());
    }

    let mut widths: Vec<(usize, Vec<&str>)> = Vec::new();
    for g in groups {
        match widths.iter_mut().find(|(w, _)| *w == g.n_timepoints()) {
            Some((_, names)) => names.push(&g.name),
            None => widths.push((g.n_timepoints(), vec![&g.name])),
        }
    }
    let detail = widths
        .iter()
        .map(|(w, names)| format!("{w} timepoints: {}", names.join(", ")))
        .collect::<Vec<_>>()
        .join("; ");
    Err(SpmError::shape(context, detail))
}

/// Hypothesis test families supported by the statistic engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestKind {
    /// One-sample t against a scalar or reference curve.
    OneSampleT,
    /// Independent two-sample (Welch) t.
    TwoSampleT,
    /// Paired t on per-sample differences.
    PairedT,
    /// One-way (Welch) ANOVA.
    Anova1,
    /// Simple linear regression on a scalar predictor.
    Regression,
    /// D'Agostino–Pearson K² normality.
    NormalityK2,
}

impl TestKind {
    /// Short human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            TestKind::OneSampleT => "one-sample t",
            TestKind::TwoSampleT => "two-sample t",
            TestKind::PairedT => "paired t",
            TestKind::Anova1 => "one-way ANOVA",
            TestKind::Regression => "simple regression",
            TestKind::NormalityK2 => "K2 normality",
        }
    }
}

/// Inference path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Random field theory thresholds.
    Parametric,
    /// Sign-flip / label permutation thresholds.
    Nonparametric,
}

impl Method {
    /// Short human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Method::Parametric => "parametric",
            Method::Nonparametric => "nonparametric",
        }
    }
}

/// Reference value for the one-sample t test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mu {
    /// Same value at every timepoint.
    Scalar(f64),
    /// One reference value per timepoint (length Q).
    Curve(Vec<f64>),
    /// Reference curves: 1×Q (broadcast) or J×Q (per sample).
    Curves(Curves),
}

impl Default for Mu {
    fn default() -> Self {
        Mu::Scalar(0.0)
    }
}

/// Side of the threshold a cluster lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tail {
    /// z > zstar.
    Upper,
    /// z < -zstar.
    Lower,
}
