//! Tabular export rows.
//!
//! Each function flattens a result into plain serde rows that a CSV or
//! spreadsheet writer can consume directly. `above_threshold` is always
//! derived with [`InferenceResult::exceeds`], so a row agrees with the
//! thresholding the clusters were built from.

use serde::{Deserialize, Serialize};

use crate::result::{Analysis, InferenceResult, K2Field, PosthocResult, RegressionField, StatisticResult};
use crate::types::{Method, TestKind};

/// One timepoint of a main-effect curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRow {
    /// Timepoint index.
    pub index: usize,
    /// Statistic value.
    pub statistic_value: f64,
    /// Critical threshold (the positive bound when two-tailed).
    pub threshold: f64,
    /// Whether the value lies beyond the threshold.
    pub above_threshold: bool,
}

/// One timepoint of a regression curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionRow {
    /// Timepoint index.
    pub index: usize,
    /// t statistic.
    pub statistic_value: f64,
    /// Critical threshold.
    pub threshold: f64,
    /// Whether the value lies beyond the threshold.
    pub above_threshold: bool,
    /// Least-squares slope.
    pub slope: f64,
    /// Least-squares intercept.
    pub intercept: f64,
    /// Pearson correlation.
    pub r: f64,
}

/// One timepoint of a K² normality curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct K2Row {
    /// Timepoint index.
    pub index: usize,
    /// K² value.
    pub k2: f64,
    /// Skewness z-score.
    pub z_skew: f64,
    /// Kurtosis z-score.
    pub z_kurtosis: f64,
    /// Critical threshold.
    pub threshold: f64,
    /// Whether K² exceeds the threshold.
    pub above_threshold: bool,
}

/// Summary of one post-hoc pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosthocSummaryRow {
    /// `"<A> vs <B>"`.
    pub pair: String,
    /// Per-comparison alpha.
    pub alpha_corrected: f64,
    /// Critical threshold, `None` if the pair failed.
    pub zstar: Option<f64>,
    /// `None` if the pair failed.
    pub significant: Option<bool>,
    /// Cluster count (0 on failure).
    pub n_clusters: usize,
    /// Cluster p-values in cluster order.
    pub p_values: Vec<f64>,
    /// Error message when the pair failed.
    pub error: Option<String>,
}

/// One original timepoint across every post-hoc pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedCurveRow {
    /// Original timepoint index.
    pub index: usize,
    /// Statistic per pair, `None` where the pair dropped or failed this timepoint.
    pub values: Vec<Option<f64>>,
}

/// Post-hoc statistic curves on the full domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedCurves {
    /// Pair names, one per entry of [`MergedCurveRow::values`].
    pub columns: Vec<String>,
    /// One row per original timepoint.
    pub rows: Vec<MergedCurveRow>,
}

/// Headline numbers of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Test that produced the field.
    pub test: TestKind,
    /// Inference method.
    pub method: Method,
    /// Significance level.
    pub alpha: f64,
    /// Whether both tails were tested.
    pub two_tailed: bool,
    /// Critical threshold.
    pub zstar: f64,
    /// Whether any cluster survived.
    pub h0reject: bool,
    /// Cluster count.
    pub n_clusters: usize,
    /// Mean statistic over the domain (mean K² for normality fields).
    pub mean_statistic: f64,
    /// Mean cluster p-value.
    pub mean_p: Option<f64>,
    /// RFT set-level p-value.
    pub p_set: Option<f64>,
    /// RFT resel count.
    pub resels: Option<f64>,
}

/// Per-timepoint rows for any statistic field.
pub fn curve_rows(statistic: &StatisticResult, inference: &InferenceResult) -> Vec<CurveRow> {
    statistic
        .z()
        .iter()
        .enumerate()
        .map(|(index, &z)| CurveRow {
            index,
            statistic_value: z,
            threshold: inference.zstar,
            above_threshold: inference.exceeds(z),
        })
        .collect()
}

/// Per-timepoint rows with the regression line.
pub fn regression_rows(field: &RegressionField, inference: &InferenceResult) -> Vec<RegressionRow> {
    field
        .base
        .z
        .iter()
        .enumerate()
        .map(|(i, &z)| RegressionRow {
            index: i,
            statistic_value: z,
            threshold: inference.zstar,
            above_threshold: inference.exceeds(z),
            slope: field.slope[i],
            intercept: field.intercept[i],
            r: field.r[i],
        })
        .collect()
}

/// Per-timepoint rows with the K² components.
pub fn k2_rows(field: &K2Field, inference: &InferenceResult) -> Vec<K2Row> {
    field
        .base
        .z
        .iter()
        .enumerate()
        .map(|(i, &k2)| K2Row {
            index: i,
            k2,
            z_skew: field.z_skew[i],
            z_kurtosis: field.z_kurtosis[i],
            threshold: inference.zstar,
            above_threshold: inference.exceeds(k2),
        })
        .collect()
}

/// One summary row per pair, in comparison order.
pub fn posthoc_summary_rows(result: &PosthocResult) -> Vec<PosthocSummaryRow> {
    result
        .pairs
        .iter()
        .map(|pair| {
            let inference = pair.inference();
            PosthocSummaryRow {
                pair: pair.name.clone(),
                alpha_corrected: pair.alpha_corrected,
                zstar: inference.map(|i| i.zstar),
                significant: pair.significant(),
                n_clusters: pair.n_clusters(),
                p_values: inference.map(InferenceResult::p_values).unwrap_or_default(),
                error: match &pair.outcome {
                    crate::result::PairOutcome::Failed { message, .. } => Some(message.clone()),
                    crate::result::PairOutcome::Completed { .. } => None,
                },
            }
        })
        .collect()
}

/// Pair statistic curves mapped back onto `n_timepoints` original timepoints.
pub fn merged_posthoc_curves(result: &PosthocResult, n_timepoints: usize) -> MergedCurves {
    let mut rows: Vec<MergedCurveRow> = (0..n_timepoints)
        .map(|index| MergedCurveRow {
            index,
            values: vec![None; result.pairs.len()],
        })
        .collect();

    for (col, pair) in result.pairs.iter().enumerate() {
        let Some(statistic) = pair.statistic() else {
            continue;
        };
        for (&original, &z) in pair.kept_timepoints.iter().zip(statistic.z()) {
            if let Some(row) = rows.get_mut(original) {
                row.values[col] = Some(z);
            }
        }
    }

    MergedCurves {
        columns: result.pairs.iter().map(|p| p.name.clone()).collect(),
        rows,
    }
}

/// Headline numbers of an analysis.
pub fn analysis_summary(analysis: &Analysis) -> AnalysisSummary {
    let z = analysis.statistic.z();
    let inference = &analysis.inference;
    AnalysisSummary {
        test: analysis.statistic.kind(),
        method: inference.method,
        alpha: inference.alpha,
        two_tailed: inference.two_tailed,
        zstar: inference.zstar,
        h0reject: inference.h0reject,
        n_clusters: inference.n_clusters,
        mean_statistic: if z.is_empty() { 0.0 } else { z.iter().sum::<f64>() / z.len() as f64 },
        mean_p: inference.mean_p(),
        p_set: inference.p_set,
        resels: inference.smoothness.map(|s| s.resels),
    }
}
