//! Output formatting for analysis results.

pub mod export;
pub mod json;
pub mod terminal;

pub use export::{
    analysis_summary, curve_rows, k2_rows, merged_posthoc_curves, posthoc_summary_rows, regression_rows,
    AnalysisSummary, CurveRow, K2Row, MergedCurveRow, MergedCurves, PosthocSummaryRow, RegressionRow,
};
pub use json::{from_json, to_json, to_json_pretty};
pub use terminal::{format_analysis, format_normality, format_posthoc};
