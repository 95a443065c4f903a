//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::result::{Analysis, InferenceResult, NormalityOutcome, NormalityReport, PairOutcome, PosthocResult};
use crate::types::{Method, Tail};

fn separator() -> String {
    "\u{2500}".repeat(62)
}

/// Format an analysis for human-readable terminal output.
pub fn format_analysis(analysis: &Analysis) -> String {
    let inference = &analysis.inference;
    let dof = analysis.statistic.dof();
    let sep = separator();
    let mut output = String::new();

    output.push_str(&format!(
        "curve-spm: {} ({})\n",
        analysis.statistic.kind().name(),
        inference.method.name()
    ));
    output.push_str(&sep);
    output.push_str("\n\n");

    output.push_str(&format!(
        "  Timepoints: {}   Samples: {}\n",
        analysis.statistic.len(),
        analysis.statistic.base().n_samples
    ));
    output.push_str(&format!("  Degrees of freedom: ({:.2}, {:.2})\n", dof.numerator, dof.denominator));
    if let Some(s) = inference.smoothness {
        output.push_str(&format!("  Smoothness: FWHM {:.2}, {:.2} resels\n", s.fwhm, s.resels));
    }
    if let Some(p) = inference.permutation {
        let mode = if p.exact { "exact" } else { "sampled" };
        output.push_str(&format!("  Permutations: {} ({mode})\n", p.iterations));
    }
    output.push('\n');

    output.push_str(&format_inference(inference));

    output.push_str(&sep);
    output.push('\n');
    output
}

fn format_inference(inference: &InferenceResult) -> String {
    let mut output = String::new();
    let threshold = if inference.two_tailed {
        format!("\u{00B1}{:.3}", inference.zstar)
    } else {
        format!("{:.3}", inference.zstar)
    };
    output.push_str(&format!("  alpha = {}, threshold = {threshold}\n\n", inference.alpha));

    if inference.h0reject {
        output.push_str(&format!(
            "  {}\n\n",
            format!("\u{26A0} H0 rejected: {} cluster(s)", inference.n_clusters).yellow().bold()
        ));
        for (i, c) in inference.clusters.iter().enumerate() {
            let side = match c.tail {
                Tail::Upper => "+",
                Tail::Lower => "-",
            };
            output.push_str(&format!(
                "    #{:<2} {side} [{:>4}, {:>4}]  extent {:>4}  peak {:>8.3}  p = {}\n",
                i + 1,
                c.start_index,
                c.end_index,
                c.extent,
                c.peak,
                format_p(c.p_value, inference.alpha)
            ));
        }
        if let Some(p_set) = inference.p_set {
            output.push_str(&format!("    set-level p = {p_set:.4}\n"));
        }
    } else {
        output.push_str(&format!("  {}\n", "\u{2713} No suprathreshold clusters".green().bold()));
    }
    output.push('\n');
    output
}

fn format_p(p: f64, alpha: f64) -> String {
    let text = if p < 1e-4 { "<0.0001".to_string() } else { format!("{p:.4}") };
    if p < alpha {
        text.red().to_string()
    } else {
        text
    }
}

/// Format a post-hoc result as one line per pair.
pub fn format_posthoc(result: &PosthocResult) -> String {
    let sep = separator();
    let mut output = String::new();

    output.push_str(&format!(
        "curve-spm: post-hoc ({}, {} comparisons)\n",
        result.method.name(),
        result.n_comparisons
    ));
    output.push_str(&sep);
    output.push('\n');
    output.push_str(&format!(
        "  alpha = {}, corrected alpha = {:.5}\n\n",
        result.alpha, result.alpha_corrected
    ));

    for pair in &result.pairs {
        match &pair.outcome {
            PairOutcome::Completed { inference, .. } => {
                let verdict = if inference.h0reject {
                    "significant".yellow().bold().to_string()
                } else {
                    "n.s.".green().to_string()
                };
                output.push_str(&format!(
                    "  {:<24} zstar {:>7.3}  clusters {:>2}  {verdict}\n",
                    pair.name, inference.zstar, inference.n_clusters
                ));
            }
            PairOutcome::Failed { message, .. } => {
                output.push_str(&format!("  {:<24} {}\n", pair.name, format!("failed: {message}").red()));
            }
        }
    }

    output.push_str(&sep);
    output.push('\n');
    output
}

/// Format a normality report with the recommended method.
pub fn format_normality(report: &NormalityReport) -> String {
    let sep = separator();
    let mut output = String::new();

    output.push_str("curve-spm: normality screening (K\u{00B2})\n");
    output.push_str(&sep);
    output.push('\n');

    for group in &report.groups {
        match &group.outcome {
            NormalityOutcome::Completed {
                mean_k2,
                mean_p,
                is_normal,
                ..
            } => {
                let status = if *is_normal {
                    "normal".green().to_string()
                } else {
                    "not normal".yellow().to_string()
                };
                let p = mean_p.map_or_else(|| "-".to_string(), |p| format!("{p:.4}"));
                output.push_str(&format!(
                    "  {:<20} mean K\u{00B2} {:>7.3}  mean p {:>7}  {status}\n",
                    group.name, mean_k2, p
                ));
            }
            NormalityOutcome::Failed { message, .. } => {
                output.push_str(&format!("  {:<20} {}\n", group.name, format!("failed: {message}").red()));
            }
        }
    }

    output.push('\n');
    let method = match report.recommendation.method {
        Method::Parametric => "parametric".green().bold(),
        Method::Nonparametric => "nonparametric".yellow().bold(),
    };
    output.push_str(&format!("  Recommended: {method} ({})\n", report.recommendation.reason));
    output.push_str(&sep);
    output.push('\n');
    output
}
