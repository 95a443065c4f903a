//! Normality screening ahead of test selection.

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{check_alpha, SpmResult};
use crate::inference::{run_rft_inference, RftInput};
use crate::result::{GroupNormality, NormalityOutcome, NormalityReport, Recommendation, StatisticResult};
use crate::statistics::k2;
use crate::types::{Group, Method};

/// Screen every group with the K² field and one-tailed RFT inference.
///
/// The field is thresholded with the smoothness of the group's residuals. K²
/// is rougher than those residuals, so the field-wise false-positive rate on
/// normal curves is well above `alpha` even though the pointwise rate is not.
///
/// # Errors
///
/// `InvalidParameter` for alpha outside (0, 1). Per-group failures are
/// recorded in the report, not returned.
pub fn screen(groups: &[Group], alpha: f64) -> SpmResult<NormalityReport> {
    screen_with_config(groups, alpha, &Config::default())
}

/// [`screen`] with solver and smoothness settings from `config`.
pub fn screen_with_config(groups: &[Group], alpha: f64, config: &Config) -> SpmResult<NormalityReport> {
    check_alpha(alpha)?;
    let input = RftInput::from_config(config, alpha, false);

    let results: Vec<GroupNormality> = groups
        .iter()
        .map(|group| GroupNormality {
            name: group.name.clone(),
            outcome: screen_group(group, &input),
        })
        .collect();

    let recommendation = recommend(&results);
    debug!(
        n_groups = results.len(),
        method = recommendation.method.name(),
        "normality screening complete"
    );

    Ok(NormalityReport {
        alpha,
        groups: results,
        recommendation,
    })
}

fn screen_group(group: &Group, input: &RftInput) -> NormalityOutcome {
    let run = || -> SpmResult<NormalityOutcome> {
        let field = k2(&group.data)?;
        let mean_k2 = field.base.z.iter().sum::<f64>() / field.base.z.len() as f64;
        let statistic = StatisticResult::NormalityK2(field);
        let inference = run_rft_inference(&statistic, input)?;
        Ok(NormalityOutcome::Completed {
            mean_k2,
            mean_p: inference.mean_p(),
            is_normal: !inference.h0reject,
            statistic,
            inference,
        })
    };

    run().unwrap_or_else(|err| {
        warn!(group = %group.name, error = %err, "normality screening failed");
        NormalityOutcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    })
}

/// Parametric only when every group was screened and found normal.
fn recommend(results: &[GroupNormality]) -> Recommendation {
    let mut normal_groups = Vec::new();
    let mut abnormal_groups = Vec::new();

    for g in results {
        match &g.outcome {
            NormalityOutcome::Completed { is_normal: true, .. } => normal_groups.push(g.name.clone()),
            NormalityOutcome::Completed { mean_p, .. } => {
                let reason = match mean_p {
                    Some(p) => format!("p={p:.4}"),
                    None => "non-normal".to_string(),
                };
                abnormal_groups.push((g.name.clone(), reason));
            }
            NormalityOutcome::Failed { message, .. } => abnormal_groups.push((g.name.clone(), message.clone())),
        }
    }

    if abnormal_groups.is_empty() && !normal_groups.is_empty() {
        Recommendation {
            method: Method::Parametric,
            reason: "all groups are normally distributed".to_string(),
            normal_groups,
            abnormal_groups,
        }
    } else {
        let names: Vec<&str> = abnormal_groups.iter().map(|(n, _)| n.as_str()).collect();
        let reason = if names.is_empty() {
            "no groups to screen".to_string()
        } else {
            format!("not normally distributed: {}", names.join(", "))
        };
        Recommendation {
            method: Method::Nonparametric,
            reason,
            normal_groups,
            abnormal_groups,
        }
    }
}
