//! Error taxonomy shared by every engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type SpmResult<T> = Result<T, SpmError>;

/// Errors returned by the statistic, inference, post-hoc and screening engines.
///
/// Engines never panic on bad input; every failure is surfaced as one of these
/// variants with the numeric detail preserved for display.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpmError {
    /// Sample count below the minimum a test needs.
    #[error("{test} requires at least {required} samples, got {actual}")]
    InsufficientData {
        /// Test that rejected the input.
        test: &'static str,
        /// Minimum number of samples.
        required: usize,
        /// Number of samples supplied.
        actual: usize,
    },

    /// Timepoint or sample counts inconsistent across inputs.
    #[error("shape mismatch in {context}: {detail}")]
    ShapeMismatch {
        /// Where the mismatch was detected.
        context: &'static str,
        /// Human-readable description of the offending shapes.
        detail: String,
    },

    /// Test kind and inference method cannot be combined.
    #[error("{test} is not supported with {method} inference")]
    UnsupportedCombination {
        /// Test kind name.
        test: &'static str,
        /// Inference method name.
        method: &'static str,
    },

    /// Zero-variance input prevents the statistic or smoothness estimate.
    #[error("degenerate field in {context}{}", timepoint.map(|q| format!(" at timepoint {q}")).unwrap_or_default())]
    DegenerateField {
        /// Stage that hit the degenerate input.
        context: &'static str,
        /// First offending timepoint, when one can be named.
        timepoint: Option<usize>,
    },

    /// Numeric threshold solve did not converge.
    #[error("threshold solve did not converge after {iterations} iterations (tolerance {tolerance:e}): {detail}")]
    ConvergenceFailure {
        /// Iterations spent.
        iterations: usize,
        /// Requested tolerance.
        tolerance: f64,
        /// Solver diagnostic.
        detail: String,
    },

    /// Out-of-range or non-finite parameter.
    #[error("invalid {parameter}: {detail}")]
    InvalidParameter {
        /// Parameter name.
        parameter: &'static str,
        /// Why it was rejected.
        detail: String,
    },

    /// The run was abandoned before completion.
    #[error("analysis cancelled")]
    Cancelled,
}

/// Coarse error category for display and export layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`SpmError::InsufficientData`].
    InsufficientData,
    /// See [`SpmError::ShapeMismatch`].
    ShapeMismatch,
    /// See [`SpmError::UnsupportedCombination`].
    UnsupportedCombination,
    /// See [`SpmError::DegenerateField`].
    DegenerateField,
    /// See [`SpmError::ConvergenceFailure`].
    ConvergenceFailure,
    /// See [`SpmError::InvalidParameter`].
    InvalidParameter,
    /// See [`SpmError::Cancelled`].
    Cancelled,
}

impl SpmError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::UnsupportedCombination { .. } => ErrorKind::UnsupportedCombination,
            Self::DegenerateField { .. } => ErrorKind::DegenerateField,
            Self::ConvergenceFailure { .. } => ErrorKind::ConvergenceFailure,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn shape(context: &'static str, detail: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            context,
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid(parameter: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            detail: detail.into(),
        }
    }

    pub(crate) fn degenerate(context: &'static str, timepoint: Option<usize>) -> Self {
        Self::DegenerateField { context, timepoint }
    }
}

/// Check that a significance level lies strictly inside (0, 1).
pub(crate) fn check_alpha(alpha: f64) -> SpmResult<()> {
    if alpha.is_finite() && alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(SpmError::invalid("alpha", format!("{alpha} is outside (0, 1)")))
    }
}
