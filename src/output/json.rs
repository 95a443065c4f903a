//! JSON serialization for results and export rows.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize any result or row set to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for crate types).
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Serialize any result or row set to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for crate types).
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Parse a value previously written with [`to_json`] or [`to_json_pretty`].
///
/// # Errors
///
/// Returns an error for malformed JSON or a shape that does not match `T`.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::export::{CurveRow, PosthocSummaryRow};

    fn rows() -> Vec<CurveRow> {
        vec![
            CurveRow {
                index: 0,
                statistic_value: -3.5,
                threshold: 3.1,
                above_threshold: true,
            },
            CurveRow {
                index: 1,
                statistic_value: 1.25,
                threshold: 3.1,
                above_threshold: false,
            },
        ]
    }

    #[test]
    fn test_to_json() {
        let json = to_json(&rows()).unwrap();
        assert!(json.contains("\"statistic_value\":-3.5"));
        assert!(json.contains("\"above_threshold\":true"));
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json_pretty(&rows()).unwrap();
        assert!(json.contains('\n')); // Pretty print has newlines
        assert!(json.contains("above_threshold"));
    }

    #[test]
    fn test_from_json_preserves_optional_fields() {
        let row = PosthocSummaryRow {
            pair: "A vs B".to_string(),
            alpha_corrected: 0.016_952,
            zstar: None,
            significant: None,
            n_clusters: 0,
            p_values: vec![],
            error: Some("degenerate field in post-hoc pair".to_string()),
        };
        let parsed: PosthocSummaryRow = from_json(&to_json(&row).unwrap()).unwrap();
        assert_eq!(parsed, row);
        assert_eq!(from_json::<Vec<CurveRow>>(&to_json(&rows()).unwrap()).unwrap(), rows());
    }
}
