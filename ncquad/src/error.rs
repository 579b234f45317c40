//! Error types shared by every integration routine in `ncquad`.

use thiserror::Error;

/// Result type alias for `ncquad` operations.
pub type QuadResult<T> = Result<T, QuadError>;

/// Errors that can occur while setting up or running an integration.
///
/// `InvalidDomain`, `InvalidGridSize`, `InvalidParameter` and `Config` are
/// input errors and are always reported before the integrand is evaluated.
/// `BudgetExhaustedPrematurely` and `IntegralNotReady` indicate broken
/// bookkeeping inside the adaptive grid and are never expected in a correct
/// run.
#[derive(Debug, Error)]
pub enum QuadError {
    /// Dimension mismatch or an axis with `low >= high`.
    #[error("invalid integration domain: {reason}")]
    InvalidDomain {
        /// Description of the offending axis or size.
        reason: String,
    },

    /// A grid axis does not satisfy the rule's divisibility constraint.
    #[error("invalid grid size: {n_per_dim} points per dimension for {rule} (need n >= {min} and (n - 1) % {order} == 0)")]
    InvalidGridSize {
        /// Name of the active rule.
        rule: &'static str,
        /// The offending number of points per dimension.
        n_per_dim: usize,
        /// Stencil stride of the rule.
        order: usize,
        /// Smallest admissible number of points per dimension.
        min: usize,
    },

    /// A subdomain requested evaluations the budget can no longer pay for.
    #[error("evaluation budget exhausted prematurely: {requested} points requested, {remaining} of {budget} left")]
    BudgetExhaustedPrematurely {
        /// Number of points in the offending request.
        requested: usize,
        /// Evaluations still available.
        remaining: usize,
        /// Total evaluation budget.
        budget: usize,
    },

    /// An integral was read or computed before its inputs were complete.
    #[error("integral not ready: {what}")]
    IntegralNotReady {
        /// What is still pending.
        what: String,
    },

    /// The integrand returned a different number of values than requested.
    #[error("integrand returned {got} values for {expected} points")]
    EvaluationMismatch {
        /// Number of points passed to the integrand.
        expected: usize,
        /// Number of values it returned.
        got: usize,
    },

    /// Invalid scalar parameter such as `dim`, `N` or a fan-out factor.
    #[error("invalid parameter '{parameter}': {message}")]
    InvalidParameter {
        /// Name of the parameter.
        parameter: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Configuration could not be parsed or failed semantic validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuadError {
    /// Create an `InvalidDomain` error.
    #[must_use]
    pub fn domain(reason: impl Into<String>) -> Self {
        Self::InvalidDomain {
            reason: reason.into(),
        }
    }

    /// Create an `InvalidParameter` error.
    #[must_use]
    pub fn parameter(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            message: message.into(),
        }
    }

    /// Returns `true` for errors caused by caller input rather than by a
    /// defect in the grid bookkeeping.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        !matches!(
            self,
            Self::BudgetExhaustedPrematurely { .. } | Self::IntegralNotReady { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuadError::InvalidGridSize {
            rule: "boole",
            n_per_dim: 6,
            order: 4,
            min: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("boole"));
        assert!(msg.contains("(n - 1) % 4"));

        let err = QuadError::domain("axis 1 has low >= high");
        assert!(err.to_string().contains("axis 1"));

        let err = QuadError::EvaluationMismatch {
            expected: 10,
            got: 9,
        };
        assert_eq!(err.to_string(), "integrand returned 9 values for 10 points");
    }

    #[test]
    fn test_input_error_classification() {
        assert!(QuadError::parameter("dim", "must be positive").is_input_error());
        assert!(!QuadError::IntegralNotReady {
            what: "leaf 3 is stale".to_string(),
        }
        .is_input_error());
        assert!(!QuadError::BudgetExhaustedPrematurely {
            requested: 10,
            remaining: 2,
            budget: 100,
        }
        .is_input_error());
    }
}
