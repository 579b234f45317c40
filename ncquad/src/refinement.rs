//! Policies that choose which leaf subdomains to split next.

use serde::{Deserialize, Serialize};

use crate::integrand::Scalar;
use crate::subdomain::Subdomain;

/// Chooses and orders the leaves to split in a refinement pass.
///
/// The grid still skips proposed leaves that sit at the level cap or whose
/// split would exceed the remaining evaluation budget, so a strategy only
/// expresses preference.
pub trait RefinementStrategy {
    /// Returns positions into `leaves`, most urgent first.
    fn propose<T: Scalar>(&self, leaves: &[&Subdomain<T>]) -> Vec<usize>;
}

/// Splits every leaf, in leaf order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform;

impl RefinementStrategy for Uniform {
    fn propose<T: Scalar>(&self, leaves: &[&Subdomain<T>]) -> Vec<usize> {
        (0..leaves.len()).collect()
    }
}

/// Splits the leaves with the largest local error indicator first.
///
/// The indicator of a leaf is `|I_fine - I_coarse|`, the difference between
/// its estimate and the same rule applied at twice the spacing. Leaves whose
/// grid has no coarse estimate count as infinitely bad. Only leaves with an
/// indicator of at least `threshold` times the largest one are proposed.
#[derive(Debug, Clone, Copy)]
pub struct ErrorDriven {
    pub threshold: f64,
}

impl Default for ErrorDriven {
    fn default() -> Self {
        ErrorDriven { threshold: 0.1 }
    }
}

impl RefinementStrategy for ErrorDriven {
    fn propose<T: Scalar>(&self, leaves: &[&Subdomain<T>]) -> Vec<usize> {
        let indicators: Vec<f64> = leaves
            .iter()
            .map(|leaf| leaf.error_estimate().unwrap_or(f64::INFINITY))
            .collect();
        let max = indicators.iter().copied().fold(0.0, f64::max);
        let cutoff = if self.threshold <= 0.0 {
            0.0
        } else if max.is_infinite() {
            f64::INFINITY
        } else {
            self.threshold * max
        };

        let mut ranked: Vec<usize> = (0..leaves.len())
            .filter(|&i| indicators[i] >= cutoff)
            .collect();
        ranked.sort_by(|&a, &b| indicators[b].total_cmp(&indicators[a]));
        ranked
    }
}

/// Serializable choice of refinement strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Refinement {
    /// See [`Uniform`].
    #[default]
    Uniform,
    /// See [`ErrorDriven`].
    ErrorDriven {
        /// Fraction of the largest indicator a leaf must reach.
        threshold: f64,
    },
}

impl RefinementStrategy for Refinement {
    fn propose<T: Scalar>(&self, leaves: &[&Subdomain<T>]) -> Vec<usize> {
        match *self {
            Refinement::Uniform => Uniform.propose(leaves),
            Refinement::ErrorDriven { threshold } => ErrorDriven { threshold }.propose(leaves),
        }
    }
}
