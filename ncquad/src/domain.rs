//! The axis-aligned box an integral is taken over.

use serde::{Deserialize, Serialize};

use crate::error::{QuadError, QuadResult};

/// An immutable axis-aligned integration box, one `(low, high)` pair per
/// dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct IntegrationDomain {
    bounds: Vec<(f64, f64)>,
}

impl IntegrationDomain {
    /// Creates a domain from per-dimension bounds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDomain` if `bounds` is empty, contains a non-finite
    /// value, or has an axis with `low >= high`.
    pub fn new(bounds: &[(f64, f64)]) -> QuadResult<Self> {
        if bounds.is_empty() {
            return Err(QuadError::domain("domain must have at least one dimension"));
        }
        for (axis, &(low, high)) in bounds.iter().enumerate() {
            if !low.is_finite() || !high.is_finite() {
                return Err(QuadError::domain(format!(
                    "axis {axis} has non-finite bounds [{low}, {high}]"
                )));
            }
            if low >= high {
                return Err(QuadError::domain(format!(
                    "axis {axis} has low >= high ([{low}, {high}])"
                )));
            }
        }
        Ok(IntegrationDomain {
            bounds: bounds.to_vec(),
        })
    }

    /// The default domain `[-1, 1]^dim`.
    pub fn unit_cube(dim: usize) -> QuadResult<Self> {
        if dim == 0 {
            return Err(QuadError::parameter("dim", "must be positive"));
        }
        Self::new(&vec![(-1.0, 1.0); dim])
    }

    /// Builds the domain for a `dim`-dimensional integral, falling back to
    /// `[-1, 1]^dim` when no bounds are given.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for `dim == 0` and `InvalidDomain` when the
    /// bounds do not have exactly `dim` valid axes.
    pub fn setup(dim: usize, bounds: Option<&[(f64, f64)]>) -> QuadResult<Self> {
        if dim == 0 {
            return Err(QuadError::parameter("dim", "must be positive"));
        }
        match bounds {
            None => Self::unit_cube(dim),
            Some(bounds) => {
                if bounds.len() != dim {
                    return Err(QuadError::domain(format!(
                        "expected {dim} axes, got {}",
                        bounds.len()
                    )));
                }
                Self::new(bounds)
            }
        }
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    /// The per-dimension `(low, high)` bounds.
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// Volume of the box.
    pub fn volume(&self) -> f64 {
        box_volume(&self.bounds)
    }
}

impl TryFrom<Vec<(f64, f64)>> for IntegrationDomain {
    type Error = QuadError;

    fn try_from(bounds: Vec<(f64, f64)>) -> QuadResult<Self> {
        Self::new(&bounds)
    }
}

impl From<IntegrationDomain> for Vec<(f64, f64)> {
    fn from(domain: IntegrationDomain) -> Self {
        domain.bounds
    }
}

/// Volume of an axis-aligned box given by its bounds.
pub(crate) fn box_volume(bounds: &[(f64, f64)]) -> f64 {
    bounds.iter().map(|&(low, high)| high - low).product()
}
