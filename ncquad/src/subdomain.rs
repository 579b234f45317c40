//! A leaf box of the adaptive grid with its own regular point grid.

use tracing::error;

use crate::domain::box_volume;
use crate::error::{QuadError, QuadResult};
use crate::integrand::Scalar;
use crate::rule::{self, Rule};

/// A sub-box carrying a regular `n_per_dim^dim` grid and the function values
/// cached on it.
///
/// Grid points are numbered in row-major order with dimension 0 as the
/// slowest axis. Values that have not been evaluated yet are tracked by flat
/// index in `missing`.
#[derive(Debug, Clone)]
pub struct Subdomain<T> {
    /// The `(low, high)` bounds of this box.
    bounds: Vec<(f64, f64)>,
    /// The number of grid points along every dimension.
    n_per_dim: usize,
    /// The grid spacing along every dimension.
    h: Vec<f64>,
    /// Function values on the grid, of size `n_per_dim^dim`.
    fval: Vec<T>,
    /// Flat indices of grid points without a value, ascending.
    missing: Vec<usize>,
    /// Depth below the initial partition.
    level: usize,
    /// The last computed integral estimate.
    integral_value: T,
    /// Set whenever `fval` changed since `integral_value` was computed.
    requires_integral_value: bool,
    /// `|I_fine - I_coarse|` from the last integral computation, when the
    /// grid admits a coarse estimate.
    error_estimate: Option<f64>,
}

impl<T: Scalar> Subdomain<T> {
    /// Creates a subdomain with no cached values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGridSize` if `n_per_dim` violates the divisibility
    /// constraint of `rule`, and `InvalidDomain` for an empty or degenerate
    /// box.
    pub fn new(rule: Rule, bounds: Vec<(f64, f64)>, n_per_dim: usize, level: usize) -> QuadResult<Self> {
        rule.check_points_per_dim(n_per_dim)?;
        if bounds.is_empty() {
            return Err(QuadError::domain("subdomain must have at least one dimension"));
        }
        if let Some(axis) = bounds.iter().position(|&(low, high)| !(low < high)) {
            return Err(QuadError::domain(format!(
                "subdomain axis {axis} is degenerate: {:?}",
                bounds[axis]
            )));
        }
        let n_points = n_per_dim
            .checked_pow(bounds.len() as u32)
            .ok_or_else(|| QuadError::parameter("n_per_dim", "grid has too many points"))?;

        let h = bounds
            .iter()
            .map(|&(low, high)| (high - low) / (n_per_dim - 1) as f64)
            .collect();

        Ok(Subdomain {
            bounds,
            n_per_dim,
            h,
            fval: vec![T::zero(); n_points],
            missing: (0..n_points).collect(),
            level,
            integral_value: T::zero(),
            requires_integral_value: true,
            error_estimate: None,
        })
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    /// The bounds of this box.
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// Volume of this box.
    pub fn volume(&self) -> f64 {
        box_volume(&self.bounds)
    }

    pub fn n_per_dim(&self) -> usize {
        self.n_per_dim
    }

    pub fn h(&self) -> &[f64] {
        &self.h
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Total number of grid points.
    pub fn n_points(&self) -> usize {
        self.fval.len()
    }

    /// Number of grid points still waiting for a function value.
    pub fn n_missing(&self) -> usize {
        self.missing.len()
    }

    /// Returns `true` once every grid point carries a value.
    pub fn is_populated(&self) -> bool {
        self.missing.is_empty()
    }

    /// Cached function values in grid order, if every point has one.
    pub fn fval(&self) -> Option<&[T]> {
        self.is_populated().then_some(self.fval.as_slice())
    }

    pub fn integral_value(&self) -> T {
        self.integral_value
    }

    pub fn requires_integral_value(&self) -> bool {
        self.requires_integral_value
    }

    pub fn error_estimate(&self) -> Option<f64> {
        self.error_estimate
    }

    /// Writes the coordinates of grid point `index` into `out`.
    fn write_point(&self, index: usize, out: &mut [f64]) {
        let mut rest = index;
        for d in (0..self.dim()).rev() {
            let i = rest % self.n_per_dim;
            rest /= self.n_per_dim;
            let (low, high) = self.bounds[d];
            out[d] = if i == self.n_per_dim - 1 {
                high
            } else {
                low + i as f64 * self.h[d]
            };
        }
    }

    fn points_at(&self, indices: impl ExactSizeIterator<Item = usize>) -> Vec<f64> {
        let dim = self.dim();
        let mut points = vec![0.0; indices.len() * dim];
        for (chunk, index) in points.chunks_exact_mut(dim).zip(indices) {
            self.write_point(index, chunk);
        }
        points
    }

    /// Every grid point, flattened row-major into `n_points() * dim()`
    /// coordinates.
    pub fn generate_points(&self) -> Vec<f64> {
        self.points_at(0..self.n_points())
    }

    /// The grid points that still need a function value, in grid order.
    pub fn pending_points(&self) -> Vec<f64> {
        self.points_at(self.missing.iter().copied())
    }

    /// Stores the values for the points returned by [`pending_points`].
    ///
    /// # Errors
    ///
    /// Returns `EvaluationMismatch` if `values` does not hold exactly one
    /// value per pending point.
    ///
    /// [`pending_points`]: Subdomain::pending_points
    pub fn ingest_values(&mut self, values: &[T]) -> QuadResult<()> {
        if values.len() != self.missing.len() {
            return Err(QuadError::EvaluationMismatch {
                expected: self.missing.len(),
                got: values.len(),
            });
        }
        for (&index, &value) in self.missing.iter().zip(values) {
            self.fval[index] = value;
        }
        self.missing.clear();
        self.requires_integral_value = true;
        Ok(())
    }

    /// Applies the composite rule to the cached values and stores the
    /// estimate.
    ///
    /// # Errors
    ///
    /// Returns `IntegralNotReady` while grid points are still missing values.
    pub fn compute_integral(&mut self, rule: Rule) -> QuadResult<T> {
        if !self.is_populated() {
            error!(n_missing = self.missing.len(), "integral requested before all grid values arrived");
            return Err(QuadError::IntegralNotReady {
                what: format!("{} grid values missing", self.missing.len()),
            });
        }
        let value = rule::collapse(rule, &self.fval, self.n_per_dim, &self.h)?;
        self.error_estimate = self
            .coarse_integral(rule)?
            .map(|coarse| (value + coarse * -1.0).modulus());
        self.integral_value = value;
        self.requires_integral_value = false;
        Ok(value)
    }

    /// The same rule applied on every other grid point, if the coarser grid
    /// still satisfies the divisibility constraint.
    fn coarse_integral(&self, rule: Rule) -> QuadResult<Option<T>> {
        let m = self.n_per_dim - 1;
        if m % (2 * rule.order()) != 0 {
            return Ok(None);
        }
        let n_coarse = m / 2 + 1;
        let n_points = n_coarse.pow(self.dim() as u32);
        let values: Vec<T> = (0..n_points)
            .map(|coarse| {
                let mut rest = coarse;
                let mut index = 0;
                let mut stride = 1;
                for _ in 0..self.dim() {
                    index += 2 * (rest % n_coarse) * stride;
                    rest /= n_coarse;
                    stride *= self.n_per_dim;
                }
                self.fval[index]
            })
            .collect();
        let h: Vec<f64> = self.h.iter().map(|h| 2.0 * h).collect();
        rule::collapse(rule, &values, n_coarse, &h).map(Some)
    }

    /// For every child position `c` along one axis, the parent grid index
    /// each child grid index coincides with.
    ///
    /// Child `c` starts at parent coordinate `c * m / s` (in units of the
    /// parent spacing) and has spacing `1 / s`, so child point `j` sits at
    /// `(c * m + j) / s`, a parent grid point whenever that divides evenly.
    fn coincidence_table(&self, subdomains_per_dim: usize) -> Vec<Vec<Option<usize>>> {
        let m = self.n_per_dim - 1;
        (0..subdomains_per_dim)
            .map(|c| {
                (0..self.n_per_dim)
                    .map(|j| {
                        let p = c * m + j;
                        (p % subdomains_per_dim == 0).then_some(p / subdomains_per_dim)
                    })
                    .collect()
            })
            .collect()
    }

    /// Number of evaluations the children of [`split`] will request.
    ///
    /// [`split`]: Subdomain::split
    pub fn split_cost(&self, subdomains_per_dim: usize, reuse_old_fvals: bool) -> usize {
        let dim = self.dim() as u32;
        let total = subdomains_per_dim.pow(dim) * self.n_points();
        if !reuse_old_fvals || !self.is_populated() {
            return total;
        }
        let reused_per_axis: usize = self
            .coincidence_table(subdomains_per_dim)
            .iter()
            .map(|row| row.iter().filter(|p| p.is_some()).count())
            .sum();
        total - reused_per_axis.pow(dim)
    }

    /// Splits this box into `subdomains_per_dim^dim` children one level
    /// deeper, each with the same number of points per dimension.
    ///
    /// Children are returned in row-major order of their position. With
    /// `reuse_old_fvals`, every child grid point that coincides with a grid
    /// point of this box takes its cached value, matched by grid index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `subdomains_per_dim < 2`.
    pub fn split(
        &self,
        rule: Rule,
        subdomains_per_dim: usize,
        reuse_old_fvals: bool,
    ) -> QuadResult<Vec<Subdomain<T>>> {
        if subdomains_per_dim < 2 {
            return Err(QuadError::parameter(
                "subdomains_per_dim",
                format!("must be at least 2, got {subdomains_per_dim}"),
            ));
        }
        let dim = self.dim();
        let n_children = subdomains_per_dim.pow(dim as u32);
        let reuse = reuse_old_fvals && self.is_populated();
        let table = self.coincidence_table(subdomains_per_dim);

        let mut children = Vec::with_capacity(n_children);
        let mut position = vec![0; dim];
        for child_index in 0..n_children {
            let mut rest = child_index;
            for d in (0..dim).rev() {
                position[d] = rest % subdomains_per_dim;
                rest /= subdomains_per_dim;
            }

            let bounds = self
                .bounds
                .iter()
                .zip(&position)
                .map(|(&(low, high), &c)| {
                    let width = (high - low) / subdomains_per_dim as f64;
                    let child_low = low + c as f64 * width;
                    let child_high = if c + 1 == subdomains_per_dim {
                        high
                    } else {
                        low + (c + 1) as f64 * width
                    };
                    (child_low, child_high)
                })
                .collect();

            let mut child = Subdomain::new(rule, bounds, self.n_per_dim, self.level + 1)?;
            if reuse {
                self.inherit_values(&mut child, &table, &position);
            }
            children.push(child);
        }
        Ok(children)
    }

    fn inherit_values(&self, child: &mut Subdomain<T>, table: &[Vec<Option<usize>>], position: &[usize]) {
        let n = self.n_per_dim;
        let mut missing = Vec::with_capacity(child.missing.len());
        for index in 0..child.n_points() {
            let mut rest = index;
            let mut parent_index = 0;
            let mut stride = 1;
            let mut coincident = true;
            for d in (0..self.dim()).rev() {
                let j = rest % n;
                rest /= n;
                match table[position[d]][j] {
                    Some(p) => parent_index += p * stride,
                    None => {
                        coincident = false;
                        break;
                    }
                }
                stride *= n;
            }
            if coincident {
                child.fval[index] = self.fval[parent_index];
            } else {
                missing.push(index);
            }
        }
        child.missing = missing;
    }

    pub(crate) fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    /// Drops the cached values once the box has been replaced by children.
    pub(crate) fn release_values(&mut self) {
        self.fval = Vec::new();
    }
}
