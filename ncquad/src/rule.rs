//! Closed Newton-Cotes rules and the tensor-product composite collapse.

use serde::{Deserialize, Serialize};

use crate::error::{QuadError, QuadResult};
use crate::integrand::Scalar;

/// A closed Newton-Cotes rule applied as a composite rule along every axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rule {
    /// Trapezoid rule, weights `[1, 1] * h / 2`.
    Trapezoid,
    /// Simpson's 1/3 rule, weights `[1, 4, 1] * h / 3`.
    #[default]
    Simpson,
    /// Simpson's 3/8 rule, weights `[1, 3, 3, 1] * 3h / 8`.
    Simpson38,
    /// Boole's rule, weights `[7, 32, 12, 32, 7] * 2h / 45`.
    Boole,
}

impl Rule {
    /// Every supported rule.
    pub const ALL: [Rule; 4] = [Rule::Trapezoid, Rule::Simpson, Rule::Simpson38, Rule::Boole];

    /// Lowercase name of the rule.
    pub fn name(self) -> &'static str {
        match self {
            Rule::Trapezoid => "trapezoid",
            Rule::Simpson => "simpson",
            Rule::Simpson38 => "simpson38",
            Rule::Boole => "boole",
        }
    }

    /// Number of intervals covered by one stencil; also the stride between
    /// consecutive stencils.
    pub fn order(self) -> usize {
        self.weights().len() - 1
    }

    /// Integer stencil weights, to be multiplied by `scale() * h`.
    pub fn weights(self) -> &'static [f64] {
        match self {
            Rule::Trapezoid => &[1.0, 1.0],
            Rule::Simpson => &[1.0, 4.0, 1.0],
            Rule::Simpson38 => &[1.0, 3.0, 3.0, 1.0],
            Rule::Boole => &[7.0, 32.0, 12.0, 32.0, 7.0],
        }
    }

    /// Common factor of the stencil weights.
    pub fn scale(self) -> f64 {
        match self {
            Rule::Trapezoid => 0.5,
            Rule::Simpson => 1.0 / 3.0,
            Rule::Simpson38 => 3.0 / 8.0,
            Rule::Boole => 1.0 / 22.5,
        }
    }

    /// Highest polynomial degree integrated exactly.
    pub fn exact_degree(self) -> u32 {
        match self {
            Rule::Trapezoid => 1,
            Rule::Simpson | Rule::Simpson38 => 3,
            Rule::Boole => 5,
        }
    }

    /// Smallest admissible number of points per dimension.
    pub fn min_points_per_dim(self) -> usize {
        self.order() + 1
    }

    /// Returns `true` if an axis of `n` points can be covered by whole stencils.
    pub fn is_valid_points_per_dim(self, n: usize) -> bool {
        n >= self.min_points_per_dim() && (n - 1) % self.order() == 0
    }

    /// Checks an axis length against the divisibility constraint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGridSize` if `n` cannot be covered by whole stencils.
    pub fn check_points_per_dim(self, n: usize) -> QuadResult<()> {
        if self.is_valid_points_per_dim(n) {
            Ok(())
        } else {
            Err(self.grid_size_error(n))
        }
    }

    /// Largest rule-compliant number of points per dimension not above `raw`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGridSize` if `raw` is below the rule's minimum.
    pub fn adjust_points_per_dim(self, raw: usize) -> QuadResult<usize> {
        if raw < self.min_points_per_dim() {
            return Err(self.grid_size_error(raw));
        }
        Ok(raw - (raw - 1) % self.order())
    }

    /// Maps a requested total number of points to a rule-compliant one.
    ///
    /// The per-dimension count is the integer `dim`-th root of `n`, rounded
    /// down to satisfy the divisibility constraint; the result is that count
    /// raised to the power `dim`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGridSize` if `n` is too small to give every dimension
    /// at least `min_points_per_dim()` points.
    pub fn adjust_n(self, dim: usize, n: usize) -> QuadResult<usize> {
        let n_per_dim = self.adjust_points_per_dim(points_per_dim(dim, n))?;
        Ok(n_per_dim.pow(dim as u32))
    }

    pub(crate) fn grid_size_error(self, n_per_dim: usize) -> QuadError {
        QuadError::InvalidGridSize {
            rule: self.name(),
            n_per_dim,
            order: self.order(),
            min: self.min_points_per_dim(),
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer `dim`-th root of `n`, guarded against `powf` rounding just below
/// an exact root.
pub(crate) fn points_per_dim(dim: usize, n: usize) -> usize {
    if dim == 0 {
        return 0;
    }
    let mut root = ((n as f64).powf(1.0 / dim as f64) + 1e-8) as usize;
    while root > 0 && checked_pow(root, dim).map_or(true, |p| p > n) {
        root -= 1;
    }
    root
}

fn checked_pow(base: usize, dim: usize) -> Option<usize> {
    u32::try_from(dim).ok().and_then(|d| base.checked_pow(d))
}

/// Reduces a dense `n_per_dim^dim` grid of function values to a scalar by
/// applying the composite rule one axis at a time.
///
/// `values` is in row-major order with dimension 0 as the slowest axis and
/// `h[d]` is the grid spacing along dimension `d`. The last remaining axis
/// is collapsed first, so dimension `dim - 1` is integrated first and
/// dimension 0 last.
///
/// # Errors
///
/// Returns `InvalidGridSize` if `n_per_dim` violates the rule's divisibility
/// constraint or `values` does not hold exactly `n_per_dim^dim` entries.
pub fn collapse<T: Scalar>(rule: Rule, values: &[T], n_per_dim: usize, h: &[f64]) -> QuadResult<T> {
    rule.check_points_per_dim(n_per_dim)?;
    let dim = h.len();
    if dim == 0 || checked_pow(n_per_dim, dim) != Some(values.len()) {
        return Err(rule.grid_size_error(n_per_dim));
    }

    let weights = rule.weights();
    let order = rule.order();
    let mut current = values.to_vec();
    for d in (0..dim).rev() {
        let factor = rule.scale() * h[d];
        current = current
            .chunks_exact(n_per_dim)
            .map(|axis| {
                let mut sum = T::zero();
                for start in (0..n_per_dim - 1).step_by(order) {
                    for (w, &v) in weights.iter().zip(&axis[start..=start + order]) {
                        sum += v * *w;
                    }
                }
                sum * factor
            })
            .collect();
    }
    Ok(current[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex64;

    fn grid_1d(n: usize, low: f64, high: f64) -> (Vec<f64>, f64) {
        let h = (high - low) / (n - 1) as f64;
        ((0..n).map(|i| low + i as f64 * h).collect(), h)
    }

    #[test]
    fn test_weights_sum_to_interval_length() {
        for rule in Rule::ALL {
            let total: f64 = rule.weights().iter().sum::<f64>() * rule.scale();
            assert_abs_diff_eq!(total, rule.order() as f64, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_single_stencil_matches_closed_form() {
        // x^2 on [0, 1] with the minimal grid of every rule.
        for rule in Rule::ALL {
            let n = rule.min_points_per_dim();
            let (x, h) = grid_1d(n, 0.0, 1.0);
            let y: Vec<f64> = x.iter().map(|x| x * x).collect();
            let value = collapse(rule, &y, n, &[h]).unwrap();
            let expected = if rule == Rule::Trapezoid { 0.5 } else { 1.0 / 3.0 };
            assert_abs_diff_eq!(value, expected, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_boole_exact_for_quintic() {
        let (x, h) = grid_1d(9, -1.0, 2.0);
        let y: Vec<f64> = x.iter().map(|x| x.powi(5) - 2.0 * x.powi(4) + x).collect();
        let exact = |x: f64| x.powi(6) / 6.0 - 0.4 * x.powi(5) + 0.5 * x * x;
        let value = collapse(Rule::Boole, &y, 9, &[h]).unwrap();
        assert_abs_diff_eq!(value, exact(2.0) - exact(-1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_anisotropic_spacing_pairs_with_axis() {
        // f(x, y) = x on [0, 1] x [0, 10]: integral is 5.
        let n = 3;
        let (xs, hx) = grid_1d(n, 0.0, 1.0);
        let (_, hy) = grid_1d(n, 0.0, 10.0);
        let values: Vec<f64> = xs
            .iter()
            .flat_map(|&x| std::iter::repeat(x).take(n))
            .collect();
        let value = collapse(Rule::Simpson, &values, n, &[hx, hy]).unwrap();
        assert_abs_diff_eq!(value, 5.0, epsilon = 1e-13);
    }

    #[test]
    fn test_complex_values() {
        let (x, h) = grid_1d(5, 0.0, 1.0);
        let y: Vec<Complex64> = x.iter().map(|&x| Complex64::new(x, 2.0)).collect();
        let value = collapse(Rule::Simpson, &y, 5, &[h]).unwrap();
        assert_abs_diff_eq!(value.re, 0.5, epsilon = 1e-14);
        assert_abs_diff_eq!(value.im, 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_rejects_nonconforming_axis() {
        let y = vec![1.0; 4];
        let err = collapse(Rule::Simpson, &y, 4, &[0.1]).unwrap_err();
        assert!(matches!(err, QuadError::InvalidGridSize { n_per_dim: 4, .. }));

        // Length mismatch is reported the same way.
        let y = vec![1.0; 8];
        assert!(collapse(Rule::Simpson, &y, 3, &[0.1, 0.1]).is_err());
    }

    #[test]
    fn test_adjust_points_per_dim() {
        assert_eq!(Rule::Simpson.adjust_points_per_dim(10).unwrap(), 9);
        assert_eq!(Rule::Simpson.adjust_points_per_dim(9).unwrap(), 9);
        assert_eq!(Rule::Boole.adjust_points_per_dim(12).unwrap(), 9);
        assert_eq!(Rule::Simpson38.adjust_points_per_dim(6).unwrap(), 4);
        assert_eq!(Rule::Trapezoid.adjust_points_per_dim(6).unwrap(), 6);
        assert!(matches!(
            Rule::Boole.adjust_points_per_dim(4),
            Err(QuadError::InvalidGridSize { .. })
        ));
    }

    #[test]
    fn test_adjust_n() {
        assert_eq!(points_per_dim(3, 1000), 10);
        assert_eq!(points_per_dim(2, 99), 9);
        assert_eq!(Rule::Simpson.adjust_n(3, 1000).unwrap(), 729);
        assert_eq!(Rule::Boole.adjust_n(1, 50).unwrap(), 49);
        assert!(Rule::Boole.adjust_n(2, 24).is_err());
    }

    #[test]
    fn test_rule_serde_names() {
        let rule: Rule = serde_yaml::from_str("boole").unwrap();
        assert_eq!(rule, Rule::Boole);
        assert_eq!(Rule::Simpson38.to_string(), "simpson38");
    }
}
