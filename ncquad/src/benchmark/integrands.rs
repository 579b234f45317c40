//! Standard benchmark integrands with known integrals.
//!
//! The Genz functions are integrated over the unit cube `[0, 1]^dim`;
//! [`ProductPolynomial`] over any box.
use crate::integrand::{Integrand, SimdIntegrand};
use num_complex::Complex64;
use wide::f64x4;

use libm::erf;
use std::f64::consts::PI;

/// Returns the parameters for the Genz test functions.
fn genz_params(dim: usize) -> (Vec<f64>, Vec<f64>) {
    let mut c = Vec::with_capacity(dim);
    let mut w = Vec::with_capacity(dim);
    for i in 1..=dim {
        c.push(((i as f64).sqrt() * 12345.).fract());
        w.push(((i as f64).sqrt() * 54321.).fract());
    }
    (c, w)
}

/// The unit cube `[0, 1]^dim` the Genz functions are defined on.
pub fn unit_domain(dim: usize) -> Vec<(f64, f64)> {
    vec![(0.0, 1.0); dim]
}

// Genz Oscillatory
#[derive(Clone)]
pub struct GenzOscillatory {
    dim: usize,
    c: Vec<f64>,
    w: Vec<f64>,
    c_simd: Vec<f64x4>,
    w_simd: Vec<f64x4>,
}

impl GenzOscillatory {
    pub fn new(dim: usize) -> Self {
        let (c, w) = genz_params(dim);
        let c_simd = c.iter().map(|&val| f64x4::splat(val)).collect();
        let w_simd = w.iter().map(|&val| f64x4::splat(val)).collect();
        Self {
            dim,
            c,
            w,
            c_simd,
            w_simd,
        }
    }

    /// Real part of `prod_i (e^{i c_i (1 - w_i)} - e^{-i c_i w_i}) / (i c_i)`.
    pub fn analytical_result(&self) -> f64 {
        let mut result = Complex64::new(1.0, 0.0);
        for i in 0..self.dim {
            let upper = Complex64::from_polar(1.0, self.c[i] * (1. - self.w[i]));
            let lower = Complex64::from_polar(1.0, -self.c[i] * self.w[i]);
            result *= (upper - lower) / Complex64::new(0.0, self.c[i]);
        }
        result.re
    }
}

impl Integrand for GenzOscillatory {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval(&self, x: &[f64]) -> f64 {
        let mut sum = 0.;
        for i in 0..self.dim {
            sum += self.c[i] * (x[i] - self.w[i]);
        }
        sum.cos()
    }
}

impl SimdIntegrand for GenzOscillatory {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval_simd(&self, x: &[f64x4]) -> f64x4 {
        let mut sum = f64x4::splat(0.);
        for i in 0..self.dim {
            sum += self.c_simd[i] * (x[i] - self.w_simd[i]);
        }
        sum.cos()
    }
}

// Genz Product Peak
#[derive(Clone)]
pub struct GenzProductPeak {
    dim: usize,
    c: Vec<f64>,
    w: Vec<f64>,
    c_simd: Vec<f64x4>,
    w_simd: Vec<f64x4>,
}

impl GenzProductPeak {
    pub fn new(dim: usize) -> Self {
        let (c, w) = genz_params(dim);
        let c_simd = c.iter().map(|&val| f64x4::splat(val)).collect();
        let w_simd = w.iter().map(|&val| f64x4::splat(val)).collect();
        Self {
            dim,
            c,
            w,
            c_simd,
            w_simd,
        }
    }

    pub fn analytical_result(&self) -> f64 {
        let mut result = 1.0;
        for i in 0..self.dim {
            result *= self.c[i]
                * ((self.c[i] * (1. - self.w[i])).atan() + (self.c[i] * self.w[i]).atan());
        }
        result
    }
}

impl Integrand for GenzProductPeak {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval(&self, x: &[f64]) -> f64 {
        let mut result = 1.0;
        for i in 0..self.dim {
            result *= 1.0 / (self.c[i].powi(-2) + (x[i] - self.w[i]).powi(2));
        }
        result
    }
}

impl SimdIntegrand for GenzProductPeak {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval_simd(&self, x: &[f64x4]) -> f64x4 {
        let one = f64x4::splat(1.0);
        let mut result = one;
        for i in 0..self.dim {
            let inv_c = one / self.c_simd[i];
            let dx = x[i] - self.w_simd[i];
            result *= one / (inv_c * inv_c + dx * dx);
        }
        result
    }
}

// Genz Gaussian
#[derive(Clone)]
pub struct GenzGaussian {
    dim: usize,
    c: Vec<f64>,
    w: Vec<f64>,
    c_simd: Vec<f64x4>,
    w_simd: Vec<f64x4>,
}

impl GenzGaussian {
    pub fn new(dim: usize) -> Self {
        let (c, w) = genz_params(dim);
        let c_simd = c.iter().map(|&val| f64x4::splat(val)).collect();
        let w_simd = w.iter().map(|&val| f64x4::splat(val)).collect();
        Self {
            dim,
            c,
            w,
            c_simd,
            w_simd,
        }
    }

    pub fn analytical_result(&self) -> f64 {
        let mut result = 1.0;
        for i in 0..self.dim {
            result *= (PI.sqrt() / (2. * self.c[i]))
                * (erf(self.c[i] * (1. - self.w[i])) + erf(self.c[i] * self.w[i]));
        }
        result
    }
}

impl Integrand for GenzGaussian {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval(&self, x: &[f64]) -> f64 {
        let mut sum = 0.0;
        for i in 0..self.dim {
            sum += self.c[i].powi(2) * (x[i] - self.w[i]).powi(2);
        }
        (-sum).exp()
    }
}

impl SimdIntegrand for GenzGaussian {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval_simd(&self, x: &[f64x4]) -> f64x4 {
        let mut sum = f64x4::splat(0.0);
        for i in 0..self.dim {
            let scaled = self.c_simd[i] * (x[i] - self.w_simd[i]);
            sum += scaled * scaled;
        }
        (-sum).exp()
    }
}

/// `prod_d p_d(x_d)` with one polynomial per dimension, coefficients in
/// ascending order of degree.
#[derive(Debug, Clone)]
pub struct ProductPolynomial {
    coefficients: Vec<Vec<f64>>,
}

impl ProductPolynomial {
    pub fn new(coefficients: Vec<Vec<f64>>) -> Self {
        Self { coefficients }
    }

    /// Highest degree over all dimensions.
    pub fn degree(&self) -> usize {
        self.coefficients
            .iter()
            .map(|c| c.len().saturating_sub(1))
            .max()
            .unwrap_or(0)
    }

    pub fn analytical_result(&self, domain: &[(f64, f64)]) -> f64 {
        self.coefficients
            .iter()
            .zip(domain)
            .map(|(coeffs, &(low, high))| {
                let antiderivative = |x: f64| {
                    coeffs
                        .iter()
                        .enumerate()
                        .rev()
                        .fold(0.0, |acc, (k, &a)| acc * x + a / (k + 1) as f64)
                        * x
                };
                antiderivative(high) - antiderivative(low)
            })
            .product()
    }
}

impl Integrand for ProductPolynomial {
    fn dim(&self) -> usize {
        self.coefficients.len()
    }

    fn eval(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(x)
            .map(|(coeffs, &x)| coeffs.iter().rev().fold(0.0, |acc, &a| acc * x + a))
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed;
    use crate::integrand::{Parallel, Simd};
    use crate::rule::Rule;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_genz_references_1d() {
        // Fine fixed grids agree with the closed forms.
        let n = 4097;
        let domain = unit_domain(1);
        let osc = GenzOscillatory::new(1);
        let value: f64 = fixed::integrate(Rule::Boole, &Parallel(osc.clone()), n, Some(&domain)).unwrap();
        assert_abs_diff_eq!(value, osc.analytical_result(), epsilon = 1e-12);

        let peak = GenzProductPeak::new(1);
        let value: f64 = fixed::integrate(Rule::Boole, &Parallel(peak.clone()), n, Some(&domain)).unwrap();
        assert_abs_diff_eq!(value, peak.analytical_result(), epsilon = 1e-12);

        let gauss = GenzGaussian::new(1);
        let value: f64 = fixed::integrate(Rule::Boole, &Parallel(gauss.clone()), n, Some(&domain)).unwrap();
        assert_abs_diff_eq!(value, gauss.analytical_result(), epsilon = 1e-12);
    }

    #[test]
    fn test_genz_oscillatory_2d() {
        let osc = GenzOscillatory::new(2);
        let n = 129usize.pow(2);
        let value: f64 = fixed::integrate(Rule::Boole, &Simd(osc.clone()), n, Some(&unit_domain(2))).unwrap();
        assert_abs_diff_eq!(value, osc.analytical_result(), epsilon = 1e-10);
    }

    #[test]
    fn test_simd_matches_scalar() {
        let peak = GenzProductPeak::new(3);
        let gauss = GenzGaussian::new(3);
        let x = [0.1, 0.5, 0.9];
        let packet: Vec<f64x4> = x.iter().map(|&v| f64x4::splat(v)).collect();
        assert_abs_diff_eq!(peak.eval_simd(&packet).to_array()[0], peak.eval(&x), epsilon = 1e-12);
        assert_abs_diff_eq!(gauss.eval_simd(&packet).to_array()[3], gauss.eval(&x), epsilon = 1e-12);
    }

    #[test]
    fn test_product_polynomial() {
        let p = ProductPolynomial::new(vec![vec![1.0, 0.0, 3.0], vec![0.0, 2.0]]);
        assert_eq!(p.degree(), 2);
        assert_eq!(p.eval(&[2.0, 0.5]), 13.0);
        // (x + x^3)|_0^1 * (y^2)|_0^2 = 2 * 4
        assert_abs_diff_eq!(p.analytical_result(&[(0.0, 1.0), (0.0, 2.0)]), 8.0, epsilon = 1e-14);
    }
}
