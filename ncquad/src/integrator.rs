//! The adaptive Newton-Cotes integrator.

use tracing::{debug, info};

use crate::adaptive::AdaptiveGrid;
use crate::config::AdaptiveOptions;
use crate::domain::IntegrationDomain;
use crate::error::{QuadError, QuadResult};
use crate::integrand::{BatchIntegrand, Scalar};
use crate::refinement::RefinementStrategy;

/// Stores the result of an adaptive integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveResult<T> {
    /// The estimated value of the integral.
    pub value: T,
    /// The number of integrand evaluations spent.
    pub n_evals: usize,
    /// The number of leaf subdomains at the end of the run.
    pub n_subdomains: usize,
    /// The deepest refinement level reached.
    pub max_level: usize,
    /// The number of evaluate-integrate rounds.
    pub iterations: usize,
}

/// Stages of the evaluate-integrate-refine loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Evaluating,
    Integrating,
    Refining,
    Done,
}

/// Integrates over an adaptively refined grid of Newton-Cotes subdomains.
///
/// The integrator alternates between evaluating the integrand on every
/// pending grid point in one batch, recomputing the estimates of the
/// subdomains that changed, and splitting subdomains, until the evaluation
/// budget is spent or no subdomain can be split any more.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveNewtonCotes {
    options: AdaptiveOptions,
}

impl AdaptiveNewtonCotes {
    /// Creates a new integrator.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the options fail validation.
    pub fn new(options: AdaptiveOptions) -> QuadResult<Self> {
        options.validate()?;
        Ok(AdaptiveNewtonCotes { options })
    }

    pub fn options(&self) -> &AdaptiveOptions {
        &self.options
    }

    /// Integrates `integrand` with at most `n` evaluations, using the
    /// refinement strategy from the options.
    ///
    /// `domain` defaults to `[-1, 1]^dim`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ncquad::config::AdaptiveOptions;
    /// use ncquad::integrand::{Integrand, Parallel};
    /// use ncquad::integrator::AdaptiveNewtonCotes;
    ///
    /// struct Square;
    ///
    /// impl Integrand for Square {
    ///     fn dim(&self) -> usize {
    ///         1
    ///     }
    ///
    ///     fn eval(&self, x: &[f64]) -> f64 {
    ///         x[0] * x[0]
    ///     }
    /// }
    ///
    /// let integrator = AdaptiveNewtonCotes::new(AdaptiveOptions::default()).unwrap();
    /// let result = integrator.integrate(&Parallel(Square), 1000, None).unwrap();
    ///
    /// assert!((result.value - 2.0 / 3.0).abs() < 1e-12);
    /// assert!(result.n_evals <= 1000);
    /// ```
    pub fn integrate<T, F>(&self, integrand: &F, n: usize, domain: Option<&[(f64, f64)]>) -> QuadResult<AdaptiveResult<T>>
    where
        T: Scalar,
        F: BatchIntegrand<T> + ?Sized,
    {
        let strategy = self.options.refinement;
        self.integrate_with(integrand, n, domain, &strategy)
    }

    /// Like [`integrate`](AdaptiveNewtonCotes::integrate), with a custom
    /// refinement strategy.
    pub fn integrate_with<T, F, S>(
        &self,
        integrand: &F,
        n: usize,
        domain: Option<&[(f64, f64)]>,
        strategy: &S,
    ) -> QuadResult<AdaptiveResult<T>>
    where
        T: Scalar,
        F: BatchIntegrand<T> + ?Sized,
        S: RefinementStrategy,
    {
        let dim = integrand.dim();
        let domain = IntegrationDomain::setup(dim, domain)?;
        if n == 0 {
            return Err(QuadError::parameter("n", "evaluation budget must be positive"));
        }
        debug!(
            rule = %self.options.rule,
            n,
            domain = ?domain.bounds(),
            "starting adaptive integration"
        );

        let mut grid = AdaptiveGrid::new(&domain, &self.options, n)?;
        let mut iterations = 0;
        let mut stage = Stage::Evaluating;
        while stage != Stage::Done {
            stage = match stage {
                Stage::Evaluating => {
                    let batch = grid.get_next_eval_points()?;
                    let n_points = batch.n_points();
                    debug!(n_points, n_chunks = batch.chunksizes.len(), "evaluating integrand");
                    let values = if n_points == 0 {
                        Vec::new()
                    } else {
                        integrand.eval_batch(&batch.points)
                    };
                    if values.len() != n_points {
                        return Err(QuadError::EvaluationMismatch {
                            expected: n_points,
                            got: values.len(),
                        });
                    }
                    grid.set_fvals(&values, &batch.chunksizes)?;
                    Stage::Integrating
                }
                Stage::Integrating => {
                    let n_computed = grid.compute_integrals()?;
                    debug!(n_computed, "computed subdomain integrals");
                    iterations += 1;
                    if grid.evals_spent() >= n {
                        Stage::Done
                    } else {
                        Stage::Refining
                    }
                }
                Stage::Refining => {
                    if grid.refine(strategy)? > 0 {
                        Stage::Evaluating
                    } else {
                        debug!(
                            remaining = grid.remaining_budget(),
                            "no subdomain can be refined further"
                        );
                        Stage::Done
                    }
                }
                Stage::Done => Stage::Done,
            };
        }

        let value = grid.get_integral()?;
        let result = AdaptiveResult {
            value,
            n_evals: grid.evals_spent(),
            n_subdomains: grid.n_subdomains(),
            max_level: grid.max_level(),
            iterations,
        };
        info!(
            value = ?result.value,
            n_evals = result.n_evals,
            n_subdomains = result.n_subdomains,
            "computed integral"
        );
        Ok(result)
    }
}

/// Integrates a `dim`-dimensional batched function with at most `n`
/// evaluations.
///
/// `domain` defaults to `[-1, 1]^dim`. Complex integrands are integrated by
/// returning `Complex64` values from `integrand`.
///
/// # Errors
///
/// Returns `InvalidParameter` if `integrand.dim() != dim`, and any error of
/// [`AdaptiveNewtonCotes::integrate`].
pub fn integrate<T, F>(
    integrand: &F,
    dim: usize,
    n: usize,
    domain: Option<&[(f64, f64)]>,
    options: &AdaptiveOptions,
) -> QuadResult<AdaptiveResult<T>>
where
    T: Scalar,
    F: BatchIntegrand<T> + ?Sized,
{
    if integrand.dim() != dim {
        return Err(QuadError::parameter(
            "dim",
            format!("integrand has {} dimensions, expected {dim}", integrand.dim()),
        ));
    }
    AdaptiveNewtonCotes::new(options.clone())?.integrate(integrand, n, domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrand::BatchFn;
    use crate::refinement::{ErrorDriven, Uniform};
    use crate::rule::Rule;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex64;
    use std::cell::Cell;

    fn square_1d() -> BatchFn<impl Fn(&[f64]) -> Vec<f64>, f64> {
        BatchFn::new(1, |pts: &[f64]| pts.iter().map(|x| x * x).collect())
    }

    #[test]
    fn test_square_with_level_cap() {
        let options = AdaptiveOptions::default().with_max_refinement_level(2);
        let result = integrate(&square_1d(), 1, 1000, Some(&[(-1.0, 1.0)]), &options).unwrap();
        assert_abs_diff_eq!(result.value, 2.0 / 3.0, epsilon = 1e-6);
        assert_eq!(result.max_level, 2);
        assert_eq!(result.n_subdomains, 8);
        assert_eq!(result.n_evals, 98 + 96 + 192);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_budget_exhaustion_stops_loop() {
        let options = AdaptiveOptions::default().with_max_refinement_level(30);
        let calls = Cell::new(0);
        let f = BatchFn::new(1, |pts: &[f64]| {
            calls.set(calls.get() + 1);
            pts.iter().map(|x| x.exp()).collect()
        });
        let result = integrate(&f, 1, 2000, None, &options).unwrap();
        assert!(result.n_evals <= 2000);
        assert_eq!(calls.get(), result.iterations);
        let exact = 1f64.exp() - (-1f64).exp();
        assert_abs_diff_eq!(result.value, exact, epsilon = 1e-10);
    }

    #[test]
    fn test_complex_integrand() {
        let f = BatchFn::new(1, |pts: &[f64]| {
            pts.iter().map(|&x| Complex64::new(x * x, 3.0)).collect()
        });
        let result = integrate(&f, 1, 500, Some(&[(0.0, 1.0)]), &AdaptiveOptions::default()).unwrap();
        assert_abs_diff_eq!(result.value.re, 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.value.im, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = integrate(&square_1d(), 2, 1000, None, &AdaptiveOptions::default()).unwrap_err();
        assert!(matches!(err, QuadError::InvalidParameter { parameter: "dim", .. }));
    }

    #[test]
    fn test_evaluator_length_mismatch() {
        let f = BatchFn::new(1, |pts: &[f64]| vec![0.0; pts.len() - 1]);
        let err = integrate(&f, 1, 1000, None, &AdaptiveOptions::default()).unwrap_err();
        assert!(matches!(err, QuadError::EvaluationMismatch { .. }));
    }

    #[test]
    fn test_too_small_budget_evaluates_nothing() {
        let calls = Cell::new(0);
        let f = BatchFn::new(2, |pts: &[f64]| {
            calls.set(calls.get() + 1);
            vec![1.0; pts.len() / 2]
        });
        let options = AdaptiveOptions::new(Rule::Boole);
        let err = integrate(&f, 2, 500, None, &options).unwrap_err();
        assert!(matches!(err, QuadError::InvalidGridSize { .. }));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_error_driven_refines_peak() {
        // Narrow peak near x = 0.7: error-driven refinement splits there first.
        let f = BatchFn::new(1, |pts: &[f64]| {
            pts.iter().map(|&x| 1.0 / (1e-3 + (x - 0.7).powi(2))).collect()
        });
        let integrator = AdaptiveNewtonCotes::new(
            AdaptiveOptions::new(Rule::Simpson).with_max_refinement_level(12),
        )
        .unwrap();
        let exact = {
            let a = 1e-3f64.sqrt();
            ((0.3 / a).atan() - (-1.7 / a).atan()) / a
        };
        let driven = integrator
            .integrate_with(&f, 3000, None, &ErrorDriven { threshold: 0.05 })
            .unwrap();
        let uniform = integrator.integrate_with(&f, 3000, None, &Uniform).unwrap();
        assert!(driven.n_evals <= 3000 && uniform.n_evals <= 3000);
        assert!(driven.max_level > uniform.max_level);
        assert!((driven.value - exact).abs() < (uniform.value - exact).abs());
    }
}
