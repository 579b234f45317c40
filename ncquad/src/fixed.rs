//! Non-adaptive Newton-Cotes integration on one regular grid.

use tracing::{debug, info};

use crate::domain::IntegrationDomain;
use crate::error::{QuadError, QuadResult};
use crate::integrand::{BatchIntegrand, Scalar};
use crate::rule::{points_per_dim, Rule};
use crate::subdomain::Subdomain;

/// Integrates `integrand` with `rule` on a single regular grid of `n` points
/// spanning the whole domain.
///
/// `n` must equal `n_per_dim^dim` for a number of points per dimension that
/// satisfies the divisibility constraint of `rule`; use [`Rule::adjust_n`]
/// to obtain a valid `n`. `domain` defaults to `[-1, 1]^dim`.
///
/// # Errors
///
/// Returns `InvalidGridSize` before any evaluation if `n` is not a full grid
/// or the number of points per dimension is not valid for `rule`.
///
/// # Examples
///
/// ```
/// use ncquad::fixed;
/// use ncquad::integrand::BatchFn;
/// use ncquad::rule::Rule;
///
/// let f = BatchFn::new(2, |pts: &[f64]| {
///     pts.chunks_exact(2).map(|x| x[0] * x[1] * x[1]).collect()
/// });
/// let n = Rule::Boole.adjust_n(2, 100).unwrap();
/// let value: f64 = fixed::integrate(Rule::Boole, &f, n, Some(&[(0.0, 1.0), (0.0, 3.0)])).unwrap();
/// assert!((value - 4.5).abs() < 1e-12);
/// ```
pub fn integrate<T, F>(rule: Rule, integrand: &F, n: usize, domain: Option<&[(f64, f64)]>) -> QuadResult<T>
where
    T: Scalar,
    F: BatchIntegrand<T> + ?Sized,
{
    let domain = IntegrationDomain::setup(integrand.dim(), domain)?;
    let dim = domain.dim();
    let n_per_dim = points_per_dim(dim, n);
    rule.check_points_per_dim(n_per_dim)?;
    if n_per_dim.checked_pow(dim as u32) != Some(n) {
        debug!(n, n_per_dim, dim, "point count is not a full grid");
        return Err(rule.grid_size_error(n_per_dim));
    }
    debug!(
        rule = %rule,
        n,
        n_per_dim,
        domain = ?domain.bounds(),
        "starting fixed-grid integration"
    );

    let mut grid = Subdomain::new(rule, domain.bounds().to_vec(), n_per_dim, 0)?;
    let points = grid.pending_points();
    let values = integrand.eval_batch(&points);
    if values.len() != grid.n_points() {
        return Err(QuadError::EvaluationMismatch {
            expected: grid.n_points(),
            got: values.len(),
        });
    }
    grid.ingest_values(&values)?;
    let value = grid.compute_integral(rule)?;
    info!(?value, n_evals = values.len(), "computed integral");
    Ok(value)
}
