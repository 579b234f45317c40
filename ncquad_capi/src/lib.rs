//! The C-language interface for `ncquad`

use std::ffi::c_void;
use std::os::raw::c_int;
use std::slice;

use ncquad::integrand::{Integrand, Parallel};
use ncquad::{fixed, AdaptiveNewtonCotes, AdaptiveOptions, QuadError, Rule};

/// Returned on success.
pub const NCQUAD_OK: c_int = 0;
/// The integration domain is malformed.
pub const NCQUAD_INVALID_DOMAIN: c_int = 1;
/// The points per dimension violate the rule's constraint.
pub const NCQUAD_INVALID_GRID_SIZE: c_int = 2;
/// An evaluation batch would exceed the budget.
pub const NCQUAD_BUDGET_EXHAUSTED: c_int = 3;
/// A subdomain estimate was missing.
pub const NCQUAD_INTEGRAL_NOT_READY: c_int = 4;
/// A parameter or option is out of range.
pub const NCQUAD_INVALID_PARAMETER: c_int = 5;
/// Any other failure.
pub const NCQUAD_ERROR: c_int = 6;

fn status(err: &QuadError) -> c_int {
    match err {
        QuadError::InvalidDomain { .. } => NCQUAD_INVALID_DOMAIN,
        QuadError::InvalidGridSize { .. } => NCQUAD_INVALID_GRID_SIZE,
        QuadError::BudgetExhaustedPrematurely { .. } => NCQUAD_BUDGET_EXHAUSTED,
        QuadError::IntegralNotReady { .. } => NCQUAD_INTEGRAL_NOT_READY,
        QuadError::InvalidParameter { .. } | QuadError::Config(_) => NCQUAD_INVALID_PARAMETER,
        _ => NCQUAD_ERROR,
    }
}

/// A C-compatible struct for integration boundaries.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CBoundary {
    pub min: f64,
    pub max: f64,
}

/// The Newton-Cotes rules.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CRule {
    Trapezoid = 0,
    Simpson = 1,
    Simpson38 = 2,
    Boole = 3,
}

impl From<CRule> for Rule {
    fn from(rule: CRule) -> Self {
        match rule {
            CRule::Trapezoid => Rule::Trapezoid,
            CRule::Simpson => Rule::Simpson,
            CRule::Simpson38 => Rule::Simpson38,
            CRule::Boole => Rule::Boole,
        }
    }
}

/// Options of the adaptive integrator. Splitting is always uniform.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CAdaptiveOptions {
    pub rule: CRule,
    pub subdomains_per_dim: usize,
    pub max_refinement_level: usize,
    pub reuse_old_fvals: bool,
    pub initial_fraction: f64,
}

impl From<CAdaptiveOptions> for AdaptiveOptions {
    fn from(options: CAdaptiveOptions) -> Self {
        AdaptiveOptions::new(options.rule.into())
            .with_subdomains_per_dim(options.subdomains_per_dim)
            .with_max_refinement_level(options.max_refinement_level)
            .with_reuse_old_fvals(options.reuse_old_fvals)
            .with_initial_fraction(options.initial_fraction)
    }
}

/// The outcome of an integration. All other fields are zero unless `status`
/// is `NCQUAD_OK`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CAdaptiveResult {
    pub status: c_int,
    pub value: f64,
    pub n_evals: usize,
    pub n_subdomains: usize,
    pub max_level: usize,
    pub iterations: usize,
}

impl CAdaptiveResult {
    fn failed(err: &QuadError) -> Self {
        CAdaptiveResult {
            status: status(err),
            ..Default::default()
        }
    }
}

/// The C-style integrand function pointer.
/// The first argument is the point `x` (an array of f64).
/// The second argument is the dimension.
/// The third is a user-provided `user_data` pointer.
pub type CIntegrand = extern "C" fn(*const f64, c_int, *mut c_void) -> f64;

/// A wrapper that implements the Rust `Integrand` trait.
struct CIntegrandWrapper {
    dim: usize,
    func: CIntegrand,
    user_data: *mut c_void,
}

impl Integrand for CIntegrandWrapper {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval(&self, x: &[f64]) -> f64 {
        (self.func)(x.as_ptr(), self.dim as c_int, self.user_data)
    }
}

/// This is unsafe, but required to integrate with Rayon.
/// The user of the C API is responsible for ensuring that the provided
/// integrand function is thread-safe.
unsafe impl Sync for CIntegrandWrapper {}

unsafe fn read_boundaries(dim: usize, boundaries: *const CBoundary) -> Option<Vec<(f64, f64)>> {
    if boundaries.is_null() {
        return None;
    }
    let slice = slice::from_raw_parts(boundaries, dim);
    Some(slice.iter().map(|b| (b.min, b.max)).collect())
}

/// Returns the default adaptive options: Simpson's rule, two subdomains per
/// dimension, four refinement levels and reuse of function values.
#[no_mangle]
pub extern "C" fn ncquad_default_options() -> CAdaptiveOptions {
    let defaults = AdaptiveOptions::default();
    CAdaptiveOptions {
        rule: CRule::Simpson,
        subdomains_per_dim: defaults.subdomains_per_dim,
        max_refinement_level: defaults.max_refinement_level,
        reuse_old_fvals: defaults.reuse_old_fvals,
        initial_fraction: defaults.initial_fraction,
    }
}

/// Integrates `integrand_func` adaptively with at most `n` evaluations.
///
/// A null `boundaries` selects `[-1, 1]^dim`; a null `options` selects the
/// defaults.
///
/// # Safety
///
/// `boundaries` must be null or point to an array of `dim` `CBoundary`.
/// `options` must be null or point to a valid `CAdaptiveOptions`.
/// `integrand_func` must be safe to call concurrently with `user_data`.
#[no_mangle]
pub unsafe extern "C" fn ncquad_integrate(
    integrand_func: CIntegrand,
    user_data: *mut c_void,
    dim: usize,
    boundaries: *const CBoundary,
    n: usize,
    options: *const CAdaptiveOptions,
) -> CAdaptiveResult {
    let options: AdaptiveOptions = if options.is_null() {
        AdaptiveOptions::default()
    } else {
        (*options).into()
    };
    let bounds = read_boundaries(dim, boundaries);
    let integrand = Parallel(CIntegrandWrapper {
        dim,
        func: integrand_func,
        user_data,
    });

    let result = AdaptiveNewtonCotes::new(options)
        .and_then(|integrator| integrator.integrate(&integrand, n, bounds.as_deref()));
    match result {
        Ok(result) => CAdaptiveResult {
            status: NCQUAD_OK,
            value: result.value,
            n_evals: result.n_evals,
            n_subdomains: result.n_subdomains,
            max_level: result.max_level,
            iterations: result.iterations,
        },
        Err(err) => CAdaptiveResult::failed(&err),
    }
}

/// Integrates `integrand_func` with `rule` on one regular grid of exactly `n`
/// points and stores the estimate in `value`. Use `ncquad_adjust_n` to get a
/// valid `n`.
///
/// Returns a status code.
///
/// # Safety
///
/// `boundaries` must be null or point to an array of `dim` `CBoundary`.
/// `value` must be a valid pointer to a `double`.
/// `integrand_func` must be safe to call concurrently with `user_data`.
#[no_mangle]
pub unsafe extern "C" fn ncquad_fixed_integrate(
    integrand_func: CIntegrand,
    user_data: *mut c_void,
    dim: usize,
    boundaries: *const CBoundary,
    n: usize,
    rule: CRule,
    value: *mut f64,
) -> c_int {
    let bounds = read_boundaries(dim, boundaries);
    let integrand = Parallel(CIntegrandWrapper {
        dim,
        func: integrand_func,
        user_data,
    });

    match fixed::integrate::<f64, _>(rule.into(), &integrand, n, bounds.as_deref()) {
        Ok(result) => {
            *value = result;
            NCQUAD_OK
        }
        Err(err) => status(&err),
    }
}

/// Returns the largest number of points not above `n` that gives a valid
/// `dim`-dimensional grid for `rule`, or zero if there is none.
#[no_mangle]
pub extern "C" fn ncquad_adjust_n(rule: CRule, dim: usize, n: usize) -> usize {
    Rule::from(rule).adjust_n(dim, n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn square(x: *const f64, dim: c_int, _user_data: *mut c_void) -> f64 {
        let x = unsafe { slice::from_raw_parts(x, dim as usize) };
        x.iter().map(|v| v * v).sum()
    }

    #[test]
    fn test_integrate_defaults() {
        let result = unsafe { ncquad_integrate(square, std::ptr::null_mut(), 1, std::ptr::null(), 1000, std::ptr::null()) };
        assert_eq!(result.status, NCQUAD_OK);
        assert!((result.value - 2.0 / 3.0).abs() < 1e-12);
        assert!(result.n_evals <= 1000);
    }

    #[test]
    fn test_integrate_reports_grid_error() {
        let mut options = ncquad_default_options();
        options.rule = CRule::Boole;
        let bounds = [CBoundary { min: 0.0, max: 1.0 }];
        let result = unsafe { ncquad_integrate(square, std::ptr::null_mut(), 1, bounds.as_ptr(), 60, &options) };
        assert_eq!(result.status, NCQUAD_INVALID_GRID_SIZE);
        assert_eq!(result.n_evals, 0);
    }

    #[test]
    fn test_fixed_integrate() {
        let bounds = [CBoundary { min: 0.0, max: 1.0 }, CBoundary { min: 0.0, max: 2.0 }];
        let n = ncquad_adjust_n(CRule::Simpson, 2, 100);
        assert_eq!(n, 81);
        let mut value = 0.0;
        let status = unsafe { ncquad_fixed_integrate(square, std::ptr::null_mut(), 2, bounds.as_ptr(), n, CRule::Simpson, &mut value) };
        assert_eq!(status, NCQUAD_OK);
        // (1/3) * 2 + 1 * (8/3)
        assert!((value - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_domain() {
        let bounds = [CBoundary { min: 1.0, max: 0.0 }];
        let result = unsafe { ncquad_integrate(square, std::ptr::null_mut(), 1, bounds.as_ptr(), 1000, std::ptr::null()) };
        assert_eq!(result.status, NCQUAD_INVALID_DOMAIN);
    }
}
