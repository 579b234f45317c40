//! Adaptive Newton-Cotes interface.

use std::sync::Mutex;

use num_complex::Complex64;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyList;

use ncquad::integrand::BatchIntegrand;
use ncquad::integrator::AdaptiveResult;
use ncquad::{fixed, AdaptiveNewtonCotes, AdaptiveOptions, QuadError, Rule};

fn to_py_err(err: QuadError) -> PyErr {
    if err.is_input_error() {
        PyValueError::new_err(err.to_string())
    } else {
        PyRuntimeError::new_err(err.to_string())
    }
}

fn parse_rule(name: &str) -> PyResult<Rule> {
    Rule::ALL
        .into_iter()
        .find(|rule| rule.name() == name.to_lowercase())
        .ok_or_else(|| {
            PyValueError::new_err(format!(
                "unknown rule '{name}', expected one of trapezoid, simpson, simpson38, boole"
            ))
        })
}

// A batched Python callable: it receives a list of `dim`-element points and
// returns one float (or complex) per point.
struct PyBatchIntegrand {
    callable: PyObject,
    dim: usize,
    error: Mutex<Option<PyErr>>,
}

impl PyBatchIntegrand {
    fn new(py: Python, callable: PyObject, dim: usize) -> PyResult<Self> {
        if !callable.bind(py).is_callable() {
            return Err(PyValueError::new_err("integrand must be callable"));
        }
        Ok(PyBatchIntegrand {
            callable,
            dim,
            error: Mutex::new(None),
        })
    }

    fn call<T>(&self, points: &[f64]) -> Vec<T>
    where
        T: for<'py> FromPyObject<'py>,
    {
        Python::with_gil(|py| {
            let batch = PyList::new_bound(
                py,
                points.chunks_exact(self.dim).map(|x| PyList::new_bound(py, x)),
            );
            match self
                .callable
                .call1(py, (batch,))
                .and_then(|result| result.extract::<Vec<T>>(py))
            {
                Ok(values) => values,
                Err(err) => {
                    // The integrator reports the length mismatch; the Python
                    // error is raised in its place.
                    if let Ok(mut slot) = self.error.lock() {
                        slot.get_or_insert(err);
                    }
                    Vec::new()
                }
            }
        })
    }

    fn finish<T>(&self, result: Result<T, QuadError>) -> PyResult<T> {
        let pending = self.error.lock().ok().and_then(|mut slot| slot.take());
        match (result, pending) {
            (_, Some(err)) => Err(err),
            (result, None) => result.map_err(to_py_err),
        }
    }
}

impl BatchIntegrand<f64> for PyBatchIntegrand {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval_batch(&self, points: &[f64]) -> Vec<f64> {
        self.call(points)
    }
}

impl BatchIntegrand<Complex64> for PyBatchIntegrand {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval_batch(&self, points: &[f64]) -> Vec<Complex64> {
        self.call(points)
    }
}

#[pyclass(name = "AdaptiveResult")]
#[derive(Debug, Clone, Copy)]
struct PyAdaptiveResult {
    value: Complex64,
    complex: bool,
    #[pyo3(get)]
    n_evals: usize,
    #[pyo3(get)]
    n_subdomains: usize,
    #[pyo3(get)]
    max_level: usize,
    #[pyo3(get)]
    iterations: usize,
}

impl PyAdaptiveResult {
    fn new(result: AdaptiveResult<Complex64>, complex: bool) -> Self {
        PyAdaptiveResult {
            value: result.value,
            complex,
            n_evals: result.n_evals,
            n_subdomains: result.n_subdomains,
            max_level: result.max_level,
            iterations: result.iterations,
        }
    }
}

#[pymethods]
impl PyAdaptiveResult {
    #[getter]
    fn value(&self, py: Python) -> PyObject {
        if self.complex {
            self.value.into_py(py)
        } else {
            self.value.re.into_py(py)
        }
    }

    fn __repr__(&self) -> String {
        let value = if self.complex {
            format!("{:.6e}{:+.6e}j", self.value.re, self.value.im)
        } else {
            format!("{:.6e}", self.value.re)
        };
        format!(
            "AdaptiveResult(value={value}, n_evals={}, n_subdomains={}, max_level={}, iterations={})",
            self.n_evals, self.n_subdomains, self.max_level, self.iterations
        )
    }
}

/// Integrates `fn` over `integration_domain` with at most `N` evaluations on
/// an adaptively refined Newton-Cotes grid.
#[pyfunction]
#[pyo3(signature = (
    fn_,
    dim,
    N,
    rule = "simpson",
    subdomains_per_dim = 2,
    max_refinement_level = 4,
    integration_domain = None,
    complex_function = false,
    reuse_old_fvals = true,
))]
#[allow(non_snake_case, clippy::too_many_arguments)]
fn integrate(
    py: Python,
    fn_: PyObject,
    dim: usize,
    N: usize,
    rule: &str,
    subdomains_per_dim: usize,
    max_refinement_level: usize,
    integration_domain: Option<Vec<(f64, f64)>>,
    complex_function: bool,
    reuse_old_fvals: bool,
) -> PyResult<PyAdaptiveResult> {
    let options = AdaptiveOptions::new(parse_rule(rule)?)
        .with_subdomains_per_dim(subdomains_per_dim)
        .with_max_refinement_level(max_refinement_level)
        .with_reuse_old_fvals(reuse_old_fvals);
    let integrator = AdaptiveNewtonCotes::new(options).map_err(to_py_err)?;
    let integrand = PyBatchIntegrand::new(py, fn_, dim)?;
    let domain = integration_domain.as_deref();

    let result = py.allow_threads(|| {
        if complex_function {
            integrator.integrate::<Complex64, _>(&integrand, N, domain)
        } else {
            integrator.integrate::<f64, _>(&integrand, N, domain).map(|r| AdaptiveResult {
                value: Complex64::new(r.value, 0.0),
                n_evals: r.n_evals,
                n_subdomains: r.n_subdomains,
                max_level: r.max_level,
                iterations: r.iterations,
            })
        }
    });
    let result = integrand.finish(result)?;
    Ok(PyAdaptiveResult::new(result, complex_function))
}

/// Integrates `fn` with `rule` on one regular grid of exactly `N` points;
/// see `adjust_n`.
#[pyfunction]
#[pyo3(signature = (fn_, dim, N, rule = "simpson", integration_domain = None, complex_function = false))]
#[allow(non_snake_case)]
fn fixed_integrate(
    py: Python,
    fn_: PyObject,
    dim: usize,
    N: usize,
    rule: &str,
    integration_domain: Option<Vec<(f64, f64)>>,
    complex_function: bool,
) -> PyResult<PyObject> {
    let rule = parse_rule(rule)?;
    let integrand = PyBatchIntegrand::new(py, fn_, dim)?;
    let domain = integration_domain.as_deref();

    if complex_function {
        let result = py.allow_threads(|| fixed::integrate::<Complex64, _>(rule, &integrand, N, domain));
        Ok(integrand.finish(result)?.into_py(py))
    } else {
        let result = py.allow_threads(|| fixed::integrate::<f64, _>(rule, &integrand, N, domain));
        Ok(integrand.finish(result)?.into_py(py))
    }
}

/// Largest valid total number of grid points not above `N`.
#[pyfunction]
#[allow(non_snake_case)]
fn adjust_n(rule: &str, dim: usize, N: usize) -> PyResult<usize> {
    parse_rule(rule)?.adjust_n(dim, N).map_err(to_py_err)
}

/// Registers the `adaptive` submodule with the parent module.
pub fn register(parent_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let m = PyModule::new_bound(parent_module.py(), "adaptive")?;
    m.setattr(pyo3::intern!(m.py(), "__doc__"), "Interface to adaptive Newton-Cotes integration")?;
    pyo3::py_run!(
        parent_module.py(),
        m,
        "import sys; sys.modules['ncquad.adaptive'] = m"
    );
    m.add_class::<PyAdaptiveResult>()?;
    m.add_function(wrap_pyfunction!(integrate, &m)?)?;
    m.add_function(wrap_pyfunction!(fixed_integrate, &m)?)?;
    m.add_function(wrap_pyfunction!(adjust_n, &m)?)?;
    parent_module.add_submodule(&m)
}
