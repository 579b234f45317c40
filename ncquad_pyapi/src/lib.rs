//! Generate `PyO3` interface for `ncquad`

use pyo3::prelude::*;

/// Python bindings for the adaptive and fixed-grid integrators.
pub mod adaptive;

/// `PyO3` Python module that contains all exposed classes from Rust.
#[pymodule]
fn ncquad(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("version", env!("CARGO_PKG_VERSION"))?;
    adaptive::register(m)?;
    Ok(())
}
