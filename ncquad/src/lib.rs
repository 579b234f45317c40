//! `ncquad` is a multi-dimensional adaptive Newton-Cotes integration routine.
//!
//! The domain is partitioned into a grid of subdomains, each carrying a
//! regular grid of quadrature points. Subdomains are split repeatedly, with
//! the integrand evaluated in one batch per round, until an evaluation budget
//! is spent. Function values of a parent grid are reused by its children
//! wherever the points coincide.
//!
//! The trapezoid, Simpson, Simpson 3/8 and Boole rules are implemented, see
//! [`rule::Rule`]. A single non-adaptive grid is available in [`fixed`].

pub mod adaptive;
pub mod benchmark;
pub mod config;
pub mod domain;
pub mod error;
pub mod fixed;
pub mod integrand;
pub mod integrator;
pub mod refinement;
pub mod rule;
pub mod subdomain;

mod proptests;

pub use config::AdaptiveOptions;
pub use domain::IntegrationDomain;
pub use error::{QuadError, QuadResult};
pub use integrator::{integrate, AdaptiveNewtonCotes, AdaptiveResult};
pub use rule::Rule;
