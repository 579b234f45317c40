//! Integrands with closed-form integrals, shared by tests and benchmarks.

pub mod integrands;
