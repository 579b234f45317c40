//! Options of the adaptive integrator, loadable from YAML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QuadError, QuadResult};
use crate::refinement::Refinement;
use crate::rule::Rule;

/// Options of the adaptive Newton-Cotes integrator.
///
/// Every field has a default, so a YAML document only needs the fields it
/// changes:
///
/// ```
/// use ncquad::config::AdaptiveOptions;
/// use ncquad::rule::Rule;
///
/// let options = AdaptiveOptions::from_yaml("rule: boole\nmax_refinement_level: 2").unwrap();
/// assert_eq!(options.rule, Rule::Boole);
/// assert_eq!(options.subdomains_per_dim, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdaptiveOptions {
    /// The Newton-Cotes rule applied on every subdomain grid.
    pub rule: Rule,
    /// Fan-out per dimension of the initial partition and of every split.
    pub subdomains_per_dim: usize,
    /// Deepest level a subdomain may be split to.
    pub max_refinement_level: usize,
    /// Reuse cached values at grid points a child shares with its parent.
    pub reuse_old_fvals: bool,
    /// Share of the evaluation budget spent on the initial grid.
    pub initial_fraction: f64,
    /// Which leaves to split in each refinement pass.
    pub refinement: Refinement,
}

impl Default for AdaptiveOptions {
    fn default() -> Self {
        AdaptiveOptions {
            rule: Rule::Simpson,
            subdomains_per_dim: 2,
            max_refinement_level: 4,
            reuse_old_fvals: true,
            initial_fraction: 0.1,
            refinement: Refinement::Uniform,
        }
    }
}

impl AdaptiveOptions {
    /// Default options for `rule`.
    #[must_use]
    pub fn new(rule: Rule) -> Self {
        AdaptiveOptions {
            rule,
            ..Self::default()
        }
    }

    /// Load options from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the YAML does not parse,
    /// or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> QuadResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse options from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> QuadResult<Self> {
        let options: Self = serde_yaml::from_str(yaml)?;
        options.validate()?;
        Ok(options)
    }

    /// Serialize the options to YAML.
    pub fn to_yaml(&self) -> QuadResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check the constraints serde cannot express.
    pub fn validate(&self) -> QuadResult<()> {
        if self.subdomains_per_dim < 2 {
            return Err(QuadError::Config(format!(
                "subdomains_per_dim must be at least 2, got {}",
                self.subdomains_per_dim
            )));
        }
        if !(self.initial_fraction > 0.0 && self.initial_fraction <= 1.0) {
            return Err(QuadError::Config(format!(
                "initial_fraction must lie in (0, 1], got {}",
                self.initial_fraction
            )));
        }
        if let Refinement::ErrorDriven { threshold } = self.refinement {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(QuadError::Config(format!(
                    "error_driven threshold must lie in [0, 1], got {threshold}"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = rule;
        self
    }

    #[must_use]
    pub fn with_subdomains_per_dim(mut self, subdomains_per_dim: usize) -> Self {
        self.subdomains_per_dim = subdomains_per_dim;
        self
    }

    #[must_use]
    pub fn with_max_refinement_level(mut self, max_refinement_level: usize) -> Self {
        self.max_refinement_level = max_refinement_level;
        self
    }

    #[must_use]
    pub fn with_reuse_old_fvals(mut self, reuse_old_fvals: bool) -> Self {
        self.reuse_old_fvals = reuse_old_fvals;
        self
    }

    #[must_use]
    pub fn with_initial_fraction(mut self, initial_fraction: f64) -> Self {
        self.initial_fraction = initial_fraction;
        self
    }

    #[must_use]
    pub fn with_refinement(mut self, refinement: Refinement) -> Self {
        self.refinement = refinement;
        self
    }
}
