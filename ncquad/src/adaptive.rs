//! The adaptive grid: a hierarchy of subdomains refined under a fixed
//! evaluation budget.
//!
//! Subdomains live in a flat arena. Splitting a subdomain appends its
//! children to the arena and replaces it in the ordered list of leaves; the
//! leaves always tile the integration domain without gaps or overlaps.

use tracing::{debug, error, trace, warn};

use crate::config::AdaptiveOptions;
use crate::domain::IntegrationDomain;
use crate::error::{QuadError, QuadResult};
use crate::integrand::Scalar;
use crate::refinement::RefinementStrategy;
use crate::rule::{points_per_dim, Rule};
use crate::subdomain::Subdomain;

/// An arena slot: a subdomain and its place in the hierarchy.
#[derive(Debug, Clone)]
struct Node<T> {
    subdomain: Subdomain<T>,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// The points of one evaluation round, with the number of points that
/// belongs to every leaf (zero for leaves that need nothing).
#[derive(Debug, Clone, Default)]
pub struct EvalBatch {
    /// Flat row-major coordinates, `chunksizes.iter().sum() * dim` values.
    pub points: Vec<f64>,
    /// One entry per leaf, in leaf order.
    pub chunksizes: Vec<usize>,
}

impl EvalBatch {
    /// Number of points in the batch.
    pub fn n_points(&self) -> usize {
        self.chunksizes.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Owns the subdomain hierarchy and the evaluation budget.
#[derive(Debug, Clone)]
pub struct AdaptiveGrid<'a, T> {
    domain: &'a IntegrationDomain,
    rule: Rule,
    subdomains_per_dim: usize,
    max_refinement_level: usize,
    reuse_old_fvals: bool,
    total_budget: usize,
    evals_spent: usize,
    nodes: Vec<Node<T>>,
    leaves: Vec<usize>,
}

impl<'a, T: Scalar> AdaptiveGrid<'a, T> {
    /// Creates the grid and its initial `subdomains_per_dim^dim` partition.
    ///
    /// The initial grid spends at most `initial_fraction * total_budget`
    /// evaluations: that share is divided evenly among the initial
    /// subdomains, and each one gets the largest rule-compliant number of
    /// points per dimension its share pays for.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a bad fan-out or budget and
    /// `InvalidGridSize` if the share of a subdomain is too small for the
    /// rule's minimal grid.
    pub fn new(domain: &'a IntegrationDomain, options: &AdaptiveOptions, total_budget: usize) -> QuadResult<Self> {
        options.validate().map_err(|e| QuadError::parameter("options", e.to_string()))?;
        let dim = domain.dim();
        let n_initial = options
            .subdomains_per_dim
            .checked_pow(dim as u32)
            .filter(|&n| n <= total_budget)
            .ok_or_else(|| {
                QuadError::parameter(
                    "subdomains_per_dim",
                    format!(
                        "{}^{dim} initial subdomains exceed the budget of {total_budget} evaluations",
                        options.subdomains_per_dim
                    ),
                )
            })?;

        let initial_n = (total_budget as f64 * options.initial_fraction) as usize;
        let n_per_dim = options
            .rule
            .adjust_points_per_dim(points_per_dim(dim, initial_n / n_initial))?;

        let mut grid = AdaptiveGrid {
            domain,
            rule: options.rule,
            subdomains_per_dim: options.subdomains_per_dim,
            max_refinement_level: options.max_refinement_level,
            reuse_old_fvals: options.reuse_old_fvals,
            total_budget,
            evals_spent: 0,
            nodes: Vec::new(),
            leaves: Vec::new(),
        };
        grid.initialize(n_per_dim)?;
        Ok(grid)
    }

    /// Partitions the domain into equal level-0 subdomains.
    fn initialize(&mut self, n_per_dim: usize) -> QuadResult<()> {
        // Splitting one box spanning the whole domain gives exactly the
        // initial partition; the box itself is not kept.
        let root = Subdomain::new(self.rule, self.domain.bounds().to_vec(), n_per_dim, 0)?;
        let children = root.split(self.rule, self.subdomains_per_dim, false)?;
        for mut child in children {
            child.set_level(0);
            let id = self.push_node(child, None);
            self.leaves.push(id);
        }
        debug!(
            n_subdomains = self.leaves.len(),
            n_per_dim,
            "initialized adaptive grid"
        );
        Ok(())
    }

    fn push_node(&mut self, subdomain: Subdomain<T>, parent: Option<usize>) -> usize {
        self.nodes.push(Node {
            subdomain,
            parent,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    pub fn domain(&self) -> &IntegrationDomain {
        self.domain
    }

    /// Maximum number of function evaluations.
    pub fn total_budget(&self) -> usize {
        self.total_budget
    }

    /// Function evaluations consumed so far.
    pub fn evals_spent(&self) -> usize {
        self.evals_spent
    }

    pub fn remaining_budget(&self) -> usize {
        self.total_budget - self.evals_spent
    }

    pub fn max_refinement_level(&self) -> usize {
        self.max_refinement_level
    }

    /// The current leaf subdomains, in leaf order.
    pub fn subdomains(&self) -> impl Iterator<Item = &Subdomain<T>> + '_ {
        self.leaves.iter().map(move |&id| &self.nodes[id].subdomain)
    }

    pub fn n_subdomains(&self) -> usize {
        self.leaves.len()
    }

    /// Deepest refinement level among the leaves.
    pub fn max_level(&self) -> usize {
        self.subdomains().map(Subdomain::level).max().unwrap_or(0)
    }

    /// Total number of subdomains ever created, including replaced ones.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Arena id of the parent of node `id`.
    pub fn parent(&self, id: usize) -> Option<usize> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Arena ids of the children of node `id`.
    pub fn children(&self, id: usize) -> &[usize] {
        self.nodes.get(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Arena ids of the current leaves.
    pub fn leaf_ids(&self) -> &[usize] {
        &self.leaves
    }

    /// Sum of the leaf volumes; equals the domain volume up to rounding.
    pub fn covered_volume(&self) -> f64 {
        self.subdomains().map(Subdomain::volume).sum()
    }

    /// Collects the points every leaf still needs into one batch.
    ///
    /// # Errors
    ///
    /// Returns `BudgetExhaustedPrematurely` if the batch would push the
    /// evaluation count past the budget. Refinement never schedules more
    /// evaluations than remain, so this indicates a bookkeeping defect.
    pub fn get_next_eval_points(&self) -> QuadResult<EvalBatch> {
        let chunksizes: Vec<usize> = self.subdomains().map(Subdomain::n_missing).collect();
        let requested: usize = chunksizes.iter().sum();
        if requested > self.remaining_budget() {
            error!(requested, remaining = self.remaining_budget(), "evaluation budget overrun");
            return Err(QuadError::BudgetExhaustedPrematurely {
                requested,
                remaining: self.remaining_budget(),
                budget: self.total_budget,
            });
        }

        let mut points = Vec::with_capacity(requested * self.domain.dim());
        for subdomain in self.subdomains().filter(|s| s.n_missing() > 0) {
            points.extend(subdomain.pending_points());
        }
        Ok(EvalBatch { points, chunksizes })
    }

    /// Scatters a batch of function values back to the leaves that asked
    /// for them.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationMismatch` if `values` or `chunksizes` do not match
    /// the batch issued by [`get_next_eval_points`], and
    /// `BudgetExhaustedPrematurely` if `values` exceed the remaining budget.
    /// No leaf is modified when an error is returned.
    ///
    /// [`get_next_eval_points`]: AdaptiveGrid::get_next_eval_points
    pub fn set_fvals(&mut self, values: &[T], chunksizes: &[usize]) -> QuadResult<()> {
        let expected: usize = chunksizes.iter().sum();
        if chunksizes.len() != self.leaves.len() || values.len() != expected {
            return Err(QuadError::EvaluationMismatch {
                expected,
                got: values.len(),
            });
        }
        // Nothing is written unless every chunk matches its leaf.
        for (position, (subdomain, &size)) in self.subdomains().zip(chunksizes).enumerate() {
            if size != subdomain.n_missing() {
                debug!(position, size, n_missing = subdomain.n_missing(), "chunk does not match leaf");
                return Err(QuadError::EvaluationMismatch {
                    expected: subdomain.n_missing(),
                    got: size,
                });
            }
        }
        if values.len() > self.remaining_budget() {
            error!(requested = values.len(), remaining = self.remaining_budget(), "evaluation budget overrun");
            return Err(QuadError::BudgetExhaustedPrematurely {
                requested: values.len(),
                remaining: self.remaining_budget(),
                budget: self.total_budget,
            });
        }

        let n_non_finite = values.iter().filter(|v| !v.is_finite()).count();
        if n_non_finite > 0 {
            warn!(n_non_finite, "integrand returned non-finite values");
        }

        let mut offset = 0;
        for (&id, &size) in self.leaves.iter().zip(chunksizes) {
            if size == 0 {
                continue;
            }
            self.nodes[id]
                .subdomain
                .ingest_values(&values[offset..offset + size])?;
            offset += size;
        }
        self.evals_spent += values.len();
        Ok(())
    }

    /// Recomputes the estimate of every stale leaf and returns how many were
    /// recomputed.
    pub fn compute_integrals(&mut self) -> QuadResult<usize> {
        let mut n_computed = 0;
        for &id in &self.leaves {
            let subdomain = &mut self.nodes[id].subdomain;
            if !subdomain.requires_integral_value() {
                trace!(id, "skipping up-to-date subdomain");
                continue;
            }
            let value = subdomain.compute_integral(self.rule)?;
            trace!(id, level = subdomain.level(), ?value, "computed subdomain integral");
            n_computed += 1;
        }
        Ok(n_computed)
    }

    /// Splits the leaves proposed by `strategy` and returns how many were
    /// split.
    ///
    /// A proposed leaf is skipped if it already sits at the level cap or if
    /// its children would request more evaluations than remain once earlier
    /// splits of this pass are paid for.
    pub fn refine<S: RefinementStrategy>(&mut self, strategy: &S) -> QuadResult<usize> {
        let proposed = {
            let leaves: Vec<&Subdomain<T>> = self.subdomains().collect();
            strategy.propose(&leaves)
        };

        let mut reserved = 0;
        let mut replacements: Vec<Option<Vec<usize>>> = vec![None; self.leaves.len()];
        for position in proposed {
            let Some(&id) = self.leaves.get(position) else {
                continue;
            };
            if replacements[position].is_some() {
                continue;
            }
            let subdomain = &self.nodes[id].subdomain;
            if subdomain.level() >= self.max_refinement_level {
                continue;
            }
            let cost = subdomain.split_cost(self.subdomains_per_dim, self.reuse_old_fvals);
            if reserved + cost > self.remaining_budget() {
                trace!(id, cost, "split does not fit into remaining budget");
                continue;
            }

            let children = subdomain.split(self.rule, self.subdomains_per_dim, self.reuse_old_fvals)?;
            reserved += cost;
            let child_ids: Vec<usize> = children
                .into_iter()
                .map(|child| self.push_node(child, Some(id)))
                .collect();
            self.nodes[id].children = child_ids.clone();
            self.nodes[id].subdomain.release_values();
            replacements[position] = Some(child_ids);
        }

        let n_split = replacements.iter().filter(|r| r.is_some()).count();
        if n_split > 0 {
            self.leaves = self
                .leaves
                .iter()
                .zip(replacements)
                .flat_map(|(&id, replacement)| replacement.unwrap_or_else(|| vec![id]))
                .collect();
        }
        debug!(
            n_split,
            reserved,
            n_subdomains = self.leaves.len(),
            "refined adaptive grid"
        );
        Ok(n_split)
    }

    /// Sum of the leaf estimates.
    ///
    /// # Errors
    ///
    /// Returns `IntegralNotReady` if any leaf is stale.
    pub fn get_integral(&self) -> QuadResult<T> {
        let mut total = T::zero();
        for (position, subdomain) in self.subdomains().enumerate() {
            if subdomain.requires_integral_value() {
                error!(position, "integral requested while a subdomain is stale");
                return Err(QuadError::IntegralNotReady {
                    what: format!("leaf subdomain {position} has no up-to-date estimate"),
                });
            }
            total += subdomain.integral_value();
        }
        Ok(total)
    }
}
