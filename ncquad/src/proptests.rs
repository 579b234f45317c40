//! Property-based tests of the adaptive refinement loop.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::adaptive::AdaptiveGrid;
    use crate::config::AdaptiveOptions;
    use crate::domain::IntegrationDomain;
    use crate::refinement::Refinement;
    use crate::rule::Rule;

    fn rule() -> impl Strategy<Value = Rule> {
        prop_oneof![
            Just(Rule::Trapezoid),
            Just(Rule::Simpson),
            Just(Rule::Simpson38),
            Just(Rule::Boole),
        ]
    }

    fn refinement() -> impl Strategy<Value = Refinement> {
        prop_oneof![
            Just(Refinement::Uniform),
            (0.0f64..=1.0).prop_map(|threshold| Refinement::ErrorDriven { threshold }),
        ]
    }

    fn bounds(dim: usize) -> impl Strategy<Value = Vec<(f64, f64)>> {
        prop::collection::vec((-2.0f64..2.0, 0.1f64..3.0), dim)
            .prop_map(|b| b.into_iter().map(|(low, width)| (low, low + width)).collect())
    }

    fn setup() -> impl Strategy<Value = (Vec<(f64, f64)>, AdaptiveOptions, usize)> {
        (1usize..=3)
            .prop_flat_map(|dim| {
                (
                    bounds(dim),
                    rule(),
                    2usize..=3,
                    0usize..=4,
                    any::<bool>(),
                    refinement(),
                    500usize..20_000,
                )
            })
            .prop_map(|(bounds, rule, s, level, reuse, refinement, n)| {
                let options = AdaptiveOptions::new(rule)
                    .with_subdomains_per_dim(s)
                    .with_max_refinement_level(level)
                    .with_reuse_old_fvals(reuse)
                    .with_refinement(refinement);
                (bounds, options, n)
            })
    }

    fn integrand(x: &[f64]) -> f64 {
        x.iter().map(|v| (2.0 * v).sin() + v * v).product()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn refinement_loop_invariants((bounds, options, n) in setup()) {
            let domain = IntegrationDomain::new(&bounds).unwrap();
            let grid = AdaptiveGrid::<f64>::new(&domain, &options, n);
            prop_assume!(grid.is_ok());
            let mut grid = grid.unwrap();
            let dim = domain.dim();
            let mut n_passed = 0;

            loop {
                let batch = grid.get_next_eval_points().unwrap();
                let values: Vec<f64> = batch.points.chunks_exact(dim).map(integrand).collect();
                n_passed += values.len();
                grid.set_fvals(&values, &batch.chunksizes).unwrap();
                grid.compute_integrals().unwrap();

                prop_assert!(n_passed <= n);
                prop_assert_eq!(grid.evals_spent(), n_passed);
                prop_assert!((grid.covered_volume() - domain.volume()).abs() <= 1e-9 * domain.volume());
                prop_assert!(grid.subdomains().all(|s| s.level() <= options.max_refinement_level));
                prop_assert!(grid.get_integral().is_ok());

                if grid.evals_spent() >= n || grid.refine(&options.refinement).unwrap() == 0 {
                    break;
                }
            }
        }

        #[test]
        fn reuse_saves_evaluations_on_split((bounds, options, n) in setup()) {
            let domain = IntegrationDomain::new(&bounds).unwrap();
            let grid = AdaptiveGrid::<f64>::new(&domain, &options, n);
            prop_assume!(grid.is_ok());
            let mut grid = grid.unwrap();
            let batch = grid.get_next_eval_points().unwrap();
            let values: Vec<f64> = batch.points.chunks_exact(domain.dim()).map(integrand).collect();
            grid.set_fvals(&values, &batch.chunksizes).unwrap();

            let s = options.subdomains_per_dim;
            for leaf in grid.subdomains() {
                prop_assert!(leaf.split_cost(s, true) < leaf.split_cost(s, false));
            }
        }
    }
}
