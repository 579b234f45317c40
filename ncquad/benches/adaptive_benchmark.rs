use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ncquad::benchmark::integrands::{unit_domain, GenzGaussian, GenzOscillatory};
use ncquad::fixed;
use ncquad::integrand::{Parallel, Simd};
use ncquad::refinement::Refinement;
use ncquad::{AdaptiveNewtonCotes, AdaptiveOptions, Rule};

fn adaptive_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Adaptive 2D Gaussian");
    let domain2d = unit_domain(2);
    let gauss = GenzGaussian::new(2);
    let n_eval2d = 100_000;

    for rule in Rule::ALL {
        let integrator = AdaptiveNewtonCotes::new(AdaptiveOptions::new(rule)).unwrap();
        group.bench_with_input(BenchmarkId::new("Scalar (Rayon)", rule), &rule, |b, _| {
            b.iter(|| {
                integrator
                    .integrate(black_box(&Parallel(gauss.clone())), n_eval2d, Some(&domain2d))
                    .unwrap()
            })
        });
        group.bench_with_input(BenchmarkId::new("SIMD", rule), &rule, |b, _| {
            b.iter(|| {
                integrator
                    .integrate(black_box(&Simd(gauss.clone())), n_eval2d, Some(&domain2d))
                    .unwrap()
            })
        });
    }
    group.finish();

    let mut group2 = c.benchmark_group("Adaptive 3D Oscillatory");
    let domain3d = unit_domain(3);
    let osc = GenzOscillatory::new(3);
    let n_eval3d = 200_000;

    for (name, refinement) in [
        ("uniform", Refinement::Uniform),
        ("error_driven", Refinement::ErrorDriven { threshold: 0.1 }),
    ] {
        let options = AdaptiveOptions::new(Rule::Boole)
            .with_max_refinement_level(6)
            .with_refinement(refinement);
        let integrator = AdaptiveNewtonCotes::new(options).unwrap();
        group2.bench_function(name, |b| {
            b.iter(|| {
                integrator
                    .integrate(black_box(&Simd(osc.clone())), n_eval3d, Some(&domain3d))
                    .unwrap()
            })
        });
    }
    group2.finish();

    let mut group3 = c.benchmark_group("Fixed 3D Oscillatory");
    let n_fixed = Rule::Boole.adjust_n(3, n_eval3d).unwrap();
    group3.bench_function("Boole", |b| {
        b.iter(|| {
            fixed::integrate::<f64, _>(Rule::Boole, black_box(&Simd(osc.clone())), n_fixed, Some(&domain3d))
                .unwrap()
        })
    });
    group3.finish();
}

criterion_group!(benches, adaptive_benchmark);
criterion_main!(benches);
