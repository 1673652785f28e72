//! Benchmarks for the kernel engine and the gradient estimator.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::DMatrix;
use orthodr_core::{
    error::ObjectiveResult, gradient::GradientEstimator, kernel::GaussianKernel,
    objective::ObjectiveOracle, parallel::Executor,
};

#[derive(Debug)]
struct KernelMass {
    x: DMatrix<f64>,
}

impl ObjectiveOracle for KernelMass {
    fn name(&self) -> &str {
        "kernel mass"
    }

    fn dimension(&self) -> usize {
        self.x.ncols()
    }

    fn value(&self, b: &DMatrix<f64>, exec: &Executor) -> ObjectiveResult<f64> {
        let bx = &self.x * b;
        Ok(GaussianKernel::new().matrix(&bx, exec).sum())
    }
}

fn points(n: usize, d: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, d, |i, j| ((i * 7 + j * 13) % 17) as f64 / 17.0)
}

fn bench_kernel_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_matrix");
    let pooled = Executor::with_threads(0).unwrap();

    for &n in &[100, 400, 1000] {
        let pts = points(n, 2);
        group.bench_with_input(BenchmarkId::new("serial", n), &n, |b, _| {
            b.iter(|| black_box(GaussianKernel::new().matrix(&pts, &Executor::serial())));
        });
        group.bench_with_input(BenchmarkId::new("pooled", n), &n, |b, _| {
            b.iter(|| black_box(GaussianKernel::new().matrix(&pts, &pooled)));
        });
    }

    group.finish();
}

fn bench_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("finite_difference_gradient");
    let pooled = Executor::with_threads(0).unwrap();

    for &p in &[4, 8] {
        let oracle = KernelMass { x: points(200, p) };
        let b = DMatrix::from_fn(p, 2, |i, j| if i == j { 1.0 } else { 0.0 });
        let f0 = oracle.value(&b, &Executor::serial()).unwrap();
        let estimator = GradientEstimator::new(1e-6);

        group.bench_with_input(BenchmarkId::new("serial", p), &p, |bench, _| {
            bench.iter(|| black_box(estimator.estimate(&oracle, &b, f0, &Executor::serial())));
        });
        group.bench_with_input(BenchmarkId::new("pooled", p), &p, |bench, _| {
            bench.iter(|| black_box(estimator.estimate(&oracle, &b, f0, &pooled)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kernel_matrix, bench_gradient);
criterion_main!(benches);
