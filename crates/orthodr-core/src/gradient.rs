//! Finite-difference gradients of an objective.
//!
//! Every entry of the P x ndr gradient is estimated independently by
//! perturbing a single entry of a private copy of B. With a pooled executor
//! the entries are spread over the workers; each worker clones B once and
//! restores every entry after use, and the objective is always evaluated
//! with the serial executor so no nested parallel region is opened. The
//! result does not depend on the number of workers.

use crate::{
    config::{FiniteDifference, SolverConfig},
    error::ObjectiveResult,
    objective::ObjectiveOracle,
    parallel::Executor,
    types::DMatrix,
};
use rayon::prelude::*;

/// Numerical gradient estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientEstimator {
    epsilon: f64,
    scheme: FiniteDifference,
}

impl GradientEstimator {
    /// Forward differences with perturbation `epsilon`.
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            scheme: FiniteDifference::Forward,
        }
    }

    /// Estimator configured from a solver configuration.
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            epsilon: config.epsilon,
            scheme: config.finite_difference,
        }
    }

    /// Selects the finite-difference scheme.
    pub fn with_scheme(mut self, scheme: FiniteDifference) -> Self {
        self.scheme = scheme;
        self
    }

    /// Perturbation size.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Finite-difference scheme.
    pub fn scheme(&self) -> FiniteDifference {
        self.scheme
    }

    /// Gradient of `oracle` at `b`, where `f0` is the objective value at `b`.
    ///
    /// Objectives with a closed-form gradient bypass finite differences.
    pub fn estimate<O>(
        &self,
        oracle: &O,
        b: &DMatrix<f64>,
        f0: f64,
        exec: &Executor,
    ) -> ObjectiveResult<DMatrix<f64>>
    where
        O: ObjectiveOracle + ?Sized,
    {
        if let Some(gradient) = oracle.analytic_gradient(b) {
            return gradient;
        }

        let (p, ndr) = b.shape();
        let entries: Vec<f64> = if exec.is_parallel() {
            exec.install(|| {
                (0..p * ndr)
                    .into_par_iter()
                    .map_init(|| b.clone(), |local, idx| self.partial(oracle, local, idx, f0))
                    .collect::<ObjectiveResult<Vec<f64>>>()
            })?
        } else {
            let mut local = b.clone();
            (0..p * ndr)
                .map(|idx| self.partial(oracle, &mut local, idx, f0))
                .collect::<ObjectiveResult<Vec<f64>>>()?
        };

        Ok(DMatrix::from_vec(p, ndr, entries))
    }

    // `idx` is the column-major linear index, matching `DMatrix::from_vec`.
    fn partial<O>(
        &self,
        oracle: &O,
        local: &mut DMatrix<f64>,
        idx: usize,
        f0: f64,
    ) -> ObjectiveResult<f64>
    where
        O: ObjectiveOracle + ?Sized,
    {
        let serial = Executor::serial();
        let original = local[idx];
        let eps = self.epsilon;

        local[idx] = original + eps;
        let plus = oracle.value(local, &serial);

        let estimate = match self.scheme {
            FiniteDifference::Forward => plus.map(|f| (f - f0) / eps),
            FiniteDifference::Central => {
                local[idx] = original - eps;
                let minus = oracle.value(local, &serial);
                plus.and_then(|fp| minus.map(|fm| (fp - fm) / (2.0 * eps)))
            }
        };

        local[idx] = original;
        estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// f(B) = sum_ij c_ij * B_ij^2
    #[derive(Debug)]
    struct WeightedSquares {
        weights: DMatrix<f64>,
    }

    impl ObjectiveOracle for WeightedSquares {
        fn name(&self) -> &str {
            "weighted squares"
        }

        fn dimension(&self) -> usize {
            self.weights.nrows()
        }

        fn value(&self, b: &DMatrix<f64>, _exec: &Executor) -> ObjectiveResult<f64> {
            Ok(self.weights.component_mul(&b.component_mul(b)).sum())
        }
    }

    #[derive(Debug)]
    struct WithClosedForm;

    impl ObjectiveOracle for WithClosedForm {
        fn name(&self) -> &str {
            "closed form"
        }

        fn dimension(&self) -> usize {
            2
        }

        fn value(&self, _b: &DMatrix<f64>, _exec: &Executor) -> ObjectiveResult<f64> {
            Ok(0.0)
        }

        fn analytic_gradient(&self, b: &DMatrix<f64>) -> Option<ObjectiveResult<DMatrix<f64>>> {
            Some(Ok(b * 3.0))
        }
    }

    fn fixture() -> (WeightedSquares, DMatrix<f64>) {
        let weights = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = DMatrix::from_row_slice(3, 2, &[0.5, -0.1, 0.2, 0.7, -0.3, 0.4]);
        (WeightedSquares { weights }, b)
    }

    #[test]
    fn test_forward_difference() {
        let (oracle, b) = fixture();
        let exec = Executor::serial();
        let f0 = oracle.value(&b, &exec).unwrap();
        let g = GradientEstimator::new(1e-7)
            .estimate(&oracle, &b, f0, &exec)
            .unwrap();
        let exact = 2.0 * oracle.weights.component_mul(&b);
        assert_relative_eq!(g, exact, epsilon = 1e-5);
    }

    #[test]
    fn test_central_difference_is_exact_for_quadratics() {
        let (oracle, b) = fixture();
        let exec = Executor::serial();
        let f0 = oracle.value(&b, &exec).unwrap();
        let g = GradientEstimator::new(1e-4)
            .with_scheme(FiniteDifference::Central)
            .estimate(&oracle, &b, f0, &exec)
            .unwrap();
        let exact = 2.0 * oracle.weights.component_mul(&b);
        assert_relative_eq!(g, exact, epsilon = 1e-8);
    }

    #[test]
    fn test_worker_count_does_not_change_result() {
        let (oracle, b) = fixture();
        let serial = Executor::serial();
        let pooled = Executor::exact(4).unwrap();
        let f0 = oracle.value(&b, &serial).unwrap();
        let estimator = GradientEstimator::new(1e-6);
        let g1 = estimator.estimate(&oracle, &b, f0, &serial).unwrap();
        let g4 = estimator.estimate(&oracle, &b, f0, &pooled).unwrap();
        assert_eq!(g1, g4);
    }

    #[test]
    fn test_closed_form_gradient_is_used() {
        let b = DMatrix::from_element(2, 1, 1.0);
        let g = GradientEstimator::new(1e-6)
            .estimate(&WithClosedForm, &b, 0.0, &Executor::serial())
            .unwrap();
        assert_eq!(g, DMatrix::from_element(2, 1, 3.0));
    }
}
