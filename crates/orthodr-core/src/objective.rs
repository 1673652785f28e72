//! Objective interface shared by every estimating equation.
//!
//! An objective maps a P x ndr parameter matrix to a scalar. Evaluation must
//! be a pure function of the parameter matrix and the data captured at
//! construction: the gradient estimator calls [`ObjectiveOracle::value`]
//! concurrently from several workers, each with its own perturbed copy of B.

use crate::{
    error::{ObjectiveError, ObjectiveResult},
    parallel::Executor,
    types::DMatrix,
};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scalar objective over P x ndr parameter matrices.
pub trait ObjectiveOracle: Debug + Sync {
    /// Short human-readable name.
    fn name(&self) -> &str;

    /// Number of rows P the parameter matrix must have.
    fn dimension(&self) -> usize;

    /// Kernel bandwidth used by the objective, if any.
    fn bandwidth(&self) -> Option<f64> {
        None
    }

    /// Evaluates the objective at `b`.
    ///
    /// `exec` controls the kernel engine. Implementations must not hold state
    /// between calls.
    fn value(&self, b: &DMatrix<f64>, exec: &Executor) -> ObjectiveResult<f64>;

    /// Closed-form Euclidean gradient, when the objective provides one.
    ///
    /// The default returns `None`, selecting finite differences.
    fn analytic_gradient(&self, _b: &DMatrix<f64>) -> Option<ObjectiveResult<DMatrix<f64>>> {
        None
    }

    /// Checks that `b` has the row count this objective expects.
    fn check_parameter(&self, b: &DMatrix<f64>) -> ObjectiveResult<()> {
        if b.nrows() == self.dimension() {
            Ok(())
        } else {
            Err(ObjectiveError::dimension_mismatch(
                format!("{} rows", self.dimension()),
                format!("{} rows", b.nrows()),
            ))
        }
    }
}

impl<O: ObjectiveOracle + ?Sized> ObjectiveOracle for &O {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn bandwidth(&self) -> Option<f64> {
        (**self).bandwidth()
    }

    fn value(&self, b: &DMatrix<f64>, exec: &Executor) -> ObjectiveResult<f64> {
        (**self).value(b, exec)
    }

    fn analytic_gradient(&self, b: &DMatrix<f64>) -> Option<ObjectiveResult<DMatrix<f64>>> {
        (**self).analytic_gradient(b)
    }

    fn check_parameter(&self, b: &DMatrix<f64>) -> ObjectiveResult<()> {
        (**self).check_parameter(b)
    }
}

/// Wrapper counting objective and analytic gradient evaluations.
///
/// Counters are atomic so the wrapper can be shared with gradient workers.
#[derive(Debug)]
pub struct CountingObjective<O> {
    /// The wrapped objective
    pub inner: O,
    values: AtomicUsize,
    gradients: AtomicUsize,
}

impl<O: ObjectiveOracle> CountingObjective<O> {
    /// Wraps an objective with zeroed counters.
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            values: AtomicUsize::new(0),
            gradients: AtomicUsize::new(0),
        }
    }

    /// Number of objective evaluations so far.
    pub fn value_count(&self) -> usize {
        self.values.load(Ordering::Relaxed)
    }

    /// Number of analytic gradient evaluations so far.
    pub fn gradient_count(&self) -> usize {
        self.gradients.load(Ordering::Relaxed)
    }

    /// Resets both counters.
    pub fn reset_counts(&self) {
        self.values.store(0, Ordering::Relaxed);
        self.gradients.store(0, Ordering::Relaxed);
    }
}

impl<O: ObjectiveOracle> ObjectiveOracle for CountingObjective<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn bandwidth(&self) -> Option<f64> {
        self.inner.bandwidth()
    }

    fn value(&self, b: &DMatrix<f64>, exec: &Executor) -> ObjectiveResult<f64> {
        self.values.fetch_add(1, Ordering::Relaxed);
        self.inner.value(b, exec)
    }

    fn analytic_gradient(&self, b: &DMatrix<f64>) -> Option<ObjectiveResult<DMatrix<f64>>> {
        let gradient = self.inner.analytic_gradient(b);
        if gradient.is_some() {
            self.gradients.fetch_add(1, Ordering::Relaxed);
        }
        gradient
    }

    fn check_parameter(&self, b: &DMatrix<f64>) -> ObjectiveResult<()> {
        self.inner.check_parameter(b)
    }
}
