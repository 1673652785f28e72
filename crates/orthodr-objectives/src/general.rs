//! Objective built from user supplied closures.
//!
//! The value closure is required; an optional gradient closure replaces the
//! finite-difference estimate. Both closures must be pure so they can be
//! called from several gradient workers at once.

use orthodr_core::{
    error::{ObjectiveError, ObjectiveResult},
    objective::ObjectiveOracle,
    parallel::Executor,
    types::DMatrix,
};
use std::fmt;

/// Plain function pointer used when no gradient closure is given.
pub type NoGradient = fn(&DMatrix<f64>) -> DMatrix<f64>;

/// Objective defined by closures over the P x ndr parameter matrix.
pub struct GeneralObjective<F, G = NoGradient> {
    dimension: usize,
    value_fn: F,
    gradient_fn: Option<G>,
}

impl<F> GeneralObjective<F>
where
    F: Fn(&DMatrix<f64>) -> f64 + Sync,
{
    /// Objective over matrices with `dimension` rows, gradients by finite differences.
    pub fn new(dimension: usize, value_fn: F) -> Self {
        Self {
            dimension,
            value_fn,
            gradient_fn: None,
        }
    }
}

impl<F, G> GeneralObjective<F, G>
where
    F: Fn(&DMatrix<f64>) -> f64 + Sync,
    G: Fn(&DMatrix<f64>) -> DMatrix<f64> + Sync,
{
    /// Attaches a closed-form Euclidean gradient.
    pub fn with_gradient<G2>(self, gradient_fn: G2) -> GeneralObjective<F, G2>
    where
        G2: Fn(&DMatrix<f64>) -> DMatrix<f64> + Sync,
    {
        GeneralObjective {
            dimension: self.dimension,
            value_fn: self.value_fn,
            gradient_fn: Some(gradient_fn),
        }
    }

    /// Whether a closed-form gradient is attached.
    pub fn has_gradient(&self) -> bool {
        self.gradient_fn.is_some()
    }
}

impl<F, G> fmt::Debug for GeneralObjective<F, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneralObjective")
            .field("dimension", &self.dimension)
            .field("gradient", &self.gradient_fn.is_some())
            .finish()
    }
}

impl<F, G> ObjectiveOracle for GeneralObjective<F, G>
where
    F: Fn(&DMatrix<f64>) -> f64 + Sync,
    G: Fn(&DMatrix<f64>) -> DMatrix<f64> + Sync,
{
    fn name(&self) -> &str {
        "general"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn value(&self, b: &DMatrix<f64>, _exec: &Executor) -> ObjectiveResult<f64> {
        self.check_parameter(b)?;
        Ok((self.value_fn)(b))
    }

    fn analytic_gradient(&self, b: &DMatrix<f64>) -> Option<ObjectiveResult<DMatrix<f64>>> {
        let gradient_fn = self.gradient_fn.as_ref()?;
        let gradient = gradient_fn(b);
        if gradient.shape() == b.shape() {
            Some(Ok(gradient))
        } else {
            Some(Err(ObjectiveError::evaluation_failed(format!(
                "gradient callback returned a {}x{} matrix for a {}x{} parameter",
                gradient.nrows(),
                gradient.ncols(),
                b.nrows(),
                b.ncols()
            ))))
        }
    }
}
