//! Local-smoothing estimating equation.
//!
//! With leave-one-out Nadaraya-Watson estimates taken along the projected
//! covariates Z = X B, the equation is
//!
//! ```text
//! U(B) = sum_i (A_i - E[A | Z_i]) (W_i - E[W | Z_i])^T
//! ```
//!
//! for a response feature A and a covariate feature W, and the objective is
//! ||U(B)||_F^2 / N^2. The local method uses A = Y and W = X; the moment
//! methods in [`crate::moment`] only swap the features.

use crate::validation::{check_covariates, check_finite, check_same_rows};
use orthodr_core::{
    error::{ObjectiveError, ObjectiveResult},
    kernel::{nadaraya_watson, scaled_projection, GaussianKernel},
    objective::ObjectiveOracle,
    parallel::Executor,
    types::DMatrix,
};

/// Cross moment of the kernel residuals of `response` and `covariate`.
pub(crate) fn residual_cross_moment(
    kernel: &DMatrix<f64>,
    response: &DMatrix<f64>,
    covariate: &DMatrix<f64>,
) -> DMatrix<f64> {
    let response_residual = response - nadaraya_watson(kernel, response);
    let covariate_residual = covariate - nadaraya_watson(kernel, covariate);
    response_residual.transpose() * covariate_residual
}

/// Leave-one-out kernel weights on the scaled projection of `x`.
pub(crate) fn smoothing_kernel(
    x: &DMatrix<f64>,
    b: &DMatrix<f64>,
    bw: f64,
    exec: &Executor,
) -> DMatrix<f64> {
    let z = scaled_projection(x, b, bw);
    GaussianKernel::leave_one_out().matrix(&z, exec)
}

/// Local-smoothing objective for a (possibly multivariate) response.
#[derive(Debug, Clone)]
pub struct LocalObjective {
    x: DMatrix<f64>,
    y: DMatrix<f64>,
    bw: f64,
}

impl LocalObjective {
    /// Builds the objective from an N x P covariate and an N x q response.
    pub fn new(x: DMatrix<f64>, y: DMatrix<f64>, bw: f64) -> ObjectiveResult<Self> {
        check_covariates(&x)?;
        check_same_rows("response", x.nrows(), y.nrows())?;
        check_finite("response", &y)?;
        let bw = ObjectiveError::check_bandwidth(bw)?;
        Ok(Self { x, y, bw })
    }

    /// Number of observations.
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }
}

impl ObjectiveOracle for LocalObjective {
    fn name(&self) -> &str {
        "local"
    }

    fn dimension(&self) -> usize {
        self.x.ncols()
    }

    fn bandwidth(&self) -> Option<f64> {
        Some(self.bw)
    }

    fn value(&self, b: &DMatrix<f64>, exec: &Executor) -> ObjectiveResult<f64> {
        self.check_parameter(b)?;
        let kernel = smoothing_kernel(&self.x, b, self.bw, exec);
        let moment = residual_cross_moment(&kernel, &self.y, &self.x);
        let n = self.n_samples() as f64;
        Ok(moment.norm_squared() / (n * n))
    }
}
