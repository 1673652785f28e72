//! Semiparametric SIR, SAVE and PHD moment conditions.
//!
//! All three reuse the residual cross moment of [`crate::local`] with
//! different features:
//!
//! | method | response feature A_i | covariate feature W_i |
//! |--------|----------------------|-----------------------|
//! | SIR    | E[X \| slice(y_i)] - mean(X) | X_i |
//! | SAVE   | vec(I - Cov[X \| slice(y_i)]) | X_i |
//! | PHD    | Y_i - mean(Y) | vec((X_i - mean X)(X_i - mean X)^T) |
//!
//! The response features do not depend on B and are computed once.

use crate::local::{residual_cross_moment, smoothing_kernel};
use crate::validation::{check_covariates, check_finite, check_same_rows};
use orthodr_core::{
    error::{ObjectiveError, ObjectiveResult},
    objective::ObjectiveOracle,
    parallel::Executor,
    types::{DMatrix, DVector},
};

/// Which moment condition an objective encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MomentMethod {
    /// Sliced inverse regression
    Sir,
    /// Sliced average variance estimation
    Save,
    /// Principal Hessian directions
    Phd,
}

/// Assigns each observation to one of `nslices` equal-count slices of `y`.
///
/// Ties are broken by position, so the assignment is deterministic.
pub fn slice_labels(y: &DVector<f64>, nslices: usize) -> ObjectiveResult<Vec<usize>> {
    let n = y.len();
    if nslices == 0 || nslices > n {
        return Err(ObjectiveError::invalid_data(format!(
            "number of slices must lie in [1, {n}], got {nslices}"
        )));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(ObjectiveError::invalid_data("response contains NaN or infinite entries"));
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| y[a].total_cmp(&y[b]));
    let mut labels = vec![0; n];
    for (rank, &i) in order.iter().enumerate() {
        labels[i] = rank * nslices / n;
    }
    Ok(labels)
}

/// Moment-condition objective (SIR, SAVE or PHD).
#[derive(Debug, Clone)]
pub struct MomentObjective {
    method: MomentMethod,
    x: DMatrix<f64>,
    response_feature: DMatrix<f64>,
    covariate_feature: DMatrix<f64>,
    bw: f64,
}

impl MomentObjective {
    /// Semiparametric SIR with `nslices` slices of the response.
    pub fn sir(
        x: DMatrix<f64>,
        y: &DVector<f64>,
        nslices: usize,
        bw: f64,
    ) -> ObjectiveResult<Self> {
        check_covariates(&x)?;
        check_same_rows("response", x.nrows(), y.len())?;
        let bw = ObjectiveError::check_bandwidth(bw)?;
        let labels = slice_labels(y, nslices)?;

        let grand_mean = column_means(&x);
        let slice_means = slice_statistics(&x, &labels, nslices, |rows| {
            column_means(rows) - &grand_mean
        });
        let response_feature = DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| {
            slice_means[labels[i]][j]
        });

        Ok(Self {
            method: MomentMethod::Sir,
            covariate_feature: x.clone(),
            x,
            response_feature,
            bw,
        })
    }

    /// Semiparametric SAVE with `nslices` slices of the response.
    pub fn save(
        x: DMatrix<f64>,
        y: &DVector<f64>,
        nslices: usize,
        bw: f64,
    ) -> ObjectiveResult<Self> {
        check_covariates(&x)?;
        check_same_rows("response", x.nrows(), y.len())?;
        let bw = ObjectiveError::check_bandwidth(bw)?;
        let labels = slice_labels(y, nslices)?;

        let p = x.ncols();
        let slice_terms = slice_statistics(&x, &labels, nslices, |rows| {
            let centered = center_columns(rows);
            let cov = centered.transpose() * &centered / rows.nrows() as f64;
            let term = DMatrix::<f64>::identity(p, p) - cov;
            DVector::from_column_slice(term.as_slice())
        });
        let response_feature = DMatrix::from_fn(x.nrows(), p * p, |i, j| {
            slice_terms[labels[i]][j]
        });

        Ok(Self {
            method: MomentMethod::Save,
            covariate_feature: x.clone(),
            x,
            response_feature,
            bw,
        })
    }

    /// Semiparametric PHD for an N x q response.
    pub fn phd(x: DMatrix<f64>, y: DMatrix<f64>, bw: f64) -> ObjectiveResult<Self> {
        check_covariates(&x)?;
        check_same_rows("response", x.nrows(), y.nrows())?;
        check_finite("response", &y)?;
        let bw = ObjectiveError::check_bandwidth(bw)?;

        let p = x.ncols();
        let centered = center_columns(&x);
        let covariate_feature = DMatrix::from_fn(x.nrows(), p * p, |i, j| {
            centered[(i, j % p)] * centered[(i, j / p)]
        });

        Ok(Self {
            method: MomentMethod::Phd,
            response_feature: center_columns(&y),
            covariate_feature,
            x,
            bw,
        })
    }

    /// The encoded moment condition.
    pub fn method(&self) -> MomentMethod {
        self.method
    }
}

impl ObjectiveOracle for MomentObjective {
    fn name(&self) -> &str {
        match self.method {
            MomentMethod::Sir => "sir",
            MomentMethod::Save => "save",
            MomentMethod::Phd => "phd",
        }
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
        let moment =
            residual_cross_moment(&kernel, &self.response_feature, &self.covariate_feature);
        let n = self.x.nrows() as f64;
        Ok(moment.norm_squared() / (n * n))
    }
}

fn column_means(m: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(m.ncols(), m.column_iter().map(|c| c.mean()))
}

fn center_columns(m: &DMatrix<f64>) -> DMatrix<f64> {
    let means = column_means(m);
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)] - means[j])
}

// Applies `stat` to the rows of every slice, in slice order.
fn slice_statistics<S>(
    x: &DMatrix<f64>,
    labels: &[usize],
    nslices: usize,
    stat: S,
) -> Vec<DVector<f64>>
where
    S: Fn(&DMatrix<f64>) -> DVector<f64>,
{
    (0..nslices)
        .map(|h| {
            let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == h).collect();
            stat(&x.select_rows(members.iter()))
        })
        .collect()
}
