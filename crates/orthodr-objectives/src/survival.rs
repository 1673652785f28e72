//! Counting-process estimating equations for right-censored survival data.
//!
//! Subjects are ordered by event time, ascending. For every subject i the
//! failure times are swept from the last one backwards while the risk set
//! {k : k >= f_j} grows one subject at a time, so a full evaluation costs
//! O(N^2 + N * nFail) on top of the kernel matrix.
//!
//! Three variants are available:
//!
//! - [`SurvivalMethod::KernelHazard`]: the conditional hazard of subject i at
//!   failure j is `K(i, f_j) / sum_{k >= f_j} K(i, k)`.
//! - [`SurvivalMethod::NelsonAalenHazard`]: the hazard is the marginal
//!   Nelson-Aalen increment `1 / |R_j|`, the covariate contrast stays kernel
//!   weighted.
//! - [`SurvivalMethod::PartialLikelihood`]: the kernel partial likelihood
//!   `(1/nFail) sum_j -log(K(f_j, f_j) / sum_{k >= f_j} K(f_j, k))`.

use crate::validation::{check_covariates, check_finite};
use log::debug;
use orthodr_core::{
    error::{ObjectiveError, ObjectiveResult},
    kernel::{scaled_projection, GaussianKernel},
    objective::ObjectiveOracle,
    parallel::Executor,
    types::{DMatrix, DVector},
};

/// Covariates ordered by event time together with the failure positions.
#[derive(Debug, Clone)]
pub struct SurvivalData {
    x: DMatrix<f64>,
    fail_index: Vec<usize>,
    order: Option<Vec<usize>>,
}

impl SurvivalData {
    /// Wraps covariates already sorted by event time.
    ///
    /// `fail_index` holds the zero-based rows of the subjects that failed and
    /// must be strictly increasing.
    pub fn new(x: DMatrix<f64>, fail_index: Vec<usize>) -> ObjectiveResult<Self> {
        check_covariates(&x)?;
        if fail_index.is_empty() {
            return Err(ObjectiveError::invalid_data("at least one failure is required"));
        }
        let n = x.nrows();
        if let Some(&last) = fail_index.last() {
            if last >= n {
                return Err(ObjectiveError::invalid_data(format!(
                    "failure index {last} is out of range for {n} subjects"
                )));
            }
        }
        if let Some(pos) = fail_index.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ObjectiveError::unsorted(format!(
                "failure index {} at position {} follows {}",
                fail_index[pos + 1],
                pos + 1,
                fail_index[pos]
            )));
        }
        Ok(Self {
            x,
            fail_index,
            order: None,
        })
    }

    /// Like [`SurvivalData::new`], also checking that `times` is non-decreasing.
    pub fn with_event_times(
        x: DMatrix<f64>,
        fail_index: Vec<usize>,
        times: &DVector<f64>,
    ) -> ObjectiveResult<Self> {
        if times.len() != x.nrows() {
            return Err(ObjectiveError::dimension_mismatch(
                format!("{} event times", x.nrows()),
                format!("{} event times", times.len()),
            ));
        }
        if times.iter().any(|t| !t.is_finite()) {
            return Err(ObjectiveError::invalid_data("event times contain NaN or infinite entries"));
        }
        if let Some(pos) = times.as_slice().windows(2).position(|w| w[0] > w[1]) {
            return Err(ObjectiveError::unsorted(format!(
                "event time {} at row {} is earlier than {}",
                times[pos + 1],
                pos + 1,
                times[pos]
            )));
        }
        Self::new(x, fail_index)
    }

    /// Sorts subjects by event time and derives the failure positions.
    ///
    /// At tied times failures come before censored subjects, so a subject
    /// censored at a failure time stays in that failure's risk set. The
    /// permutation is kept in [`SurvivalData::order`].
    pub fn from_unsorted(
        x: &DMatrix<f64>,
        times: &DVector<f64>,
        failed: &[bool],
    ) -> ObjectiveResult<Self> {
        let n = x.nrows();
        if times.len() != n || failed.len() != n {
            return Err(ObjectiveError::dimension_mismatch(
                format!("{n} event times and indicators"),
                format!("{} times and {} indicators", times.len(), failed.len()),
            ));
        }
        if times.iter().any(|t| !t.is_finite()) {
            return Err(ObjectiveError::invalid_data("event times contain NaN or infinite entries"));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            times[a]
                .total_cmp(&times[b])
                .then_with(|| failed[b].cmp(&failed[a]))
        });
        let sorted = x.select_rows(order.iter());
        let fail_index: Vec<usize> = order
            .iter()
            .enumerate()
            .filter_map(|(row, &subject)| failed[subject].then_some(row))
            .collect();
        debug!(
            "sorted {} subjects by event time, {} failures",
            n,
            fail_index.len()
        );

        let mut data = Self::new(sorted, fail_index)?;
        data.order = Some(order);
        Ok(data)
    }

    /// Covariates in event-time order.
    pub fn x(&self) -> &DMatrix<f64> {
        &self.x
    }

    /// Zero-based rows of the failing subjects, ascending.
    pub fn fail_index(&self) -> &[usize] {
        &self.fail_index
    }

    /// Original row of every sorted row, when built by [`SurvivalData::from_unsorted`].
    pub fn order(&self) -> Option<&[usize]> {
        self.order.as_deref()
    }

    /// Number of subjects N.
    pub fn n_subjects(&self) -> usize {
        self.x.nrows()
    }

    /// Number of failures nFail.
    pub fn n_failures(&self) -> usize {
        self.fail_index.len()
    }

    /// Number of covariates P.
    pub fn dimension(&self) -> usize {
        self.x.ncols()
    }

    /// P x nFail matrix whose column j is the mean covariate of the risk set
    /// at failure j.
    pub fn at_risk_means(&self) -> DMatrix<f64> {
        let (n, p) = self.x.shape();
        let mut means = DMatrix::zeros(p, self.n_failures());
        let mut sum = DVector::<f64>::zeros(p);
        let mut k = n;
        for (j, &f) in self.fail_index.iter().enumerate().rev() {
            while k > f {
                k -= 1;
                sum += self.x.row(k).transpose();
            }
            means.set_column(j, &(&sum / (n - f) as f64));
        }
        means
    }
}

/// Which counting-process equation a [`SurvivalObjective`] evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SurvivalMethod {
    /// Kernel-smoothed conditional hazard
    KernelHazard,
    /// Marginal Nelson-Aalen hazard with kernel-weighted contrasts
    NelsonAalenHazard,
    /// Kernel partial likelihood
    PartialLikelihood,
}

/// Survival objective over sorted [`SurvivalData`].
#[derive(Debug, Clone)]
pub struct SurvivalObjective {
    method: SurvivalMethod,
    data: SurvivalData,
    // transposed covariates, one subject per column
    xt: DMatrix<f64>,
    phit: Option<DMatrix<f64>>,
    bw: f64,
}

impl SurvivalObjective {
    /// Counting-process equation with the kernel conditional hazard.
    ///
    /// `phit` is the P x nFail matrix of martingale weights.
    pub fn kernel_hazard(data: SurvivalData, phit: DMatrix<f64>, bw: f64) -> ObjectiveResult<Self> {
        Self::with_phit(SurvivalMethod::KernelHazard, data, phit, bw)
    }

    /// Counting-process equation with the Nelson-Aalen hazard.
    pub fn nelson_aalen(data: SurvivalData, phit: DMatrix<f64>, bw: f64) -> ObjectiveResult<Self> {
        Self::with_phit(SurvivalMethod::NelsonAalenHazard, data, phit, bw)
    }

    /// Negative kernel partial log-likelihood.
    pub fn partial_likelihood(data: SurvivalData, bw: f64) -> ObjectiveResult<Self> {
        let bw = ObjectiveError::check_bandwidth(bw)?;
        Ok(Self {
            method: SurvivalMethod::PartialLikelihood,
            xt: data.x.transpose(),
            data,
            phit: None,
            bw,
        })
    }

    fn with_phit(
        method: SurvivalMethod,
        data: SurvivalData,
        phit: DMatrix<f64>,
        bw: f64,
    ) -> ObjectiveResult<Self> {
        let bw = ObjectiveError::check_bandwidth(bw)?;
        let expected = (data.dimension(), data.n_failures());
        if phit.shape() != expected {
            return Err(ObjectiveError::dimension_mismatch(
                format!("Phit of shape {expected:?}"),
                format!("{:?}", phit.shape()),
            ));
        }
        check_finite("Phit", &phit)?;
        Ok(Self {
            method,
            xt: data.x.transpose(),
            data,
            phit: Some(phit),
            bw,
        })
    }

    /// The evaluated equation.
    pub fn method(&self) -> SurvivalMethod {
        self.method
    }

    /// The sorted survival data.
    pub fn data(&self) -> &SurvivalData {
        &self.data
    }

    fn counting_process(&self, kernel: &DMatrix<f64>, phit: &DMatrix<f64>) -> f64 {
        let n = self.data.n_subjects();
        let p = self.data.dimension();
        let fail = &self.data.fail_index;
        let mut integral = DMatrix::<f64>::zeros(p, p);
        let mut weighted_sum = DVector::<f64>::zeros(p);

        for i in 0..n {
            weighted_sum.fill(0.0);
            let mut weights = 0.0;
            let mut k = n;
            for (j, &f) in fail.iter().enumerate().rev() {
                while k > f {
                    k -= 1;
                    let w = kernel[(i, k)];
                    weighted_sum.axpy(w, &self.xt.column(k), 1.0);
                    weights += w;
                }
                if i < f || weights <= 0.0 {
                    continue;
                }
                let hazard = match self.method {
                    SurvivalMethod::NelsonAalenHazard => 1.0 / (n - f) as f64,
                    _ => kernel[(i, f)] / weights,
                };
                let delta = if i == f { 1.0 } else { 0.0 };
                let mut contrast = self.xt.column(i).into_owned();
                contrast.axpy(-1.0 / weights, &weighted_sum, 1.0);
                integral.ger(delta - hazard, &phit.column(j), &contrast, 1.0);
            }
        }

        let n_fail = fail.len() as f64;
        integral.norm_squared() / (n_fail * n_fail)
    }

    fn partial_log_likelihood(&self, kernel: &DMatrix<f64>) -> f64 {
        let n = self.data.n_subjects();
        let fail = &self.data.fail_index;
        let mut total = 0.0;
        for &f in fail {
            let risk: f64 = (f..n).map(|k| kernel[(f, k)]).sum();
            if risk > 0.0 {
                total -= (kernel[(f, f)] / risk).ln();
            }
        }
        total / fail.len() as f64
    }
}

impl ObjectiveOracle for SurvivalObjective {
    fn name(&self) -> &str {
        match self.method {
            SurvivalMethod::KernelHazard => "surv_dm",
            SurvivalMethod::NelsonAalenHazard => "surv_dn",
            SurvivalMethod::PartialLikelihood => "surv_forward",
        }
    }

    fn dimension(&self) -> usize {
        self.data.dimension()
    }

    fn bandwidth(&self) -> Option<f64> {
        Some(self.bw)
    }

    fn value(&self, b: &DMatrix<f64>, exec: &Executor) -> ObjectiveResult<f64> {
        self.check_parameter(b)?;
        let z = scaled_projection(&self.data.x, b, self.bw);
        let kernel = GaussianKernel::new().matrix(&z, exec);
        Ok(match &self.phit {
            Some(phit) => self.counting_process(&kernel, phit),
            None => self.partial_log_likelihood(&kernel),
        })
    }
}
