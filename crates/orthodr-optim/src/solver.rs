//! Curvilinear search on the Stiefel manifold.
//!
//! This is the feasible method of Wen and Yin (2013): every trial point lies
//! on a Cayley curve through the current point, the initial step of each
//! iteration is a Barzilai-Borwein step, and the backtracking test compares
//! against the Zhang-Hager average Cval instead of the previous value, so the
//! objective itself may go up from one iteration to the next.
//!
//! One driver iteration:
//!
//! 1. Retract along the projected gradient with step `tau`, shrinking
//!    `tau <- eta * tau` until `F <= Cval - tau * rho * ||dtX||^2`, at most
//!    [`MAX_BACKTRACKS`] trials. The last trial is accepted regardless.
//! 2. Re-estimate the gradient, `dtX = G - B G^T B` and its norm.
//! 3. Record `||S||_F / sqrt(P)` and `|F_prev - F| / (|F_prev| + 1)`.
//! 4. Take the next step from `S = B - B_prev`, `Y = dtX - dtX_prev`,
//!    alternating `<S,S>/|<S,Y>|` and `|<S,Y>|/<Y,Y>` and clamping to
//!    [`TAU_MIN`], [`TAU_MAX`].
//! 5. Test the stopping rule, then update `Q <- gamma Q + 1` and
//!    `Cval <- (gamma Q_prev Cval + F) / Q`.

use crate::{
    convergence::{ConvergenceTracker, IterationRecord},
    report::Reporter,
    result::{OptimizationResult, TerminationReason},
    retraction::select_retraction,
};
use log::{debug, warn};
use orthodr_core::{
    config::SolverConfig,
    error::{ObjectiveError, SolverError, SolverResult},
    gradient::GradientEstimator,
    objective::{CountingObjective, ObjectiveOracle},
    parallel::Executor,
    types::{
        constants::{MAX_BACKTRACKS, TAU_MAX, TAU_MIN},
        feasibility, frobenius_dot, DMatrix,
    },
};
use std::io::Write;

/// Orthogonality constrained minimiser.
#[derive(Debug, Clone, Default)]
pub struct StiefelOptimizer {
    config: SolverConfig,
}

impl StiefelOptimizer {
    /// Creates a solver with the given configuration.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// The solver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Minimises `oracle` starting from `b0`, printing verbose output to
    /// standard output.
    pub fn solve<O>(&self, oracle: &O, b0: DMatrix<f64>) -> SolverResult<OptimizationResult>
    where
        O: ObjectiveOracle + ?Sized,
    {
        self.solve_with_writer(oracle, b0, std::io::stdout())
    }

    /// Minimises `oracle` starting from `b0`, writing verbose output to `out`.
    ///
    /// The worker pool is built from `ncore` in the configuration.
    pub fn solve_with_writer<O, W>(
        &self,
        oracle: &O,
        b0: DMatrix<f64>,
        out: W,
    ) -> SolverResult<OptimizationResult>
    where
        O: ObjectiveOracle + ?Sized,
        W: Write,
    {
        self.config.validate()?;
        let exec = Executor::with_threads(self.config.ncore)?;
        self.solve_with_executor(oracle, b0, &exec, out)
    }

    /// Minimises `oracle` on a caller-supplied executor; `ncore` in the
    /// configuration is ignored.
    pub fn solve_with_executor<O, W>(
        &self,
        oracle: &O,
        b0: DMatrix<f64>,
        exec: &Executor,
        out: W,
    ) -> SolverResult<OptimizationResult>
    where
        O: ObjectiveOracle + ?Sized,
        W: Write,
    {
        let config = &self.config;
        self.validate(oracle, &b0)?;

        let (p, ndr) = b0.shape();
        let estimator = GradientEstimator::from_config(config);
        let objective = CountingObjective::new(oracle);
        let mut reporter = Reporter::new(out, config.verbose);
        let mut retraction = select_retraction(config.retraction, p, ndr);
        debug!(
            "minimising {} over {}x{} matrices: {} retraction, {} worker(s)",
            objective.name(),
            p,
            ndr,
            retraction.name(),
            exec.threads()
        );

        let mut b = b0;
        let mut f = objective.value(&b, exec)?;
        let mut g = estimator.estimate(&objective, &b, f, exec)?;
        let mut dtx = projected_gradient(&b, &g);
        let mut nrm_g = dtx.norm();
        check_finite(0, f, nrm_g)?;
        retraction.prepare(&b, &g);
        reporter.initial_value(f);

        let mut q = 1.0;
        let mut cval = f;
        let mut tau = config.tau0;
        let mut tracker = ConvergenceTracker::from_config(config);
        let mut termination = TerminationReason::MaxIterations;
        let mut iterations = config.max_iterations;
        let sqrt_p = (p as f64).sqrt();

        for itr in 1..=config.max_iterations {
            let b_prev = b;
            let f_prev = f;
            let dtx_prev = dtx;
            let deriv = config.rho * nrm_g * nrm_g;

            let mut attempt = 1;
            let (candidate, f_new, g_new, armijo_satisfied) = loop {
                let candidate = retraction.retract(&b_prev, tau, itr)?;
                let f_trial = objective.value(&candidate, exec)?;
                let g_trial = estimator.estimate(&objective, &candidate, f_trial, exec)?;
                let satisfied = f_trial <= cval - tau * deriv;
                if satisfied || attempt >= MAX_BACKTRACKS {
                    break (candidate, f_trial, g_trial, satisfied);
                }
                tau *= config.eta;
                attempt += 1;
            };
            if !armijo_satisfied {
                warn!(
                    "iteration {itr}: accepting step without sufficient decrease \
                     after {attempt} trials (tau = {tau:e})"
                );
            }

            b = candidate;
            f = f_new;
            g = g_new;
            retraction.prepare(&b, &g);
            dtx = projected_gradient(&b, &g);
            nrm_g = dtx.norm();
            check_finite(itr, f, nrm_g)?;

            let s = &b - &b_prev;
            let y = &dtx - &dtx_prev;
            let param_change = s.norm() / sqrt_p;
            let value_change = (f_prev - f).abs() / (f_prev.abs() + 1.0);
            let accepted_tau = tau;
            tau = barzilai_borwein(itr, &s, &y, tau);

            tracker.push(IterationRecord {
                iteration: itr,
                objective_value: f,
                reference_value: cval,
                gradient_norm: nrm_g,
                param_change,
                value_change,
                tau: accepted_tau,
                backtracks: attempt - 1,
                armijo_satisfied,
            });
            debug!(
                "iteration {itr}: F = {f:e}, |dtX| = {nrm_g:e}, BDiff = {param_change:e}, \
                 FDiff = {value_change:e}, tau = {accepted_tau:e}"
            );
            reporter.progress(itr, f);

            if let Some(rule) = tracker.check() {
                debug!("converged at iteration {itr} by {rule:?}");
                reporter.converged();
                termination = TerminationReason::Converged(rule);
                iterations = itr;
                break;
            }

            let q_prev = q;
            q = config.gamma * q_prev + 1.0;
            cval = (config.gamma * q_prev * cval + f) / q;
        }

        let converged = matches!(termination, TerminationReason::Converged(_));
        if !converged {
            warn!(
                "{} iterations exhausted before convergence (F = {f:e}, |dtX| = {nrm_g:e})",
                config.max_iterations
            );
            reporter.max_iterations_exceeded();
        }
        let feasi = feasibility(&b);
        reporter.summary(iterations, f, nrm_g, feasi);

        Ok(OptimizationResult {
            b,
            value: f,
            iterations,
            converged,
            bw: oracle.bandwidth(),
            gradient_norm: nrm_g,
            feasibility: feasi,
            termination_reason: termination,
            function_evaluations: objective.value_count(),
            gradient_evaluations: objective.gradient_count(),
            history: tracker.into_history(),
        })
    }

    fn validate<O>(&self, oracle: &O, b0: &DMatrix<f64>) -> SolverResult<()>
    where
        O: ObjectiveOracle + ?Sized,
    {
        self.config.validate()?;
        let (p, ndr) = b0.shape();
        if p == 0 || ndr == 0 {
            return Err(SolverError::invalid_configuration(
                "parameter matrix must have at least one row and one column",
                "B",
                format!("{p}x{ndr}"),
            ));
        }
        if ndr > p {
            return Err(SolverError::invalid_configuration(
                "number of directions cannot exceed the number of rows",
                "ndr",
                format!("{ndr} > P = {p}"),
            ));
        }
        if b0.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::invalid_configuration(
                "initial parameter matrix contains NaN or infinite entries",
                "B",
                format!("{p}x{ndr}"),
            ));
        }
        oracle.check_parameter(b0)?;
        if let Some(bw) = oracle.bandwidth() {
            ObjectiveError::check_bandwidth(bw)?;
        }
        Ok(())
    }
}

/// Riemannian gradient `G - B G^T B` of the canonical metric.
pub fn projected_gradient(b: &DMatrix<f64>, g: &DMatrix<f64>) -> DMatrix<f64> {
    g - b * (g.transpose() * b)
}

// An undefined quotient (S = Y = 0) keeps the current step.
fn barzilai_borwein(iteration: usize, s: &DMatrix<f64>, y: &DMatrix<f64>, tau: f64) -> f64 {
    let sy = frobenius_dot(s, y).abs();
    let step = if iteration % 2 == 0 {
        frobenius_dot(s, s) / sy
    } else {
        sy / frobenius_dot(y, y)
    };
    if step.is_nan() {
        tau
    } else {
        step.clamp(TAU_MIN, TAU_MAX)
    }
}

fn check_finite(iteration: usize, value: f64, gradient_norm: f64) -> SolverResult<()> {
    if value.is_finite() && gradient_norm.is_finite() {
        Ok(())
    } else {
        Err(SolverError::NonFinite {
            iteration,
            value,
            gradient_norm,
        })
    }
}
