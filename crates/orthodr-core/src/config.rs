//! Solver configuration.
//!
//! [`SolverConfig`] gathers every tolerance and control parameter of a run.
//! It is immutable once a run starts; build it with the `with_*` methods and
//! the solver validates it before the first objective evaluation.

use crate::error::{SolverError, SolverResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Finite-difference scheme used for numerical gradients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FiniteDifference {
    /// (F(B + eps E_ij) - F(B)) / eps, reusing the value at B.
    #[default]
    Forward,
    /// (F(B + eps E_ij) - F(B - eps E_ij)) / (2 eps).
    Central,
}

/// Representation of the Cayley retraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RetractionKind {
    /// Low-rank when `ndr < P / 2`, dense otherwise.
    #[default]
    Auto,
    /// Dense skew-symmetric P x P system.
    Dense,
    /// Factorised 2ndr x 2ndr system.
    LowRank,
}

/// Tolerances and control parameters of the curvilinear search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Sufficient-decrease constant of the non-monotone Armijo test
    pub rho: f64,
    /// Backtracking shrink factor for the step size
    pub eta: f64,
    /// Averaging weight of the non-monotone reference value
    pub gamma: f64,
    /// Initial step size
    pub tau0: f64,
    /// Finite-difference perturbation
    pub epsilon: f64,
    /// Parameter change tolerance
    pub btol: f64,
    /// Relative objective change tolerance
    pub ftol: f64,
    /// Projected gradient norm tolerance
    pub gtol: f64,
    /// Maximum number of driver iterations
    pub max_iterations: usize,
    /// 0 silent, 1 final summary, >1 progress every 10 iterations
    pub verbose: u8,
    /// Worker threads; 0 means all available cores
    pub ncore: usize,
    /// Numerical gradient scheme
    pub finite_difference: FiniteDifference,
    /// Retraction representation
    pub retraction: RetractionKind,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rho: 1e-4,
            eta: 0.5,
            gamma: 0.85,
            tau0: 1e-3,
            epsilon: 1e-6,
            btol: 1e-6,
            ftol: 1e-6,
            gtol: 1e-6,
            max_iterations: 500,
            verbose: 0,
            ncore: 1,
            finite_difference: FiniteDifference::Forward,
            retraction: RetractionKind::Auto,
        }
    }
}

impl SolverConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sufficient-decrease constant.
    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    /// Sets the backtracking shrink factor.
    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta;
        self
    }

    /// Sets the non-monotone averaging weight.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Sets the initial step size.
    pub fn with_tau0(mut self, tau0: f64) -> Self {
        self.tau0 = tau0;
        self
    }

    /// Sets the finite-difference perturbation.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the parameter, value and gradient tolerances at once.
    pub fn with_tolerances(mut self, btol: f64, ftol: f64, gtol: f64) -> Self {
        self.btol = btol;
        self.ftol = ftol;
        self.gtol = gtol;
        self
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the verbosity level.
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the number of worker threads.
    pub fn with_ncore(mut self, ncore: usize) -> Self {
        self.ncore = ncore;
        self
    }

    /// Sets the finite-difference scheme.
    pub fn with_finite_difference(mut self, scheme: FiniteDifference) -> Self {
        self.finite_difference = scheme;
        self
    }

    /// Forces a retraction representation.
    pub fn with_retraction(mut self, kind: RetractionKind) -> Self {
        self.retraction = kind;
        self
    }

    /// Checks every parameter, reporting the first invalid one.
    pub fn validate(&self) -> SolverResult<()> {
        if !(self.rho.is_finite() && self.rho > 0.0) {
            return Err(SolverError::invalid_configuration(
                "must be positive",
                "rho",
                self.rho,
            ));
        }
        if !(self.eta > 0.0 && self.eta < 1.0) {
            return Err(SolverError::invalid_configuration(
                "must lie in (0, 1)",
                "eta",
                self.eta,
            ));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(SolverError::invalid_configuration(
                "must lie in [0, 1]",
                "gamma",
                self.gamma,
            ));
        }
        if !(self.tau0.is_finite() && self.tau0 > 0.0) {
            return Err(SolverError::invalid_configuration(
                "must be positive",
                "tau0",
                self.tau0,
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(SolverError::invalid_configuration(
                "must be positive",
                "epsilon",
                self.epsilon,
            ));
        }
        for (name, tol) in [("btol", self.btol), ("ftol", self.ftol), ("gtol", self.gtol)] {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(SolverError::invalid_configuration(
                    "must be non-negative",
                    name,
                    tol,
                ));
            }
        }
        if self.max_iterations == 0 {
            return Err(SolverError::invalid_configuration(
                "must be at least 1",
                "max_iterations",
                self.max_iterations,
            ));
        }
        Ok(())
    }
}
