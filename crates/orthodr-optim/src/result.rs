//! Outcome of a solver run.

use crate::convergence::{ConvergenceRule, IterationRecord};
use orthodr_core::types::DMatrix;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reason a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// The stopping rule fired
    Converged(ConvergenceRule),
    /// The iteration budget ran out first
    MaxIterations,
}

/// Final state and diagnostics of a run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationResult {
    /// Final parameter matrix
    pub b: DMatrix<f64>,
    /// Objective value at `b`
    pub value: f64,
    /// Iteration at which the run stopped
    pub iterations: usize,
    /// Whether the stopping rule fired within the budget
    pub converged: bool,
    /// Kernel bandwidth of the objective, if it has one
    pub bw: Option<f64>,
    /// Projected gradient norm at `b`
    pub gradient_norm: f64,
    /// ||B^T B - I||_F at `b`
    pub feasibility: f64,
    /// Why the run stopped
    pub termination_reason: TerminationReason,
    /// Objective evaluations, finite-difference probes included
    pub function_evaluations: usize,
    /// Closed-form gradient evaluations
    pub gradient_evaluations: usize,
    /// Diagnostics of every iteration
    pub history: Vec<IterationRecord>,
}

impl OptimizationResult {
    /// Rule that ended the run, if it converged.
    pub fn convergence_rule(&self) -> Option<ConvergenceRule> {
        match self.termination_reason {
            TerminationReason::Converged(rule) => Some(rule),
            TerminationReason::MaxIterations => None,
        }
    }
}
