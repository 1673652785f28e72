//! Cayley retractions on the Stiefel manifold.
//!
//! With the skew-symmetric matrix `A = G B^T - B G^T`, the curvilinear path
//!
//! ```text
//! Y(tau) = (I + tau/2 A)^{-1} (I - tau/2 A) B
//! ```
//!
//! stays on the manifold for every `tau`. [`DenseCayley`] solves the P x P
//! system directly. [`LowRankCayley`] writes `A = U V^T` with `U = [G | B]`
//! and `V = [B | -G]` and only solves a 2ndr x 2ndr system, which is cheaper
//! when ndr is small compared to P. Both produce the same point.

use orthodr_core::{
    config::RetractionKind,
    error::{SolverError, SolverResult},
    types::DMatrix,
};

/// Cayley-type retraction along the projected gradient.
///
/// [`StiefelRetraction::prepare`] caches everything that depends on the
/// accepted point and gradient, so the backtracking loop only pays for one
/// linear solve per trial step.
pub trait StiefelRetraction: std::fmt::Debug + Send {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Caches the factors built from the current point `b` and gradient `g`.
    fn prepare(&mut self, b: &DMatrix<f64>, g: &DMatrix<f64>);

    /// Point reached from `b` with step size `tau`.
    ///
    /// `iteration` is only used to annotate a singular-system error.
    fn retract(&self, b: &DMatrix<f64>, tau: f64, iteration: usize) -> SolverResult<DMatrix<f64>>;
}

/// Dense form: solves `(I + tau H) B_new = B - tau H B` with `H = A / 2`.
#[derive(Debug, Clone)]
pub struct DenseCayley {
    h: DMatrix<f64>,
    hb: DMatrix<f64>,
}

impl Default for DenseCayley {
    fn default() -> Self {
        Self::new()
    }
}

impl DenseCayley {
    /// Creates an unprepared retraction.
    pub fn new() -> Self {
        Self {
            h: DMatrix::zeros(0, 0),
            hb: DMatrix::zeros(0, 0),
        }
    }
}

impl StiefelRetraction for DenseCayley {
    fn name(&self) -> &str {
        "dense Cayley"
    }

    fn prepare(&mut self, b: &DMatrix<f64>, g: &DMatrix<f64>) {
        let gbt = g * b.transpose();
        self.h = (&gbt - gbt.transpose()) * 0.5;
        self.hb = &self.h * b;
    }

    fn retract(&self, b: &DMatrix<f64>, tau: f64, iteration: usize) -> SolverResult<DMatrix<f64>> {
        let p = self.h.nrows();
        let system = DMatrix::<f64>::identity(p, p) + &self.h * tau;
        let rhs = b - &self.hb * tau;
        system
            .clone()
            .lu()
            .solve(&rhs)
            .ok_or_else(|| SolverError::singular_system(iteration, tau, system))
    }
}

/// Low-rank form: `B_new = B - U (tau * aa)` with
/// `(I + tau/2 V^T U) aa = V^T B`.
#[derive(Debug, Clone)]
pub struct LowRankCayley {
    u: DMatrix<f64>,
    vu: DMatrix<f64>,
    vb: DMatrix<f64>,
}

impl Default for LowRankCayley {
    fn default() -> Self {
        Self::new()
    }
}

impl LowRankCayley {
    /// Creates an unprepared retraction.
    pub fn new() -> Self {
        Self {
            u: DMatrix::zeros(0, 0),
            vu: DMatrix::zeros(0, 0),
            vb: DMatrix::zeros(0, 0),
        }
    }
}

impl StiefelRetraction for LowRankCayley {
    fn name(&self) -> &str {
        "low-rank Cayley"
    }

    fn prepare(&mut self, b: &DMatrix<f64>, g: &DMatrix<f64>) {
        let (p, ndr) = b.shape();
        let mut u = DMatrix::zeros(p, 2 * ndr);
        u.columns_mut(0, ndr).copy_from(g);
        u.columns_mut(ndr, ndr).copy_from(b);
        let mut v = DMatrix::zeros(p, 2 * ndr);
        v.columns_mut(0, ndr).copy_from(b);
        v.columns_mut(ndr, ndr).copy_from(&(-g));

        self.vu = v.transpose() * &u;
        self.vb = v.transpose() * b;
        self.u = u;
    }

    fn retract(&self, b: &DMatrix<f64>, tau: f64, iteration: usize) -> SolverResult<DMatrix<f64>> {
        let m = self.vu.nrows();
        let system = DMatrix::<f64>::identity(m, m) + &self.vu * (0.5 * tau);
        let aa = system
            .clone()
            .lu()
            .solve(&self.vb)
            .ok_or_else(|| SolverError::singular_system(iteration, tau, system))?;
        Ok(b - &self.u * (aa * tau))
    }
}

/// Picks the retraction for a P x ndr problem.
///
/// `Auto` uses the low-rank form when `ndr < P / 2` (integer division).
pub fn select_retraction(kind: RetractionKind, p: usize, ndr: usize) -> Box<dyn StiefelRetraction> {
    let low_rank = match kind {
        RetractionKind::Auto => ndr < p / 2,
        RetractionKind::Dense => false,
        RetractionKind::LowRank => true,
    };
    if low_rank {
        Box::new(LowRankCayley::new())
    } else {
        Box::new(DenseCayley::new())
    }
}
