//! Type aliases, numerical constants and small matrix helpers.

pub use nalgebra::{DMatrix, DVector};

/// Numerical constants of the curvilinear search.
pub mod constants {
    /// Lower clamp of the Barzilai-Borwein step size.
    pub const TAU_MIN: f64 = 1e-20;

    /// Upper clamp of the Barzilai-Borwein step size.
    pub const TAU_MAX: f64 = 1e10;

    /// Number of trailing iterations averaged by the convergence test.
    pub const HISTORY_WINDOW: usize = 5;

    /// Backtracking attempts before a candidate is accepted unconditionally.
    pub const MAX_BACKTRACKS: usize = 5;
}

/// Feasibility residual ||B^T B - I||_F of a parameter matrix.
pub fn feasibility(b: &DMatrix<f64>) -> f64 {
    let gram = b.transpose() * b;
    (gram - DMatrix::<f64>::identity(b.ncols(), b.ncols())).norm()
}

/// Sample standard deviation (N - 1 denominator) of each column.
///
/// Matrices with fewer than two rows yield zeros.
pub fn column_std(m: &DMatrix<f64>) -> DVector<f64> {
    let n = m.nrows();
    if n < 2 {
        return DVector::zeros(m.ncols());
    }
    let denom = (n - 1) as f64;
    DVector::from_iterator(
        m.ncols(),
        m.column_iter().map(|col| {
            let mean = col.mean();
            let ss: f64 = col.iter().map(|v| (v - mean) * (v - mean)).sum();
            (ss / denom).sqrt()
        }),
    )
}

/// Elementwise inner product sum(A .* B).
pub fn frobenius_dot(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
