//! Gaussian kernel weights between projected observations.
//!
//! The objectives project the covariates onto the current directions,
//! rescale every projected column by `sd * bw * sqrt(2)` and then weight each
//! pair of observations by `exp(-||z_i - z_k||^2)`, i.e. a Gaussian kernel
//! with per-direction bandwidth `bw * sd`.
//!
//! [`GaussianKernel::matrix`] has a serial and a pooled code path. Both
//! evaluate every pair with the same arithmetic in the same order, so their
//! outputs are bit-identical.

use crate::{
    error::{ObjectiveError, ObjectiveResult},
    parallel::Executor,
    types::{column_std, DMatrix},
};
use rayon::prelude::*;

/// Projects `x` onto `b` and rescales every column by `sd * bw * sqrt(2)`.
///
/// Columns with zero spread are left unscaled.
pub fn scaled_projection(x: &DMatrix<f64>, b: &DMatrix<f64>, bw: f64) -> DMatrix<f64> {
    let mut bx = x * b;
    let sd = column_std(&bx);
    for (j, mut col) in bx.column_iter_mut().enumerate() {
        let spread = if sd[j] > 0.0 { sd[j] } else { 1.0 };
        col /= spread * bw * std::f64::consts::SQRT_2;
    }
    bx
}

/// Silverman's rule-of-thumb bandwidth for `d` dimensions and `n` observations.
pub fn silverman_bandwidth(d: usize, n: usize) -> f64 {
    let d = d as f64;
    let n = n as f64;
    (4.0 / (d + 2.0)).powf(1.0 / (d + 4.0)) * n.powf(-1.0 / (d + 4.0))
}

/// Gaussian kernel on already scaled points (rows).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianKernel {
    diagonal: f64,
}

impl Default for GaussianKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianKernel {
    /// Kernel whose diagonal is the natural self-weight 1.
    pub fn new() -> Self {
        Self { diagonal: 1.0 }
    }

    /// Kernel with a zero diagonal, for leave-one-out smoothing.
    pub fn leave_one_out() -> Self {
        Self { diagonal: 0.0 }
    }

    /// Kernel with an arbitrary diagonal value.
    pub fn with_diagonal(diagonal: f64) -> Self {
        Self { diagonal }
    }

    /// Value placed on the diagonal of [`GaussianKernel::matrix`].
    pub fn diagonal(&self) -> f64 {
        self.diagonal
    }

    /// Symmetric N x N weight matrix between the rows of `points`.
    pub fn matrix(&self, points: &DMatrix<f64>, exec: &Executor) -> DMatrix<f64> {
        if exec.is_parallel() {
            self.matrix_pooled(points, exec)
        } else {
            self.matrix_serial(points)
        }
    }

    fn matrix_serial(&self, points: &DMatrix<f64>) -> DMatrix<f64> {
        let n = points.nrows();
        let mut kernel = DMatrix::zeros(n, n);
        for i in 0..n {
            kernel[(i, i)] = self.diagonal;
            for k in 0..i {
                let w = pair_weight(points, points, i, k);
                kernel[(i, k)] = w;
                kernel[(k, i)] = w;
            }
        }
        kernel
    }

    // Column k of a symmetric matrix is row k, so each task fills one
    // contiguous column of the column-major buffer.
    fn matrix_pooled(&self, points: &DMatrix<f64>, exec: &Executor) -> DMatrix<f64> {
        let n = points.nrows();
        let mut kernel = DMatrix::zeros(n, n);
        if n == 0 {
            return kernel;
        }
        let diagonal = self.diagonal;
        exec.install(|| {
            kernel
                .as_mut_slice()
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(k, column)| {
                    for (i, slot) in column.iter_mut().enumerate() {
                        *slot = if i == k {
                            diagonal
                        } else {
                            pair_weight(points, points, i.max(k), i.min(k))
                        };
                    }
                });
        });
        kernel
    }

    /// N1 x N2 weights between the rows of `a` and the rows of `b`.
    pub fn cross(
        &self,
        a: &DMatrix<f64>,
        b: &DMatrix<f64>,
        exec: &Executor,
    ) -> ObjectiveResult<DMatrix<f64>> {
        if a.ncols() != b.ncols() {
            return Err(ObjectiveError::dimension_mismatch(
                format!("{} columns", a.ncols()),
                format!("{} columns", b.ncols()),
            ));
        }
        let (n1, n2) = (a.nrows(), b.nrows());
        let mut kernel = DMatrix::zeros(n1, n2);
        if n1 == 0 || n2 == 0 {
            return Ok(kernel);
        }
        let fill = |(k, column): (usize, &mut [f64])| {
            for (i, slot) in column.iter_mut().enumerate() {
                *slot = pair_weight(a, b, i, k);
            }
        };
        if exec.is_parallel() {
            exec.install(|| {
                kernel
                    .as_mut_slice()
                    .par_chunks_mut(n1)
                    .enumerate()
                    .for_each(fill);
            });
        } else {
            kernel.as_mut_slice().chunks_mut(n1).enumerate().for_each(fill);
        }
        Ok(kernel)
    }
}

#[inline]
fn pair_weight(a: &DMatrix<f64>, b: &DMatrix<f64>, i: usize, k: usize) -> f64 {
    let mut dist = 0.0;
    for c in 0..a.ncols() {
        let d = a[(i, c)] - b[(k, c)];
        dist += d * d;
    }
    (-dist).exp()
}

/// Nadaraya-Watson estimate of E[values | point_i] for every row i.
///
/// Rows whose total kernel weight is zero yield a zero estimate.
pub fn nadaraya_watson(kernel: &DMatrix<f64>, values: &DMatrix<f64>) -> DMatrix<f64> {
    let mut estimate = kernel * values;
    for (i, mut row) in estimate.row_iter_mut().enumerate() {
        let total: f64 = kernel.row(i).sum();
        if total > 0.0 {
            row /= total;
        } else {
            row.fill(0.0);
        }
    }
    estimate
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_points() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            5,
            2,
            &[0.0, 0.1, 0.3, -0.2, 1.0, 0.5, -0.7, 0.2, 0.4, 0.9],
        )
    }

    #[test]
    fn test_kernel_values() {
        let pts = sample_points();
        let k = GaussianKernel::new().matrix(&pts, &Executor::serial());
        let expected = (-(0.3f64.powi(2) + 0.3f64.powi(2))).exp();
        assert_relative_eq!(k[(0, 1)], expected, epsilon = 1e-15);
        assert_relative_eq!(k[(1, 0)], expected, epsilon = 1e-15);
        for i in 0..5 {
            assert_eq!(k[(i, i)], 1.0);
        }
    }

    #[test]
    fn test_leave_one_out_diagonal() {
        let k = GaussianKernel::leave_one_out().matrix(&sample_points(), &Executor::serial());
        assert!(k.diagonal().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_pooled_matches_serial() {
        let pts = sample_points();
        let serial = GaussianKernel::new().matrix(&pts, &Executor::serial());
        let pooled = GaussianKernel::new().matrix(&pts, &Executor::exact(3).unwrap());
        assert_eq!(serial, pooled);
    }

    #[test]
    fn test_cross_kernel() {
        let pts = sample_points();
        let other = pts.rows(1, 2).into_owned();
        let full = GaussianKernel::new().matrix(&pts, &Executor::serial());
        let cross = GaussianKernel::new()
            .cross(&pts, &other, &Executor::serial())
            .unwrap();
        assert_eq!(cross.shape(), (5, 2));
        for i in 0..5 {
            assert_relative_eq!(cross[(i, 0)], full[(i, 1)], epsilon = 1e-15);
            assert_relative_eq!(cross[(i, 1)], full[(i, 2)], epsilon = 1e-15);
        }

        let pooled = GaussianKernel::new()
            .cross(&pts, &other, &Executor::exact(2).unwrap())
            .unwrap();
        assert_eq!(cross, pooled);

        let wrong = DMatrix::zeros(2, 3);
        assert!(GaussianKernel::new()
            .cross(&pts, &wrong, &Executor::serial())
            .is_err());
    }

    #[test]
    fn test_scaled_projection_has_fixed_spread() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 2.0, 1.0, 3.0, 0.0, 4.0, 1.0]);
        let b = DMatrix::from_column_slice(2, 1, &[1.0, 0.0]);
        let bw = 0.5;
        let z = scaled_projection(&x, &b, bw);
        let sd = column_std(&z);
        assert_relative_eq!(sd[0], 1.0 / (bw * std::f64::consts::SQRT_2), epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_projection_stays_finite() {
        let x = DMatrix::from_element(3, 2, 1.0);
        let b = DMatrix::from_column_slice(2, 1, &[1.0, 0.0]);
        let z = scaled_projection(&x, &b, 1.0);
        assert!(z.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_nadaraya_watson_guard() {
        let kernel = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 3.0]);
        let values = DMatrix::from_row_slice(2, 1, &[2.0, 6.0]);
        let est = nadaraya_watson(&kernel, &values);
        assert_eq!(est[(0, 0)], 0.0);
        assert_relative_eq!(est[(1, 0)], 5.0);
    }

    proptest::proptest! {
        #[test]
        fn kernel_is_symmetric_and_bounded(
            coords in proptest::collection::vec(-3.0f64..3.0, 2..40),
            diagonal in 0.0f64..1.0,
        ) {
            let n = coords.len() / 2;
            let pts = DMatrix::from_row_slice(n, 2, &coords[..2 * n]);
            let kernel = GaussianKernel::with_diagonal(diagonal);
            let k = kernel.matrix(&pts, &Executor::serial());
            proptest::prop_assert_eq!(&k, &k.transpose());
            proptest::prop_assert!(k.iter().all(|&w| (0.0..=1.0).contains(&w)));
            proptest::prop_assert!(k.diagonal().iter().all(|&d| d == diagonal));
            let pooled = kernel.matrix(&pts, &Executor::exact(2).unwrap());
            proptest::prop_assert_eq!(k, pooled);
        }
    }

    #[test]
    fn test_silverman() {
        assert_relative_eq!(
            silverman_bandwidth(1, 300),
            (4.0f64 / 3.0).powf(0.2) * 300f64.powf(-0.2),
            epsilon = 1e-15
        );
    }
}
