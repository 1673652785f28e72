//! Column-space utilities: random starting points and subspace distances.

use crate::{
    error::{ObjectiveError, ObjectiveResult},
    types::DMatrix,
};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// How two column spaces are compared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubspaceDistance<'a> {
    /// Frobenius norm of the difference of the orthogonal projections.
    Projection,
    /// trace(P1 P2) / ndr, equal to 1 for identical spaces.
    Trace,
    /// Mean canonical correlation between the projected data `x S1` and
    /// `x S2`, equal to 1 for identical spaces.
    Canonical {
        /// N x P covariates the two bases are applied to.
        x: &'a DMatrix<f64>,
    },
}

/// Random P x ndr matrix with orthonormal columns.
///
/// Draws a standard normal matrix and keeps the Q factor of its QR
/// decomposition.
pub fn random_stiefel_point<R: Rng + ?Sized>(
    p: usize,
    ndr: usize,
    rng: &mut R,
) -> ObjectiveResult<DMatrix<f64>> {
    if ndr == 0 || ndr > p {
        return Err(ObjectiveError::dimension_mismatch(
            format!("1 <= ndr <= {p}"),
            format!("ndr = {ndr}"),
        ));
    }
    let gaussian: DMatrix<f64> = DMatrix::from_fn(p, ndr, |_, _| StandardNormal.sample(rng));
    Ok(gaussian.qr().q().columns(0, ndr).into_owned())
}

/// Orthogonal projection S (S^T S)^{-1} S^T onto the column space of `s`.
pub fn projection_matrix(s: &DMatrix<f64>) -> ObjectiveResult<DMatrix<f64>> {
    let gram = s.transpose() * s;
    let inv = gram
        .cholesky()
        .ok_or_else(|| ObjectiveError::invalid_data("basis matrix does not have full column rank"))?
        .inverse();
    Ok(s * inv * s.transpose())
}

/// Distance between the column spaces of `s1` and `s2`.
pub fn subspace_distance(
    s1: &DMatrix<f64>,
    s2: &DMatrix<f64>,
    kind: SubspaceDistance<'_>,
) -> ObjectiveResult<f64> {
    if s1.nrows() != s2.nrows() {
        return Err(ObjectiveError::dimension_mismatch(
            format!("{} rows", s1.nrows()),
            format!("{} rows", s2.nrows()),
        ));
    }
    if let SubspaceDistance::Canonical { x } = kind {
        return canonical_correlation(x, s1, s2);
    }
    let p1 = projection_matrix(s1)?;
    let p2 = projection_matrix(s2)?;
    Ok(match kind {
        SubspaceDistance::Trace => (p1 * p2).trace() / s1.ncols() as f64,
        _ => (p1 - p2).norm(),
    })
}

// Canonical correlations are the singular values of Q1^T Q2, where Qi is an
// orthonormal basis of the centred projection x Si.
fn canonical_correlation(
    x: &DMatrix<f64>,
    s1: &DMatrix<f64>,
    s2: &DMatrix<f64>,
) -> ObjectiveResult<f64> {
    if x.ncols() != s1.nrows() {
        return Err(ObjectiveError::dimension_mismatch(
            format!("covariates with {} columns", s1.nrows()),
            format!("{} columns", x.ncols()),
        ));
    }
    let q1 = centred_basis(&(x * s1))?;
    let q2 = centred_basis(&(x * s2))?;
    let correlations = (q1.transpose() * q2).svd(false, false).singular_values;
    let count = correlations.len();
    let total: f64 = correlations.iter().map(|c| c.clamp(0.0, 1.0)).sum();
    Ok(total / count as f64)
}

fn centred_basis(projected: &DMatrix<f64>) -> ObjectiveResult<DMatrix<f64>> {
    let (n, d) = projected.shape();
    if n <= d {
        return Err(ObjectiveError::invalid_data(format!(
            "canonical correlation needs more than {d} observations, got {n}"
        )));
    }
    let mut centred = projected.clone();
    for mut column in centred.column_iter_mut() {
        let mean = column.mean();
        column.add_scalar_mut(-mean);
    }
    let qr = centred.qr();
    let r = qr.r();
    let scale = r.diagonal().amax();
    if scale == 0.0 || r.diagonal().iter().any(|v| v.abs() <= 1e-12 * scale) {
        return Err(ObjectiveError::invalid_data(
            "projected data does not have full column rank",
        ));
    }
    Ok(qr.q())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::feasibility;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_random_point_is_orthonormal() {
        let mut rng = StdRng::seed_from_u64(11);
        let b = random_stiefel_point(6, 2, &mut rng).unwrap();
        assert_eq!(b.shape(), (6, 2));
        assert!(feasibility(&b) < 1e-12);
        assert!(random_stiefel_point(2, 3, &mut rng).is_err());
    }

    #[test]
    fn test_distance_ignores_basis_choice() {
        let s1 = DMatrix::from_row_slice(3, 1, &[1.0, 1.0, 0.0]);
        let s2 = DMatrix::from_row_slice(3, 1, &[-2.0, -2.0, 0.0]);
        assert_relative_eq!(
            subspace_distance(&s1, &s2, SubspaceDistance::Projection).unwrap(),
            0.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            subspace_distance(&s1, &s2, SubspaceDistance::Trace).unwrap(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_orthogonal_spaces() {
        let s1 = DMatrix::from_row_slice(3, 1, &[1.0, 0.0, 0.0]);
        let s2 = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 0.0]);
        assert_relative_eq!(
            subspace_distance(&s1, &s2, SubspaceDistance::Projection).unwrap(),
            2f64.sqrt(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            subspace_distance(&s1, &s2, SubspaceDistance::Trace).unwrap(),
            0.0,
            epsilon = 1e-12
        );
    }

    fn design() -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(5);
        DMatrix::from_fn(60, 3, |_, _| StandardNormal.sample(&mut rng))
    }

    #[test]
    fn test_canonical_correlation_of_one_space() {
        let x = design();
        let s1 = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 0.0]);
        let s2 = DMatrix::from_row_slice(3, 1, &[-0.5, -1.0, 0.0]);
        let kind = SubspaceDistance::Canonical { x: &x };
        assert_relative_eq!(subspace_distance(&s1, &s2, kind).unwrap(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_canonical_correlation_is_a_mean() {
        let x = design();
        let s1 = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let s2 = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let rho = subspace_distance(&s1, &s2, SubspaceDistance::Canonical { x: &x }).unwrap();
        // the shared first coordinate gives one correlation of exactly 1
        assert!(rho >= 0.5 - 1e-10 && rho < 1.0, "mean correlation {rho}");
    }

    #[test]
    fn test_canonical_correlation_checks_shapes() {
        let x = design();
        let s = DMatrix::from_row_slice(4, 1, &[1.0, 0.0, 0.0, 0.0]);
        assert!(matches!(
            subspace_distance(&s, &s, SubspaceDistance::Canonical { x: &x }),
            Err(ObjectiveError::DimensionMismatch { .. })
        ));
        let flat = DMatrix::from_row_slice(3, 1, &[0.0, 0.0, 0.0]);
        assert!(subspace_distance(&flat, &flat, SubspaceDistance::Canonical { x: &x }).is_err());
    }

    #[test]
    fn test_rank_deficient_basis() {
        let s1 = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let s2 = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 0.0]);
        assert!(subspace_distance(&s1, &s2, SubspaceDistance::Trace).is_err());
    }
}
