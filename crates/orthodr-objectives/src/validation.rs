//! Input checks shared by the data-driven objectives.

use orthodr_core::{
    error::{ObjectiveError, ObjectiveResult},
    types::DMatrix,
};

/// Covariates need at least two observations, one column and finite entries.
pub(crate) fn check_covariates(x: &DMatrix<f64>) -> ObjectiveResult<()> {
    if x.nrows() < 2 || x.ncols() == 0 {
        return Err(ObjectiveError::invalid_data(format!(
            "covariate matrix must be at least 2 x 1, got {} x {}",
            x.nrows(),
            x.ncols()
        )));
    }
    check_finite("covariate matrix", x)
}

pub(crate) fn check_finite(name: &str, m: &DMatrix<f64>) -> ObjectiveResult<()> {
    if m.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ObjectiveError::invalid_data(format!(
            "{name} contains NaN or infinite entries"
        )))
    }
}

pub(crate) fn check_same_rows(name: &str, expected: usize, actual: usize) -> ObjectiveResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ObjectiveError::dimension_mismatch(
            format!("{name} with {expected} rows"),
            format!("{actual} rows"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covariate_checks() {
        assert!(check_covariates(&DMatrix::zeros(3, 2)).is_ok());
        assert!(check_covariates(&DMatrix::zeros(1, 2)).is_err());
        assert!(check_covariates(&DMatrix::zeros(3, 0)).is_err());
        let mut x = DMatrix::zeros(3, 2);
        x[(1, 1)] = f64::NAN;
        assert!(check_covariates(&x).is_err());
    }

    #[test]
    fn test_row_check() {
        assert!(check_same_rows("response", 4, 4).is_ok());
        assert!(check_same_rows("response", 4, 5).is_err());
    }
}
