//! Dense linear algebra on top of `nalgebra`.

use nalgebra::{
    DMatrix,
    DVector,
    SymmetricEigen,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("matrix is singular")]
    Singular,
    #[error("matrix is not positive semidefinite (smallest eigenvalue {min_eigenvalue})")]
    NotPositiveSemidefinite { min_eigenvalue: f64 },
    #[error("matrix has no positive eigenvalue")]
    Degenerate,
}

/// Symmetric Toeplitz matrix from its first row.
pub fn toeplitz(first_row: &[f64]) -> DMatrix<f64> {
    let n = first_row.len();
    DMatrix::from_fn(n, n, |i, j| first_row[i.abs_diff(j)])
}

/// Symmetric square root `V·diag(√d)·V⁻¹` of a symmetric matrix.
///
/// With `fix_positive` set, the eigenvalues are first divided by the largest
/// one and negative ones are clamped to zero. Without it, negative eigenvalues
/// are an error.
pub fn symmetric_sqrt(matrix: &DMatrix<f64>, fix_positive: bool) -> Result<DMatrix<f64>, Error> {
    let SymmetricEigen {
        eigenvectors,
        mut eigenvalues,
    } = matrix.clone().symmetric_eigen();

    if fix_positive {
        let max = eigenvalues.max();
        if max <= 0.0 {
            return Err(Error::Degenerate);
        }
        eigenvalues.apply(|d| *d = (*d / max).max(0.0));
    }
    else {
        let min_eigenvalue = eigenvalues.min();
        if min_eigenvalue < 0.0 {
            return Err(Error::NotPositiveSemidefinite { min_eigenvalue });
        }
    }

    let inverse = eigenvectors
        .clone()
        .try_inverse()
        .ok_or(Error::Singular)?;
    let root = DMatrix::from_diagonal(&eigenvalues.map(f64::sqrt));

    Ok(eigenvectors * root * inverse)
}

/// Solves `X − AᵀXA = Q` for `X`.
pub fn solve_discrete_lyapunov(a: &DMatrix<f64>, q: &DMatrix<f64>) -> Result<DMatrix<f64>, Error> {
    let n = a.nrows();
    let at = a.transpose();
    // vec(AᵀXA) = (Aᵀ ⊗ Aᵀ) vec(X)
    let system = DMatrix::identity(n * n, n * n) - at.kronecker(&at);
    let rhs = DVector::from_column_slice(q.as_slice());
    let solution = system.lu().solve(&rhs).ok_or(Error::Singular)?;
    let x = DMatrix::from_column_slice(n, n, solution.as_slice());
    Ok((&x + x.transpose()) * 0.5)
}

/// `log det(M)` if `M` is symmetric positive definite.
pub fn log_det_positive_definite(matrix: &DMatrix<f64>) -> Option<f64> {
    let cholesky = matrix.clone().cholesky()?;
    Some(
        2.0 * cholesky
            .l_dirty()
            .diagonal()
            .iter()
            .map(|l| l.ln())
            .sum::<f64>(),
    )
}
