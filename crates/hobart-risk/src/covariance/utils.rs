//! Utilities for covariance matrix manipulation
//!
//! Symmetric eigendecomposition by cyclic Jacobi rotations, and spectral
//! repair of matrices that lost positive semidefiniteness to rounding or to
//! pairwise-complete estimation.

use super::CovarianceError;
use ndarray::{Array1, Array2, Axis};

/// Result of eigenvalue decomposition
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues (sorted in descending order)
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors (columns are eigenvectors)
    pub eigenvectors: Array2<f64>,
}

impl EigenDecomposition {
    /// Smallest eigenvalue.
    pub fn min_eigenvalue(&self) -> Option<f64> {
        self.eigenvalues.iter().copied().reduce(f64::min)
    }

    /// Rebuild `V Λ V'` from the decomposition.
    pub fn reconstruct(&self) -> Array2<f64> {
        let scaled = &self.eigenvectors * &self.eigenvalues.view().insert_axis(Axis(0));
        scaled.dot(&self.eigenvectors.t())
    }
}

/// Eigendecomposition of a symmetric matrix using cyclic Jacobi sweeps
///
/// # Arguments
/// * `matrix` - Symmetric matrix to decompose
/// * `max_sweeps` - Maximum number of full sweeps over the upper triangle
/// * `tolerance` - Convergence tolerance for the off-diagonal Frobenius norm
pub fn jacobi_eigendecomp(
    matrix: &Array2<f64>,
    max_sweeps: usize,
    tolerance: f64,
) -> Result<EigenDecomposition, CovarianceError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(CovarianceError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    for _sweep in 0..max_sweeps {
        if off_diagonal_norm(&a) < tolerance {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]].abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let (cos_theta, sin_theta) = compute_rotation(a[[p, p]], a[[q, q]], a[[p, q]]);
                apply_jacobi_rotation(&mut a, &mut v, p, q, cos_theta, sin_theta);
            }
        }
    }

    let eigenvalues = a.diag().to_owned();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&i, &j| eigenvalues[j].total_cmp(&eigenvalues[i]));

    let sorted_eigenvalues = indices.iter().map(|&i| eigenvalues[i]).collect();
    let mut sorted_eigenvectors = Array2::<f64>::zeros((n, n));
    for (new_idx, &old_idx) in indices.iter().enumerate() {
        sorted_eigenvectors
            .column_mut(new_idx)
            .assign(&v.column(old_idx));
    }

    Ok(EigenDecomposition {
        eigenvalues: sorted_eigenvalues,
        eigenvectors: sorted_eigenvectors,
    })
}

fn off_diagonal_norm(matrix: &Array2<f64>) -> f64 {
    let n = matrix.nrows();
    let mut sum = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            sum += 2.0 * matrix[[i, j]] * matrix[[i, j]];
        }
    }
    sum.sqrt()
}

/// Compute the rotation (cos, sin) that annihilates `a[p][q]`
fn compute_rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
    let tau = (aqq - app) / (2.0 * apq);
    let t = if tau >= 0.0 {
        1.0 / (tau + (1.0 + tau * tau).sqrt())
    } else {
        -1.0 / (-tau + (1.0 + tau * tau).sqrt())
    };

    let cos_theta = 1.0 / (1.0 + t * t).sqrt();
    (cos_theta, t * cos_theta)
}

/// Apply a Jacobi rotation to matrix A and eigenvector matrix V
fn apply_jacobi_rotation(
    a: &mut Array2<f64>,
    v: &mut Array2<f64>,
    p: usize,
    q: usize,
    cos_theta: f64,
    sin_theta: f64,
) {
    let n = a.nrows();
    let app = a[[p, p]];
    let aqq = a[[q, q]];
    let apq = a[[p, q]];

    a[[p, p]] = cos_theta * cos_theta * app - 2.0 * cos_theta * sin_theta * apq
        + sin_theta * sin_theta * aqq;
    a[[q, q]] = sin_theta * sin_theta * app
        + 2.0 * cos_theta * sin_theta * apq
        + cos_theta * cos_theta * aqq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for i in 0..n {
        if i != p && i != q {
            let aip = a[[i, p]];
            let aiq = a[[i, q]];

            a[[i, p]] = cos_theta * aip - sin_theta * aiq;
            a[[p, i]] = a[[i, p]];

            a[[i, q]] = sin_theta * aip + cos_theta * aiq;
            a[[q, i]] = a[[i, q]];
        }
    }

    for i in 0..n {
        let vip = v[[i, p]];
        let viq = v[[i, q]];

        v[[i, p]] = cos_theta * vip - sin_theta * viq;
        v[[i, q]] = sin_theta * vip + cos_theta * viq;
    }
}

/// Whether every eigenvalue is at least `-tolerance`.
pub fn is_positive_semidefinite(cov: &Array2<f64>, tolerance: f64) -> bool {
    jacobi_eigendecomp(cov, 64, 1e-14).is_ok_and(|eig| {
        eig.eigenvalues
            .iter()
            .all(|&lambda| lambda >= -tolerance)
    })
}

/// Clip negative eigenvalues to zero and rebuild the matrix.
///
/// Matrices that are already positive semidefinite are returned unchanged.
pub fn clip_to_positive_semidefinite(cov: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
    let eig = jacobi_eigendecomp(cov, 64, 1e-14)?;
    if eig.eigenvalues.iter().all(|&lambda| lambda >= 0.0) {
        return Ok(cov.clone());
    }

    tracing::debug!(
        min_eigenvalue = eig.min_eigenvalue().unwrap_or_default(),
        "repairing covariance matrix"
    );
    let clipped = EigenDecomposition {
        eigenvalues: eig.eigenvalues.mapv(|lambda| lambda.max(0.0)),
        eigenvectors: eig.eigenvectors,
    };
    let fixed = clipped.reconstruct();
    Ok((&fixed + &fixed.t()) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_jacobi_eigendecomp_identity() {
        let eig = jacobi_eigendecomp(&Array2::eye(3), 10, 1e-12).unwrap();
        for &lambda in &eig.eigenvalues {
            assert_relative_eq!(lambda, 1.0);
        }
    }

    #[test]
    fn test_jacobi_eigendecomp_symmetric() {
        let matrix = array![[4.0, 1.0], [1.0, 3.0]];
        let eig = jacobi_eigendecomp(&matrix, 10, 1e-12).unwrap();

        let disc = (0.25_f64 + 1.0).sqrt();
        assert_relative_eq!(eig.eigenvalues[0], 3.5 + disc, epsilon = 1e-10);
        assert_relative_eq!(eig.eigenvalues[1], 3.5 - disc, epsilon = 1e-10);

        let rebuilt = eig.reconstruct();
        for (a, b) in rebuilt.iter().zip(matrix.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_jacobi_rejects_non_square() {
        let result = jacobi_eigendecomp(&Array2::zeros((2, 3)), 10, 1e-12);
        assert!(matches!(result, Err(CovarianceError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_clip_repairs_indefinite_matrix() {
        // Eigenvalues 1.9 and -0.1
        let matrix = array![[0.9, 1.0], [1.0, 0.9]];
        assert!(!is_positive_semidefinite(&matrix, 1e-12));
        let eig = jacobi_eigendecomp(&matrix, 10, 1e-14).unwrap();
        assert_relative_eq!(eig.min_eigenvalue().unwrap(), -0.1, epsilon = 1e-12);

        let fixed = clip_to_positive_semidefinite(&matrix).unwrap();
        assert!(is_positive_semidefinite(&fixed, 1e-12));
        assert_relative_eq!(fixed[[0, 0]], 0.95, epsilon = 1e-10);
        assert_relative_eq!(fixed[[0, 1]], 0.95, epsilon = 1e-10);
        assert_relative_eq!(fixed[[0, 1]], fixed[[1, 0]]);
    }

    #[test]
    fn test_clip_leaves_psd_matrix_alone() {
        let matrix = array![[0.04, 0.01], [0.01, 0.09]];
        assert_eq!(clip_to_positive_semidefinite(&matrix).unwrap(), matrix);
    }
}
