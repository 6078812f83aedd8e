//! Symmetric Gauss–Jordan elimination, used both to solve the damped
//! normal equations at each trial step and to invert the final curvature
//! matrix into a covariance.

use nalgebra::DMatrix;

/// The normal equations (or the final curvature matrix) could not be
/// pivoted - the system is singular to working precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingularSystem;

/// Solves `A·X = B` by Gauss–Jordan elimination with partial pivoting,
/// where `B` may have any number of columns. Passing the identity for
/// `B` computes `A⁻¹`. `A` must be square; both matrices are consumed by
/// value since elimination proceeds in place on the augmented system.
pub fn gauss_jordan_solve(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
) -> Result<DMatrix<f64>, SingularSystem> {
    let n = a.nrows();
    assert_eq!(a.ncols(), n, "gauss_jordan_solve requires a square matrix");
    assert_eq!(b.nrows(), n, "gauss_jordan_solve requires matching row counts");

    if n == 0 {
        return Ok(DMatrix::zeros(0, b.ncols()));
    }

    let ncols_b = b.ncols();
    let mut aug = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        // Partial pivoting: find the largest-magnitude entry in this column
        // at or below the diagonal.
        let mut pivot_row = col;
        let mut pivot_val = aug[(col, col)].abs();
        for row in (col + 1)..n {
            let val = aug[(row, col)].abs();
            if val > pivot_val {
                pivot_val = val;
                pivot_row = row;
            }
        }

        if pivot_val < 1e-300 {
            return Err(SingularSystem);
        }

        if pivot_row != col {
            aug.swap_rows(col, pivot_row);
            rhs.swap_rows(col, pivot_row);
        }

        let pivot = aug[(col, col)];
        for k in 0..n {
            aug[(col, k)] /= pivot;
        }
        for k in 0..ncols_b {
            rhs[(col, k)] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                aug[(row, k)] -= factor * aug[(col, k)];
            }
            for k in 0..ncols_b {
                rhs[(row, k)] -= factor * rhs[(col, k)];
            }
        }
    }

    Ok(rhs)
}

/// Solves `A·x = b` for a single right-hand side vector.
pub fn gauss_jordan_solve_vec(
    a: &DMatrix<f64>,
    b: &[f64],
) -> Result<Vec<f64>, SingularSystem> {
    let rhs = DMatrix::from_column_slice(b.len(), 1, b);
    let x = gauss_jordan_solve(a, &rhs)?;
    Ok(x.column(0).iter().copied().collect())
}

/// Inverts a square matrix via Gauss–Jordan elimination.
pub fn gauss_jordan_invert(a: &DMatrix<f64>) -> Result<DMatrix<f64>, SingularSystem> {
    let n = a.nrows();
    gauss_jordan_solve(a, &DMatrix::identity(n, n))
}
