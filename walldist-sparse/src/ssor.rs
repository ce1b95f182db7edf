//! Symmetric successive over-relaxation (SSOR) preconditioning.
use crate::cg::{LinearOperator, OperatorError};
use nalgebra::{DVectorView, DVectorViewMut};
use nalgebra_sparse::CsrMatrix;
use std::fmt;
use walldist_traits::Real;

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PreconditionerError {
    NonSquareMatrix { nrows: usize, ncols: usize },
    MissingDiagonal { row: usize },
    NonPositiveDiagonal { row: usize },
    InvalidRelaxation,
}

impl fmt::Display for PreconditionerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonSquareMatrix { nrows, ncols } => {
                write!(f, "SSOR requires a square matrix, got {}x{}", nrows, ncols)
            }
            Self::MissingDiagonal { row } => {
                write!(f, "Diagonal entry in row {} is not part of the sparsity pattern", row)
            }
            Self::NonPositiveDiagonal { row } => write!(f, "Diagonal entry in row {} is not positive", row),
            Self::InvalidRelaxation => write!(f, "Relaxation factor must lie in the open interval (0, 2)"),
        }
    }
}

impl std::error::Error for PreconditionerError {}

/// SSOR preconditioner for a symmetric matrix `A = L + D + U`.
///
/// Applying the preconditioner computes
///
/// ```text
/// z = (2 - ω)/ω (D/ω + U)^{-1} (D/ω) (D/ω + L)^{-1} r,
/// ```
///
/// that is, a forward sweep followed by a backward sweep over the rows of the matrix. With
/// `ω = 1` this is a symmetric Gauss-Seidel step. The preconditioner borrows the matrix, so
/// it can only be built once the matrix has been fully assembled.
#[derive(Debug, Clone)]
pub struct SsorPreconditioner<'a, T> {
    matrix: &'a CsrMatrix<T>,
    omega: T,
    // Index of the diagonal entry in each row's column indices
    diagonal_offsets: Vec<usize>,
}

impl<'a, T: Real> SsorPreconditioner<'a, T> {
    pub fn new(matrix: &'a CsrMatrix<T>, omega: T) -> Result<Self, PreconditionerError> {
        if matrix.nrows() != matrix.ncols() {
            return Err(PreconditionerError::NonSquareMatrix {
                nrows: matrix.nrows(),
                ncols: matrix.ncols(),
            });
        }
        if !(omega > T::zero() && omega < T::one() + T::one()) {
            return Err(PreconditionerError::InvalidRelaxation);
        }

        let mut diagonal_offsets = Vec::with_capacity(matrix.nrows());
        for (i, row) in matrix.row_iter().enumerate() {
            let offset = row
                .col_indices()
                .binary_search(&i)
                .map_err(|_| PreconditionerError::MissingDiagonal { row: i })?;
            if row.values()[offset] <= T::zero() {
                return Err(PreconditionerError::NonPositiveDiagonal { row: i });
            }
            diagonal_offsets.push(offset);
        }

        Ok(Self {
            matrix,
            omega,
            diagonal_offsets,
        })
    }

    pub fn relaxation(&self) -> T {
        self.omega
    }
}

impl<'a, T: Real> LinearOperator<T> for SsorPreconditioner<'a, T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        let n = self.matrix.nrows();
        if y.len() != n || x.len() != n {
            return Err(format!(
                "SSOR preconditioner of dimension {} applied to vectors of length {} and {}",
                n,
                x.len(),
                y.len()
            )
            .into());
        }

        let omega = self.omega;
        let two = T::one() + T::one();

        // Forward sweep: (D/ω + L) y = x
        for i in 0..n {
            let row = self.matrix.row(i);
            let cols = row.col_indices();
            let values = row.values();
            let diag_offset = self.diagonal_offsets[i];
            let mut sum = x[i];
            for (&j, &a_ij) in cols[..diag_offset].iter().zip(&values[..diag_offset]) {
                sum -= a_ij * y[j];
            }
            y[i] = sum * omega / values[diag_offset];
        }

        // y <- (D/ω) y
        for (i, &diag_offset) in self.diagonal_offsets.iter().enumerate() {
            let a_ii = self.matrix.row(i).values()[diag_offset];
            y[i] *= a_ii / omega;
        }

        // Backward sweep: (D/ω + U) y = y
        for i in (0..n).rev() {
            let row = self.matrix.row(i);
            let cols = row.col_indices();
            let values = row.values();
            let diag_offset = self.diagonal_offsets[i];
            let mut sum = y[i];
            for (&j, &a_ij) in cols[diag_offset + 1..].iter().zip(&values[diag_offset + 1..]) {
                sum -= a_ij * y[j];
            }
            y[i] = sum * omega / values[diag_offset];
        }

        y *= (two - omega) / omega;
        Ok(())
    }
}
