//! Assembly of the global Poisson system.
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use std::fmt;

pub mod global;
pub mod local;

/// Errors that may occur while merging element contributions into the global system.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssemblyError {
    /// An element attempted to write to an entry that is not part of the sparsity pattern.
    EntryOutsidePattern { row: usize, col: usize },
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntryOutsidePattern { row, col } => {
                write!(f, "Entry ({}, {}) is not part of the sparsity pattern", row, col)
            }
        }
    }
}

impl std::error::Error for AssemblyError {}

/// The assembled linear system `K u = f` before boundary conditions are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSystem<T> {
    pub matrix: CsrMatrix<T>,
    pub rhs: DVector<T>,
}
