//! Iterative solution of sparse symmetric positive definite systems.
//!
//! The solvers operate on anything implementing [`cg::LinearOperator`], which includes
//! dense matrices, [`CsrMatrix`] and the [`ssor::SsorPreconditioner`].
pub mod cg;
pub mod ssor;

pub use nalgebra_sparse::pattern::SparsityPattern;
pub use nalgebra_sparse::CsrMatrix;
