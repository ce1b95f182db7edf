//! Dirichlet boundary conditions.
use crate::allocators::DimAllocator;
use crate::assembly::AssembledSystem;
use crate::connectivity::Connectivity;
use crate::mesh::Mesh;
use crate::{Real, SmallDim};
use log::debug;
use nalgebra::{DVector, DefaultAllocator, OPoint};
use nalgebra_sparse::CsrMatrix;
use std::collections::BTreeMap;

/// Prescribed values for constrained degrees of freedom, ordered by DOF index.
pub type BoundaryValueMap<T> = BTreeMap<usize, T>;

/// Evaluates `f` at every node that lies on a boundary face of the mesh.
pub fn interpolate_boundary_values<T, D, C, F>(mesh: &Mesh<T, D, C>, f: F) -> BoundaryValueMap<T>
where
    T: Real,
    D: SmallDim,
    C: Connectivity,
    F: Fn(&OPoint<T, D>) -> T,
    DefaultAllocator: DimAllocator<T, D>,
{
    let vertices = mesh.vertices();
    mesh.find_boundary_vertices()
        .into_iter()
        .map(|index| (index, f(&vertices[index])))
        .collect()
}

/// Modifies the system `A x = b` so that its solution satisfies `x_k = v_k` for every
/// constrained DOF `k`, while keeping `A` symmetric.
///
/// For each constrained `k`, the column `k` is moved to the right-hand side
/// (`b_i -= a_ik v_k` for `i ≠ k`), row and column `k` are zeroed, the diagonal entry is set
/// to one and `b_k = v_k`.
///
/// The sparsity pattern of `matrix` must be structurally symmetric, which holds for any
/// pattern built by [`CsrAssembler`](crate::assembly::global::CsrAssembler). This is checked
/// in debug builds only.
///
/// Panics if dimensions are inconsistent, if a constrained index is out of bounds or if
/// the matrix does not store the diagonal entry of a constrained row.
pub fn apply_boundary_values<T: Real>(
    boundary_values: &BoundaryValueMap<T>,
    matrix: &mut CsrMatrix<T>,
    rhs: &mut DVector<T>,
) {
    let n = matrix.nrows();
    assert_eq!(n, matrix.ncols(), "Matrix must be square");
    assert_eq!(n, rhs.len(), "Matrix and right-hand side dimensions must agree");
    debug_assert!(
        matrix.pattern() == &matrix.pattern().transpose(),
        "Sparsity pattern must be structurally symmetric"
    );

    let mut column_indices = Vec::new();
    for (&k, &value) in boundary_values {
        assert!(k < n, "Constrained DOF {} is out of bounds for a system with {} DOFs", k, n);

        // The nonzeros in column k are at the same indices as the nonzeros in row k
        column_indices.clear();
        column_indices.extend_from_slice(matrix.row(k).col_indices());
        for &i in &column_indices {
            if i == k {
                continue;
            }
            let mut row_i = matrix.row_mut(i);
            let (cols_i, values_i) = row_i.cols_and_values_mut();
            if let Ok(idx) = cols_i.binary_search(&k) {
                rhs[i] -= values_i[idx] * value;
                values_i[idx] = T::zero();
            }
        }

        let mut row_k = matrix.row_mut(k);
        let (cols, values) = row_k.cols_and_values_mut();
        let mut has_diagonal = false;
        for (&j, a_kj) in cols.iter().zip(values.iter_mut()) {
            if j == k {
                *a_kj = T::one();
                has_diagonal = true;
            } else {
                *a_kj = T::zero();
            }
        }
        assert!(has_diagonal, "Diagonal entry of constrained row {} is not stored", k);
    }

    // Set the prescribed values last, so that lifting of other constrained
    // columns cannot overwrite them
    for (&k, &value) in boundary_values {
        rhs[k] = value;
    }
}

/// A linear system with boundary conditions applied, ready to be solved.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrainedSystem<T> {
    pub matrix: CsrMatrix<T>,
    pub rhs: DVector<T>,
    /// Zero everywhere except at constrained DOFs, which hold their prescribed values.
    pub initial_guess: DVector<T>,
    pub num_constrained: usize,
}

impl<T: Real> AssembledSystem<T> {
    /// Applies the given boundary values, consuming the assembled system.
    pub fn constrain(self, boundary_values: &BoundaryValueMap<T>) -> ConstrainedSystem<T> {
        let AssembledSystem { mut matrix, mut rhs } = self;
        apply_boundary_values(boundary_values, &mut matrix, &mut rhs);
        let mut initial_guess = DVector::zeros(rhs.len());
        for (&k, &value) in boundary_values {
            initial_guess[k] = value;
        }
        debug!("Constrained {} of {} DOFs", boundary_values.len(), rhs.len());
        ConstrainedSystem {
            matrix,
            rhs,
            initial_guess,
            num_constrained: boundary_values.len(),
        }
    }
}
