use crate::assembly::local::ElementAssembler;
use crate::assembly::{AssembledSystem, AssemblyError};
use crate::space::FiniteElementConnectivity;
use crate::Real;
use eyre::eyre;
use log::debug;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::collections::BTreeSet;

/// An assembler for CSR matrices.
///
/// Element contributions are computed in parallel, one block of elements at a time, and then
/// merged into the global system sequentially in element order. The result is therefore
/// independent of the number of threads.
#[derive(Debug, Clone)]
pub struct CsrAssembler {
    block_size: usize,
}

impl Default for CsrAssembler {
    fn default() -> Self {
        Self { block_size: 1024 }
    }
}

struct ElementContribution<T> {
    nodes: Vec<usize>,
    matrix: DMatrix<T>,
    vector: DVector<T>,
}

impl CsrAssembler {
    /// Sets the number of elements whose contributions are held in memory at the same time.
    pub fn with_block_size(self, block_size: usize) -> Self {
        assert!(block_size > 0, "Block size must be positive");
        Self { block_size }
    }

    /// Builds the sparsity pattern in which entry `(i, j)` is present if and only if nodes
    /// `i` and `j` share at least one element.
    pub fn assemble_pattern<C>(&self, connectivity: &C) -> SparsityPattern
    where
        C: ?Sized + FiniteElementConnectivity,
    {
        // Collecting into a BTreeSet stores each matrix entry exactly once, already
        // sorted by row and then by column
        let mut matrix_entries = BTreeSet::new();
        let mut element_global_nodes = Vec::new();
        for i in 0..connectivity.num_elements() {
            let element_node_count = connectivity.element_node_count(i);
            element_global_nodes.resize(element_node_count, usize::MAX);
            connectivity.populate_element_nodes(&mut element_global_nodes, i);

            for &node_i in &element_global_nodes {
                for &node_j in &element_global_nodes {
                    matrix_entries.insert((node_i, node_j));
                }
            }
        }

        let num_rows = connectivity.num_nodes();
        let mut offsets = Vec::with_capacity(num_rows + 1);
        let mut column_indices = Vec::with_capacity(matrix_entries.len());

        offsets.push(0);
        for (i, j) in matrix_entries {
            while i + 1 > offsets.len() {
                // This condition indicates that we have reached a new row. We need to run this
                // in a while loop to correctly handle consecutive empty rows
                offsets.push(column_indices.len());
            }
            column_indices.push(j);
        }

        // Make sure we fill out the remaining offsets if the last rows are empty
        while offsets.len() < (num_rows + 1) {
            offsets.push(column_indices.len());
        }

        SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, offsets, column_indices)
            .expect("Offsets and indices built from sorted, unique entries form a valid pattern")
    }

    /// Assembles the global matrix and load vector from the given element assembler.
    pub fn assemble_system<T: Real>(
        &self,
        element_assembler: &(dyn Sync + ElementAssembler<T>),
    ) -> eyre::Result<AssembledSystem<T>> {
        let pattern = self.assemble_pattern(element_assembler);
        let nnz = pattern.nnz();
        let num_rows = pattern.major_dim();
        debug!(
            "Assembling system with {} elements, {} rows and {} non-zeros",
            element_assembler.num_elements(),
            num_rows,
            nnz
        );

        let mut matrix = CsrMatrix::try_from_pattern_and_values(pattern, vec![T::zero(); nnz])
            .map_err(|err| eyre!("Failed to allocate system matrix: {}", err))?;
        let mut rhs = DVector::zeros(num_rows);
        self.assemble_into_csr(&mut matrix, &mut rhs, element_assembler)?;
        Ok(AssembledSystem { matrix, rhs })
    }

    /// Adds element contributions to an existing matrix and vector.
    ///
    /// Fails with [`AssemblyError::EntryOutsidePattern`] if an element couples two nodes
    /// whose entry is not stored in the matrix.
    pub fn assemble_into_csr<T: Real>(
        &self,
        matrix: &mut CsrMatrix<T>,
        rhs: &mut DVector<T>,
        element_assembler: &(dyn Sync + ElementAssembler<T>),
    ) -> eyre::Result<()> {
        assert_eq!(matrix.nrows(), rhs.len(), "Matrix and right-hand side dimensions must agree");
        let num_elements = element_assembler.num_elements();
        let mut block_start = 0;
        while block_start < num_elements {
            let block_end = usize::min(block_start + self.block_size, num_elements);
            let contributions = (block_start..block_end)
                .into_par_iter()
                .map(|element_index| compute_element_contribution(element_assembler, element_index))
                .collect::<eyre::Result<Vec<_>>>()?;

            // Merge strictly in element order
            for contribution in &contributions {
                add_element_contribution(matrix, rhs, contribution)?;
            }
            block_start = block_end;
        }
        Ok(())
    }
}

fn compute_element_contribution<T: Real>(
    element_assembler: &(dyn Sync + ElementAssembler<T>),
    element_index: usize,
) -> eyre::Result<ElementContribution<T>> {
    let n = element_assembler.element_node_count(element_index);
    let mut nodes = vec![usize::MAX; n];
    element_assembler.populate_element_nodes(&mut nodes, element_index);
    let mut matrix = DMatrix::zeros(n, n);
    let mut vector = DVector::zeros(n);
    element_assembler.assemble_element_system(element_index, (&mut matrix).into(), (&mut vector).into())?;
    Ok(ElementContribution { nodes, matrix, vector })
}

fn add_element_contribution<T: Real>(
    matrix: &mut CsrMatrix<T>,
    rhs: &mut DVector<T>,
    contribution: &ElementContribution<T>,
) -> Result<(), AssemblyError> {
    let nodes = &contribution.nodes;
    let num_rows = matrix.nrows();
    for (local_i, &global_i) in nodes.iter().enumerate() {
        if global_i >= num_rows {
            return Err(AssemblyError::EntryOutsidePattern {
                row: global_i,
                col: global_i,
            });
        }
        rhs[global_i] += contribution.vector[local_i];

        let mut row = matrix.row_mut(global_i);
        let (column_indices, values) = row.cols_and_values_mut();
        for (local_j, &global_j) in nodes.iter().enumerate() {
            let idx = column_indices
                .binary_search(&global_j)
                .map_err(|_| AssemblyError::EntryOutsidePattern {
                    row: global_i,
                    col: global_j,
                })?;
            values[idx] += contribution.matrix[(local_i, local_j)];
        }
    }
    Ok(())
}
