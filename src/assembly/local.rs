use crate::allocators::DimAllocator;
use crate::element::{FiniteElement, ReferenceFiniteElement};
use crate::quadrature::QuadraturePair;
use crate::space::{FiniteElementConnectivity, FiniteElementSpace};
use crate::Real;
use eyre::eyre;
use nalgebra::{DMatrixViewMut, DVectorViewMut, DefaultAllocator, Dyn, OMatrix, OPoint};

/// Computes the dense element contributions to a global linear system.
pub trait ElementAssembler<T: Real>: FiniteElementConnectivity {
    /// Computes the element matrix and vector of the given element.
    ///
    /// Both outputs are overwritten and must be sized according to
    /// [`element_node_count`](FiniteElementConnectivity::element_node_count).
    fn assemble_element_system(
        &self,
        element_index: usize,
        matrix: DMatrixViewMut<T>,
        vector: DVectorViewMut<T>,
    ) -> eyre::Result<()>;
}

/// Element assembler for the Poisson problem `-Δu = f`.
///
/// The element matrix and vector are
///
/// ```text
/// K_ij = Σ_q w_q |det J(ξ_q)| ∇φ_i(x_q) · ∇φ_j(x_q)
/// f_i  = Σ_q w_q |det J(ξ_q)| φ_i(ξ_q) f(x_q)
/// ```
///
/// with physical gradients `∇φ = J^{-T} ∇_ξ φ`.
pub struct ElementPoissonAssembler<'a, T, Space, Source>
where
    T: Real,
    Space: FiniteElementSpace<T>,
    DefaultAllocator: DimAllocator<T, Space::Dim>,
{
    space: &'a Space,
    quadrature: QuadraturePair<T, Space::Dim>,
    source: Source,
}

impl<'a, T, Space, Source> ElementPoissonAssembler<'a, T, Space, Source>
where
    T: Real,
    Space: FiniteElementSpace<T>,
    Source: Fn(&OPoint<T, Space::Dim>) -> T,
    DefaultAllocator: DimAllocator<T, Space::Dim>,
{
    pub fn new(space: &'a Space, quadrature: QuadraturePair<T, Space::Dim>, source: Source) -> Self {
        assert_eq!(
            quadrature.0.len(),
            quadrature.1.len(),
            "Number of quadrature weights must be equal to number of points."
        );
        Self {
            space,
            quadrature,
            source,
        }
    }

    pub fn space(&self) -> &'a Space {
        self.space
    }
}

impl<'a, T, Space, Source> FiniteElementConnectivity for ElementPoissonAssembler<'a, T, Space, Source>
where
    T: Real,
    Space: FiniteElementSpace<T>,
    DefaultAllocator: DimAllocator<T, Space::Dim>,
{
    fn num_elements(&self) -> usize {
        self.space.num_elements()
    }

    fn num_nodes(&self) -> usize {
        self.space.num_nodes()
    }

    fn element_node_count(&self, element_index: usize) -> usize {
        self.space.element_node_count(element_index)
    }

    fn populate_element_nodes(&self, nodes: &mut [usize], element_index: usize) {
        self.space.populate_element_nodes(nodes, element_index)
    }
}

impl<'a, T, Space, Source> ElementAssembler<T> for ElementPoissonAssembler<'a, T, Space, Source>
where
    T: Real,
    Space: FiniteElementSpace<T>,
    Source: Fn(&OPoint<T, Space::Dim>) -> T,
    DefaultAllocator: DimAllocator<T, Space::Dim>,
{
    fn assemble_element_system(
        &self,
        element_index: usize,
        mut matrix: DMatrixViewMut<T>,
        mut vector: DVectorViewMut<T>,
    ) -> eyre::Result<()> {
        let element = self
            .space
            .element(element_index)
            .ok_or_else(|| eyre!("Element index {} out of bounds", element_index))?;
        let n = element.num_nodes();
        assert_eq!(matrix.shape(), (n, n), "Element matrix dimension mismatch");
        assert_eq!(vector.len(), n, "Element vector dimension mismatch");

        matrix.fill(T::zero());
        vector.fill(T::zero());

        let mut basis_values = vec![T::zero(); n];
        let mut reference_gradients = OMatrix::<T, Space::Dim, Dyn>::zeros(n);

        let (weights, points) = &self.quadrature;
        for (&weight, point) in weights.iter().zip(points) {
            let jacobian = element.reference_jacobian(point);
            let j_det = jacobian.determinant();
            let j_inv_t = jacobian
                .try_inverse()
                .ok_or_else(|| eyre!("Singular element Jacobian encountered in element {}", element_index))?
                .transpose();

            element.populate_basis(&mut basis_values, point);
            element.populate_basis_gradients(reference_gradients.columns_mut(0, n), point);
            let gradients = &j_inv_t * &reference_gradients;

            let scale = weight * j_det.abs();
            let f = (self.source)(&element.map_reference_coords(point));
            for i in 0..n {
                vector[i] += scale * f * basis_values[i];
                for j in 0..n {
                    matrix[(i, j)] += scale * gradients.column(i).dot(&gradients.column(j));
                }
            }
        }

        Ok(())
    }
}
