//! Evaluation of a finite element solution and its gradient.
use crate::allocators::DimAllocator;
use crate::element::{map_physical_coordinates, FiniteElement, ReferenceFiniteElement};
use crate::space::FiniteElementSpace;
use crate::Real;
use eyre::eyre;
use nalgebra::{convert, DVector, DefaultAllocator, Dyn, OMatrix, OPoint, OVector};

/// A scalar finite element function `u_h = Σ_i u_i φ_i` on a finite element space.
#[derive(Debug)]
pub struct SolutionField<'a, T, Space> {
    space: &'a Space,
    coefficients: &'a DVector<T>,
}

impl<'a, T, Space> SolutionField<'a, T, Space>
where
    T: Real,
    Space: FiniteElementSpace<T>,
    DefaultAllocator: DimAllocator<T, Space::Dim>,
{
    /// Panics if the number of coefficients differs from the number of nodes in the space.
    pub fn new(space: &'a Space, coefficients: &'a DVector<T>) -> Self {
        assert_eq!(
            space.num_nodes(),
            coefficients.len(),
            "Need exactly one coefficient per node"
        );
        Self { space, coefficients }
    }

    pub fn space(&self) -> &'a Space {
        self.space
    }

    pub fn coefficients(&self) -> &'a DVector<T> {
        self.coefficients
    }

    /// Evaluates the value and the physical gradient of the field at the given reference
    /// coordinates of an element.
    pub fn evaluate_in_element(
        &self,
        element_index: usize,
        reference_coords: &OPoint<T, Space::Dim>,
    ) -> eyre::Result<(T, OVector<T, Space::Dim>)> {
        let element = self
            .space
            .element(element_index)
            .ok_or_else(|| eyre!("Element index {} out of bounds", element_index))?;
        let n = element.num_nodes();
        let mut nodes = vec![0; n];
        self.space.populate_element_nodes(&mut nodes, element_index);

        let mut basis_values = vec![T::zero(); n];
        let mut reference_gradients = OMatrix::<T, Space::Dim, Dyn>::zeros(n);
        element.populate_basis(&mut basis_values, reference_coords);
        element.populate_basis_gradients(reference_gradients.columns_mut(0, n), reference_coords);

        let j_inv_t = element
            .reference_jacobian(reference_coords)
            .try_inverse()
            .ok_or_else(|| eyre!("Singular element Jacobian encountered in element {}", element_index))?
            .transpose();

        let mut value = T::zero();
        let mut reference_gradient = OVector::<T, Space::Dim>::zeros();
        for ((&node, &phi), grad) in nodes.iter().zip(&basis_values).zip(reference_gradients.column_iter()) {
            let u_i = self.coefficients[node];
            value += u_i * phi;
            reference_gradient += grad * u_i;
        }

        Ok((value, j_inv_t * reference_gradient))
    }

    /// Evaluates the field at an arbitrary physical point.
    ///
    /// Returns `None` if the point is not contained in any element. On shared element
    /// boundaries the value is taken from the element with the lowest index.
    pub fn evaluate_at_point(&self, x: &OPoint<T, Space::Dim>) -> Option<(T, OVector<T, Space::Dim>)> {
        let tolerance: T = convert(1e-10);
        let bound = T::one() + tolerance;
        (0..self.space.num_elements()).find_map(|element_index| {
            let element = self.space.element(element_index)?;
            let xi = map_physical_coordinates(&element, x)?;
            if xi.coords.iter().all(|&xi_d| xi_d.abs() <= bound) {
                self.evaluate_in_element(element_index, &xi).ok()
            } else {
                None
            }
        })
    }

    /// Values and gradients of the field at every node of the space.
    ///
    /// The gradient of a continuous Lagrange field is discontinuous across elements, so the
    /// gradient at a node is the average of the element gradients at that node over all
    /// elements containing it.
    pub fn nodal_values_and_gradients(&self) -> eyre::Result<(Vec<T>, Vec<OVector<T, Space::Dim>>)> {
        let num_nodes = self.space.num_nodes();
        let mut gradient_sums = vec![OVector::<T, Space::Dim>::zeros(); num_nodes];
        let mut counts = vec![0usize; num_nodes];

        let mut nodes = Vec::new();
        for element_index in 0..self.space.num_elements() {
            let element = self
                .space
                .element(element_index)
                .ok_or_else(|| eyre!("Element index {} out of bounds", element_index))?;
            nodes.resize(self.space.element_node_count(element_index), 0);
            self.space.populate_element_nodes(&mut nodes, element_index);

            for (local_index, &node) in nodes.iter().enumerate() {
                let xi = element.reference_node(local_index);
                let (_, gradient) = self.evaluate_in_element(element_index, &xi)?;
                gradient_sums[node] += gradient;
                counts[node] += 1;
            }
        }

        let values = self.coefficients.iter().copied().collect();
        let gradients = gradient_sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| {
                if count == 0 {
                    sum
                } else {
                    sum / convert::<f64, T>(count as f64)
                }
            })
            .collect();
        Ok((values, gradients))
    }
}
