use crate::connectivity::{Quad4d2Connectivity, Quad9d2Connectivity};
use crate::element::{
    isoparametric_jacobian, isoparametric_map, phi_linear_1d, phi_quadratic_1d, populate_tensor_product_basis,
    populate_tensor_product_gradients, reference_point, ElementConnectivity, FiniteElement, ReferenceFiniteElement,
};
use crate::Real;
use itertools::Itertools;
use nalgebra::{distance, Dyn, Matrix2, MatrixViewMut, Point2, Scalar, U2};

pub(crate) const QUAD4_REFERENCE_NODES: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

#[rustfmt::skip]
pub(crate) const QUAD9_REFERENCE_NODES: [[f64; 2]; 9] = [
    [-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0],
    [0.0, -1.0], [1.0, 0.0], [0.0, 1.0], [-1.0, 0.0],
    [0.0, 0.0],
];

/// A bilinear quadrilateral element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Quad4d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 4],
}

impl<T: Scalar> Quad4d2Element<T> {
    pub fn from_vertices(vertices: [Point2<T>; 4]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 4] {
        &self.vertices
    }
}

impl<T: Real> Quad4d2Element<T> {
    /// The reference element `[-1, 1]^2`.
    pub fn reference() -> Self {
        Self::from_vertices(QUAD4_REFERENCE_NODES.map(|node| reference_point(&node)))
    }
}

impl<T: Real> ReferenceFiniteElement<T> for Quad4d2Element<T> {
    type ReferenceDim = U2;

    fn num_nodes(&self) -> usize {
        4
    }

    fn reference_node(&self, local_index: usize) -> Point2<T> {
        reference_point(&QUAD4_REFERENCE_NODES[local_index])
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>) {
        populate_tensor_product_basis(phi_linear_1d, &QUAD4_REFERENCE_NODES, xi.coords.as_slice(), basis_values);
    }

    fn populate_basis_gradients(&self, basis_gradients: MatrixViewMut<T, U2, Dyn>, xi: &Point2<T>) {
        populate_tensor_product_gradients(
            phi_linear_1d,
            &QUAD4_REFERENCE_NODES,
            xi.coords.as_slice(),
            basis_gradients,
        );
    }
}

impl<T: Real> FiniteElement<T> for Quad4d2Element<T> {
    fn reference_jacobian(&self, xi: &Point2<T>) -> Matrix2<T> {
        isoparametric_jacobian(self, &self.vertices, xi)
    }

    fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        isoparametric_map(self, &self.vertices, xi)
    }

    fn diameter(&self) -> T {
        self.vertices
            .iter()
            .tuple_combinations()
            .map(|(a, b)| distance(a, b))
            .fold(T::zero(), |a, b| a.max(b))
    }
}

/// A biquadratic quadrilateral element.
///
/// The geometry is given by the bilinear quadrilateral spanned by the four corner vertices,
/// so edge and center nodes are expected to lie at the midpoints of that quadrilateral.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Quad9d2Element<T>
where
    T: Scalar,
{
    // Needed for the geometric map
    quad: Quad4d2Element<T>,
    vertices: [Point2<T>; 9],
}

impl<T: Scalar> Quad9d2Element<T> {
    pub fn from_vertices(vertices: [Point2<T>; 9]) -> Self {
        let corners = [0, 1, 2, 3].map(|i| vertices[i].clone());
        Self {
            quad: Quad4d2Element::from_vertices(corners),
            vertices,
        }
    }

    pub fn vertices(&self) -> &[Point2<T>; 9] {
        &self.vertices
    }
}

impl<T: Real> Quad9d2Element<T> {
    pub fn reference() -> Self {
        Self::from_vertices(QUAD9_REFERENCE_NODES.map(|node| reference_point(&node)))
    }
}

impl<'a, T: Real> From<&'a Quad4d2Element<T>> for Quad9d2Element<T> {
    fn from(quad4: &'a Quad4d2Element<T>) -> Self {
        let vertices = QUAD9_REFERENCE_NODES.map(|node| quad4.map_reference_coords(&reference_point(&node)));
        Self::from_vertices(vertices)
    }
}

impl<T: Real> ReferenceFiniteElement<T> for Quad9d2Element<T> {
    type ReferenceDim = U2;

    fn num_nodes(&self) -> usize {
        9
    }

    fn reference_node(&self, local_index: usize) -> Point2<T> {
        reference_point(&QUAD9_REFERENCE_NODES[local_index])
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>) {
        populate_tensor_product_basis(phi_quadratic_1d, &QUAD9_REFERENCE_NODES, xi.coords.as_slice(), basis_values);
    }

    fn populate_basis_gradients(&self, basis_gradients: MatrixViewMut<T, U2, Dyn>, xi: &Point2<T>) {
        populate_tensor_product_gradients(
            phi_quadratic_1d,
            &QUAD9_REFERENCE_NODES,
            xi.coords.as_slice(),
            basis_gradients,
        );
    }
}

impl<T: Real> FiniteElement<T> for Quad9d2Element<T> {
    fn reference_jacobian(&self, xi: &Point2<T>) -> Matrix2<T> {
        self.quad.reference_jacobian(xi)
    }

    fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        self.quad.map_reference_coords(xi)
    }

    fn diameter(&self) -> T {
        self.quad.diameter()
    }
}

/// Collects the vertices referenced by `indices`, or `None` if any index is out of bounds.
fn gather_vertices<T: Scalar, const N: usize>(vertices: &[Point2<T>], indices: &[usize; N]) -> Option<[Point2<T>; N]> {
    let mut gathered = Vec::with_capacity(N);
    for &index in indices {
        gathered.push(vertices.get(index)?.clone());
    }
    gathered.try_into().ok()
}

impl<T: Real> ElementConnectivity<T> for Quad4d2Connectivity {
    type Element = Quad4d2Element<T>;
    type ReferenceDim = U2;

    fn element(&self, vertices: &[Point2<T>]) -> Option<Self::Element> {
        gather_vertices(vertices, &self.0).map(Quad4d2Element::from_vertices)
    }
}

impl<T: Real> ElementConnectivity<T> for Quad9d2Connectivity {
    type Element = Quad9d2Element<T>;
    type ReferenceDim = U2;

    fn element(&self, vertices: &[Point2<T>]) -> Option<Self::Element> {
        gather_vertices(vertices, &self.0).map(Quad9d2Element::from_vertices)
    }
}
