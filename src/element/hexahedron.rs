use crate::connectivity::{Hex27Connectivity, Hex8Connectivity};
use crate::element::{
    isoparametric_jacobian, isoparametric_map, phi_linear_1d, phi_quadratic_1d, populate_tensor_product_basis,
    populate_tensor_product_gradients, reference_point, ElementConnectivity, FiniteElement, ReferenceFiniteElement,
};
use crate::Real;
use itertools::Itertools;
use nalgebra::{distance, Dyn, Matrix3, MatrixViewMut, Point3, Scalar, U3};

#[rustfmt::skip]
pub(crate) const HEX8_REFERENCE_NODES: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0],
];

#[rustfmt::skip]
pub(crate) const HEX27_REFERENCE_NODES: [[f64; 3]; 27] = [
    // Vertices
    [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0],
    // Edge midpoints
    [0.0, -1.0, -1.0], [1.0, 0.0, -1.0], [0.0, 1.0, -1.0], [-1.0, 0.0, -1.0],
    [0.0, -1.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [-1.0, 0.0, 1.0],
    [-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0],
    // Face centers
    [-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0], [0.0, 0.0, 1.0],
    // Cell center
    [0.0, 0.0, 0.0],
];

/// A trilinear hexahedral element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Hex8Element<T: Scalar> {
    vertices: [Point3<T>; 8],
}

impl<T: Scalar> Hex8Element<T> {
    pub fn from_vertices(vertices: [Point3<T>; 8]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 8] {
        &self.vertices
    }
}

impl<T: Real> Hex8Element<T> {
    /// The reference element `[-1, 1]^3`.
    pub fn reference() -> Self {
        Self::from_vertices(HEX8_REFERENCE_NODES.map(|node| reference_point(&node)))
    }
}

impl<T: Real> ReferenceFiniteElement<T> for Hex8Element<T> {
    type ReferenceDim = U3;

    fn num_nodes(&self) -> usize {
        8
    }

    fn reference_node(&self, local_index: usize) -> Point3<T> {
        reference_point(&HEX8_REFERENCE_NODES[local_index])
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point3<T>) {
        populate_tensor_product_basis(phi_linear_1d, &HEX8_REFERENCE_NODES, xi.coords.as_slice(), basis_values);
    }

    fn populate_basis_gradients(&self, basis_gradients: MatrixViewMut<T, U3, Dyn>, xi: &Point3<T>) {
        populate_tensor_product_gradients(phi_linear_1d, &HEX8_REFERENCE_NODES, xi.coords.as_slice(), basis_gradients);
    }
}

impl<T: Real> FiniteElement<T> for Hex8Element<T> {
    fn reference_jacobian(&self, xi: &Point3<T>) -> Matrix3<T> {
        isoparametric_jacobian(self, &self.vertices, xi)
    }

    fn map_reference_coords(&self, xi: &Point3<T>) -> Point3<T> {
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

/// A triquadratic hexahedral element whose geometry is that of its trilinear corner hexahedron.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hex27Element<T: Scalar> {
    hex8: Hex8Element<T>,
    vertices: [Point3<T>; 27],
}

impl<T: Scalar> Hex27Element<T> {
    pub fn from_vertices(vertices: [Point3<T>; 27]) -> Self {
        let corners = [0, 1, 2, 3, 4, 5, 6, 7].map(|i| vertices[i].clone());
        Self {
            hex8: Hex8Element::from_vertices(corners),
            vertices,
        }
    }

    pub fn vertices(&self) -> &[Point3<T>; 27] {
        &self.vertices
    }
}

impl<T: Real> Hex27Element<T> {
    pub fn reference() -> Self {
        Self::from_vertices(HEX27_REFERENCE_NODES.map(|node| reference_point(&node)))
    }
}

impl<'a, T: Real> From<&'a Hex8Element<T>> for Hex27Element<T> {
    fn from(hex8: &'a Hex8Element<T>) -> Self {
        let vertices = HEX27_REFERENCE_NODES.map(|node| hex8.map_reference_coords(&reference_point(&node)));
        Self::from_vertices(vertices)
    }
}

impl<T: Real> ReferenceFiniteElement<T> for Hex27Element<T> {
    type ReferenceDim = U3;

    fn num_nodes(&self) -> usize {
        27
    }

    fn reference_node(&self, local_index: usize) -> Point3<T> {
        reference_point(&HEX27_REFERENCE_NODES[local_index])
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point3<T>) {
        populate_tensor_product_basis(phi_quadratic_1d, &HEX27_REFERENCE_NODES, xi.coords.as_slice(), basis_values);
    }

    fn populate_basis_gradients(&self, basis_gradients: MatrixViewMut<T, U3, Dyn>, xi: &Point3<T>) {
        populate_tensor_product_gradients(
            phi_quadratic_1d,
            &HEX27_REFERENCE_NODES,
            xi.coords.as_slice(),
            basis_gradients,
        );
    }
}

impl<T: Real> FiniteElement<T> for Hex27Element<T> {
    fn reference_jacobian(&self, xi: &Point3<T>) -> Matrix3<T> {
        self.hex8.reference_jacobian(xi)
    }

    fn map_reference_coords(&self, xi: &Point3<T>) -> Point3<T> {
        self.hex8.map_reference_coords(xi)
    }

    fn diameter(&self) -> T {
        self.hex8.diameter()
    }
}

fn gather_vertices<T: Scalar, const N: usize>(vertices: &[Point3<T>], indices: &[usize; N]) -> Option<[Point3<T>; N]> {
    let mut gathered = Vec::with_capacity(N);
    for &index in indices {
        gathered.push(vertices.get(index)?.clone());
    }
    gathered.try_into().ok()
}

impl<T: Real> ElementConnectivity<T> for Hex8Connectivity {
    type Element = Hex8Element<T>;
    type ReferenceDim = U3;

    fn element(&self, vertices: &[Point3<T>]) -> Option<Self::Element> {
        gather_vertices(vertices, &self.0).map(Hex8Element::from_vertices)
    }
}

impl<T: Real> ElementConnectivity<T> for Hex27Connectivity {
    type Element = Hex27Element<T>;
    type ReferenceDim = U3;

    fn element(&self, vertices: &[Point3<T>]) -> Option<Self::Element> {
        gather_vertices(vertices, &self.0).map(Hex27Element::from_vertices)
    }
}
