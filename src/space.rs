//! Finite element spaces: degree-of-freedom enumeration and element access.
//!
//! Every mesh node carries exactly one scalar degree of freedom, so the global index of a
//! node is also the index of its DOF.
use crate::allocators::DimAllocator;
use crate::connectivity::{Connectivity, Hex27Connectivity, Hex8Connectivity, Quad4d2Connectivity, Quad9d2Connectivity};
use crate::element::{ElementConnectivity, FiniteElement};
use crate::io::vtk::VtkCellConnectivity;
use crate::mesh::procedural::{create_hypercube_hex_mesh, create_hypercube_quad_mesh_2d};
use crate::mesh::{Hex27Mesh, Mesh, Quad9Mesh2d};
use crate::{Real, SmallDim};
use nalgebra::{DefaultAllocator, OPoint, U2, U3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Polynomial degree of the continuous Lagrange space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LagrangeDegree {
    Linear,
    Quadratic,
}

impl LagrangeDegree {
    pub fn degree(&self) -> usize {
        match self {
            Self::Linear => 1,
            Self::Quadratic => 2,
        }
    }
}

impl fmt::Display for LagrangeDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.degree())
    }
}

/// Describes the topology of a finite element space: how elements map to global nodes.
pub trait FiniteElementConnectivity {
    fn num_elements(&self) -> usize;

    /// Total number of nodes, i.e. the number of degrees of freedom.
    fn num_nodes(&self) -> usize;

    fn element_node_count(&self, element_index: usize) -> usize;

    /// Writes the global node indices of the given element into `nodes`.
    ///
    /// Panics if the element index is out of bounds or `nodes` has the wrong length.
    fn populate_element_nodes(&self, nodes: &mut [usize], element_index: usize);
}

pub trait FiniteElementSpace<T>: FiniteElementConnectivity
where
    T: Real,
    DefaultAllocator: DimAllocator<T, Self::Dim>,
{
    type Dim: SmallDim;
    type Element: FiniteElement<T, ReferenceDim = Self::Dim>;

    fn vertices(&self) -> &[OPoint<T, Self::Dim>];

    fn element(&self, element_index: usize) -> Option<Self::Element>;
}

impl<T, D, C> FiniteElementConnectivity for Mesh<T, D, C>
where
    T: Real,
    D: SmallDim,
    C: Connectivity,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn num_elements(&self) -> usize {
        self.connectivity().len()
    }

    fn num_nodes(&self) -> usize {
        self.vertices().len()
    }

    fn element_node_count(&self, element_index: usize) -> usize {
        self.connectivity()
            .get(element_index)
            .expect("Element index out of bounds")
            .vertex_indices()
            .len()
    }

    fn populate_element_nodes(&self, nodes: &mut [usize], element_index: usize) {
        let indices = self
            .connectivity()
            .get(element_index)
            .expect("Element index out of bounds")
            .vertex_indices();
        assert_eq!(indices.len(), nodes.len(), "Incompatible slice length for node population");
        nodes.copy_from_slice(indices);
    }
}

impl<T, D, C> FiniteElementSpace<T> for Mesh<T, D, C>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    type Dim = D;
    type Element = C::Element;

    fn vertices(&self) -> &[OPoint<T, D>] {
        Mesh::vertices(self)
    }

    fn element(&self, element_index: usize) -> Option<Self::Element> {
        self.get_element(element_index)
    }
}

/// A dimension for which hypercube meshes with linear and quadratic elements are available.
pub trait HypercubeDim<T>: SmallDim
where
    T: Real,
    DefaultAllocator: DimAllocator<T, Self>,
{
    type LinearConnectivity: ElementConnectivity<T, ReferenceDim = Self> + VtkCellConnectivity + Send + Sync;
    type QuadraticConnectivity: ElementConnectivity<T, ReferenceDim = Self> + VtkCellConnectivity + Send + Sync;

    /// The hypercube `[-h, h]^dim` split into `cells_per_dim` cells along each axis.
    fn create_hypercube_mesh(half_width: T, cells_per_dim: usize) -> Mesh<T, Self, Self::LinearConnectivity>;

    /// Converts a linear mesh into a conforming quadratic mesh on the same cells.
    fn elevate_degree(
        mesh: &Mesh<T, Self, Self::LinearConnectivity>,
    ) -> Mesh<T, Self, Self::QuadraticConnectivity>;
}

impl<T: Real> HypercubeDim<T> for U2 {
    type LinearConnectivity = Quad4d2Connectivity;
    type QuadraticConnectivity = Quad9d2Connectivity;

    fn create_hypercube_mesh(half_width: T, cells_per_dim: usize) -> Mesh<T, U2, Quad4d2Connectivity> {
        create_hypercube_quad_mesh_2d(half_width, cells_per_dim)
    }

    fn elevate_degree(mesh: &Mesh<T, U2, Quad4d2Connectivity>) -> Quad9Mesh2d<T> {
        Quad9Mesh2d::from(mesh)
    }
}

impl<T: Real> HypercubeDim<T> for U3 {
    type LinearConnectivity = Hex8Connectivity;
    type QuadraticConnectivity = Hex27Connectivity;

    fn create_hypercube_mesh(half_width: T, cells_per_dim: usize) -> Mesh<T, U3, Hex8Connectivity> {
        create_hypercube_hex_mesh(half_width, cells_per_dim)
    }

    fn elevate_degree(mesh: &Mesh<T, U3, Hex8Connectivity>) -> Hex27Mesh<T> {
        Hex27Mesh::from(mesh)
    }
}
