use crate::allocators::DimAllocator;
use crate::connectivity::{Connectivity, Hex27Connectivity, Hex8Connectivity, Quad4d2Connectivity, Quad9d2Connectivity};
use crate::element::ElementConnectivity;
use crate::{Real, SmallDim};
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint, Scalar, U2, U3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod procedural;

/// Index-based data structure for conforming meshes (i.e. no hanging nodes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Mesh<T: Scalar, D, Connectivity>
where
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    // serde's not able correctly determine the necessary trait bounds in this case,
    // so write our own
    #[serde(bound(
        serialize = "<DefaultAllocator as Allocator<T, D>>::Buffer: Serialize",
        deserialize = "<DefaultAllocator as Allocator<T, D>>::Buffer: Deserialize<'de>"
    ))]
    vertices: Vec<OPoint<T, D>>,
    #[serde(bound(
        serialize = "Connectivity: Serialize",
        deserialize = "Connectivity: Deserialize<'de>"
    ))]
    connectivity: Vec<Connectivity>,
}

pub type Mesh2d<T, Connectivity> = Mesh<T, U2, Connectivity>;
pub type Mesh3d<T, Connectivity> = Mesh<T, U3, Connectivity>;

pub type QuadMesh2d<T> = Mesh2d<T, Quad4d2Connectivity>;
pub type Quad9Mesh2d<T> = Mesh2d<T, Quad9d2Connectivity>;
pub type HexMesh<T> = Mesh3d<T, Hex8Connectivity>;
pub type Hex27Mesh<T> = Mesh3d<T, Hex27Connectivity>;

impl<T, D, Connectivity> Mesh<T, D, Connectivity>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    pub fn vertices(&self) -> &[OPoint<T, D>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Connectivity] {
        &self.connectivity
    }

    /// Construct a mesh from vertices and connectivity.
    ///
    /// The connectivity is expected to only reference in-bounds vertex indices. Users of the
    /// mesh are permitted to panic if they encounter invalid indices.
    pub fn from_vertices_and_connectivity(vertices: Vec<OPoint<T, D>>, connectivity: Vec<Connectivity>) -> Self {
        Self { vertices, connectivity }
    }
}

impl<T, D, C> Mesh<T, D, C>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    pub fn get_element(&self, index: usize) -> Option<C::Element> {
        self.connectivity
            .get(index)
            .and_then(|conn| conn.element(&self.vertices))
    }
}

impl<T, D, C> Mesh<T, D, C>
where
    T: Scalar,
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<T, D>,
{
    /// Finds faces which are only connected to exactly one cell, along with the connected cell
    /// index and the local index of the face within that cell.
    ///
    /// Faces are returned in the order of their sorted vertex indices.
    pub fn find_boundary_faces(&self) -> Vec<(C::FaceConnectivity, usize, usize)> {
        // Count the number of occurrences of "equivalent" faces (in the sense that they refer
        // to the same vertex indices). Use a BTreeMap to avoid non-determinism due to
        // HashMap's internal randomization.
        let mut face_counts: BTreeMap<Vec<usize>, (C::FaceConnectivity, usize, usize, usize)> = BTreeMap::new();
        for (cell_index, cell_conn) in self.connectivity.iter().enumerate() {
            for local_index in 0..cell_conn.num_faces() {
                let face_conn = cell_conn
                    .get_face_connectivity(local_index)
                    .expect("Local face index is within num_faces()");
                let mut key = face_conn.vertex_indices().to_vec();
                key.sort_unstable();
                face_counts
                    .entry(key)
                    .and_modify(|(_, _, _, count)| *count += 1)
                    .or_insert((face_conn, cell_index, local_index, 1));
            }
        }

        face_counts
            .into_values()
            .filter(|&(_, _, _, count)| count == 1)
            .map(|(face, cell_index, local_index, _)| (face, cell_index, local_index))
            .collect()
    }

    /// Returns a sorted list of vertices that are determined to be on the boundary.
    ///
    /// A vertex is considered to be a part of the boundary if it belongs to a boundary face.
    pub fn find_boundary_vertices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for (connectivity, _, _) in self.find_boundary_faces() {
            indices.extend_from_slice(connectivity.vertex_indices());
        }
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
