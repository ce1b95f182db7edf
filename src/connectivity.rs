//! Index-based cell connectivity for quadrilateral and hexahedral meshes.
//!
//! Node orderings follow the VTK conventions for the corresponding cell types, so that
//! connectivity can be written to VTK files without any permutation.
use serde::{Deserialize, Serialize};
use std::ops::Deref;

pub trait Connectivity: Clone {
    type FaceConnectivity: Connectivity;

    fn num_faces(&self) -> usize;
    fn get_face_connectivity(&self, index: usize) -> Option<Self::FaceConnectivity>;

    fn vertex_indices(&self) -> &[usize];
}

impl Connectivity for () {
    type FaceConnectivity = ();

    fn num_faces(&self) -> usize {
        0
    }

    fn get_face_connectivity(&self, _index: usize) -> Option<Self::FaceConnectivity> {
        None
    }

    fn vertex_indices(&self) -> &[usize] {
        &[]
    }
}

/// Implements `Connectivity` for a face type, i.e. a connectivity without faces of its own.
macro_rules! impl_face_connectivity {
    ($connectivity:ty) => {
        impl Connectivity for $connectivity {
            type FaceConnectivity = ();

            fn num_faces(&self) -> usize {
                0
            }

            fn get_face_connectivity(&self, _index: usize) -> Option<Self::FaceConnectivity> {
                None
            }

            fn vertex_indices(&self) -> &[usize] {
                &self.0
            }
        }
    };
}

/// Extracts the face with the given local node numbers from a cell's global indices.
fn select<const N: usize>(cell_indices: &[usize], local: &[usize; N]) -> [usize; N] {
    local.map(|i| cell_indices[i])
}

/// A two-node line segment in two dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment2d2Connectivity(pub [usize; 2]);

/// A three-node (quadratic) line segment in two dimensions. The midpoint is stored last.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment3d2Connectivity(pub [usize; 3]);

/// A four-node quadrilateral face in three dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad4d3Connectivity(pub [usize; 4]);

/// A nine-node quadrilateral face in three dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad9d3Connectivity(pub [usize; 9]);

impl_face_connectivity!(Segment2d2Connectivity);
impl_face_connectivity!(Segment3d2Connectivity);
impl_face_connectivity!(Quad4d3Connectivity);
impl_face_connectivity!(Quad9d3Connectivity);

/// Connectivity for a two-dimensional bilinear quadrilateral.
///
/// Vertices are numbered counter-clockwise.
///
/// ```text
/// 3_________2
/// |         |
/// |         |
/// |_________|
/// 0         1
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad4d2Connectivity(pub [usize; 4]);

const QUAD4_FACES: [[usize; 2]; 4] = [[0, 1], [1, 2], [2, 3], [3, 0]];

impl Connectivity for Quad4d2Connectivity {
    type FaceConnectivity = Segment2d2Connectivity;

    fn num_faces(&self) -> usize {
        QUAD4_FACES.len()
    }

    fn get_face_connectivity(&self, index: usize) -> Option<Self::FaceConnectivity> {
        QUAD4_FACES
            .get(index)
            .map(|face| Segment2d2Connectivity(select(&self.0, face)))
    }

    fn vertex_indices(&self) -> &[usize] {
        &self.0
    }
}

/// Connectivity for a two-dimensional biquadratic quadrilateral.
///
/// The element is not completely isoparametric: its geometry is assumed to be that of the
/// bilinear quad formed by the first four nodes.
///
/// ```text
/// 3____6____2
/// |         |
/// 7    8    5
/// |         |
/// 0____4____1
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad9d2Connectivity(pub [usize; 9]);

const QUAD9_FACES: [[usize; 3]; 4] = [[0, 1, 4], [1, 2, 5], [2, 3, 6], [3, 0, 7]];

impl Connectivity for Quad9d2Connectivity {
    type FaceConnectivity = Segment3d2Connectivity;

    fn num_faces(&self) -> usize {
        QUAD9_FACES.len()
    }

    fn get_face_connectivity(&self, index: usize) -> Option<Self::FaceConnectivity> {
        QUAD9_FACES
            .get(index)
            .map(|face| Segment3d2Connectivity(select(&self.0, face)))
    }

    fn vertex_indices(&self) -> &[usize] {
        &self.0
    }
}

impl<'a> From<&'a Quad9d2Connectivity> for Quad4d2Connectivity {
    fn from(quad9: &'a Quad9d2Connectivity) -> Self {
        let Quad9d2Connectivity(indices) = quad9;
        Quad4d2Connectivity([indices[0], indices[1], indices[2], indices[3]])
    }
}

impl Deref for Quad9d2Connectivity {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Connectivity for a trilinear hexahedron.
///
/// The bottom face (`z = -1` in reference coordinates) holds vertices `0..4` in
/// counter-clockwise order seen from above, and vertex `i + 4` sits directly above vertex `i`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hex8Connectivity(pub [usize; 8]);

const HEX8_FACES: [[usize; 4]; 6] = [
    [0, 4, 7, 3],
    [1, 2, 6, 5],
    [0, 1, 5, 4],
    [3, 2, 6, 7],
    [0, 1, 2, 3],
    [4, 5, 6, 7],
];

impl Connectivity for Hex8Connectivity {
    type FaceConnectivity = Quad4d3Connectivity;

    fn num_faces(&self) -> usize {
        HEX8_FACES.len()
    }

    fn get_face_connectivity(&self, index: usize) -> Option<Self::FaceConnectivity> {
        HEX8_FACES
            .get(index)
            .map(|face| Quad4d3Connectivity(select(&self.0, face)))
    }

    fn vertex_indices(&self) -> &[usize] {
        &self.0
    }
}

/// Connectivity for a triquadratic hexahedron.
///
/// Nodes `0..8` are the vertices, ordered as for [`Hex8Connectivity`]. Nodes `8..20` are edge
/// midpoints of the edges `(0, 1), (1, 2), (2, 3), (3, 0)`, `(4, 5), (5, 6), (6, 7), (7, 4)`,
/// `(0, 4), (1, 5), (2, 6), (3, 7)`. Nodes `20..26` are face centers of the faces
/// `x = -1, x = 1, y = -1, y = 1, z = -1, z = 1` and node `26` is the cell center.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hex27Connectivity(pub [usize; 27]);

#[rustfmt::skip]
const HEX27_FACES: [[usize; 9]; 6] = [
    [0, 4, 7, 3, 16, 15, 19, 11, 20],
    [1, 2, 6, 5,  9, 18, 13, 17, 21],
    [0, 1, 5, 4,  8, 17, 12, 16, 22],
    [3, 2, 6, 7, 10, 18, 14, 19, 23],
    [0, 1, 2, 3,  8,  9, 10, 11, 24],
    [4, 5, 6, 7, 12, 13, 14, 15, 25],
];

impl Connectivity for Hex27Connectivity {
    type FaceConnectivity = Quad9d3Connectivity;

    fn num_faces(&self) -> usize {
        HEX27_FACES.len()
    }

    fn get_face_connectivity(&self, index: usize) -> Option<Self::FaceConnectivity> {
        HEX27_FACES
            .get(index)
            .map(|face| Quad9d3Connectivity(select(&self.0, face)))
    }

    fn vertex_indices(&self) -> &[usize] {
        &self.0
    }
}

impl<'a> From<&'a Hex27Connectivity> for Hex8Connectivity {
    fn from(hex27: &'a Hex27Connectivity) -> Self {
        let mut vertices = [0; 8];
        vertices.copy_from_slice(&hex27.0[..8]);
        Hex8Connectivity(vertices)
    }
}
