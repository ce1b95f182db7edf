use crate::allocators::DimAllocator;
use crate::connectivity::{Hex27Connectivity, Hex8Connectivity, Quad4d2Connectivity, Quad9d2Connectivity};
use crate::element::{
    reference_point, ElementConnectivity, FiniteElement, HEX27_REFERENCE_NODES, QUAD9_REFERENCE_NODES,
};
use crate::mesh::{Hex27Mesh, HexMesh, Mesh, Quad9Mesh2d, QuadMesh2d};
use crate::{Real, SmallDim};
use nalgebra::DefaultAllocator;
use rustc_hash::FxHashMap;

/// Local vertex indices of the linear cell that each Quad9 node is derived from.
const QUAD9_PARENTS: [&[usize]; 9] = [&[0], &[1], &[2], &[3], &[0, 1], &[1, 2], &[2, 3], &[3, 0], &[0, 1, 2, 3]];

#[rustfmt::skip]
const HEX27_PARENTS: [&[usize]; 27] = [
    &[0], &[1], &[2], &[3], &[4], &[5], &[6], &[7],
    &[0, 1], &[1, 2], &[2, 3], &[3, 0],
    &[4, 5], &[5, 6], &[6, 7], &[7, 4],
    &[0, 4], &[1, 5], &[2, 6], &[3, 7],
    &[0, 3, 4, 7], &[1, 2, 5, 6], &[0, 1, 4, 5], &[2, 3, 6, 7], &[0, 1, 2, 3], &[4, 5, 6, 7],
    &[0, 1, 2, 3, 4, 5, 6, 7],
];

/// Elevates every cell of a linear mesh to a higher-order cell.
///
/// Each higher-order node is identified by the set of (global) linear vertices it derives from,
/// so that nodes on shared edges and faces are created exactly once and the result is
/// conforming. Original vertices keep their indices, and new nodes are numbered in the order
/// they are first encountered.
fn elevate_degree<T, D, C, CNew, const R: usize, const N: usize>(
    mesh: &Mesh<T, D, C>,
    parents: &[&[usize]; N],
    reference_nodes: &[[f64; R]; N],
    new_connectivity: fn([usize; N]) -> CNew,
) -> Mesh<T, D, CNew>
where
    T: Real,
    D: SmallDim,
    C: ElementConnectivity<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let mut vertices = mesh.vertices().to_vec();
    let mut node_map: FxHashMap<Vec<usize>, usize> = FxHashMap::default();
    let mut connectivity = Vec::with_capacity(mesh.connectivity().len());

    for cell in mesh.connectivity() {
        let cell_vertices = cell.vertex_indices();
        let element = cell
            .element(mesh.vertices())
            .expect("Mesh is not allowed to contain cells with indices out of bounds.");

        let mut node_indices = [0; N];
        for ((node_index, local_parents), reference_node) in node_indices.iter_mut().zip(parents).zip(reference_nodes) {
            if let [vertex] = local_parents {
                *node_index = cell_vertices[*vertex];
                continue;
            }

            let mut key: Vec<usize> = local_parents.iter().map(|&i| cell_vertices[i]).collect();
            key.sort_unstable();
            *node_index = *node_map.entry(key).or_insert_with(|| {
                vertices.push(element.map_reference_coords(&reference_point(reference_node)));
                vertices.len() - 1
            });
        }
        connectivity.push(new_connectivity(node_indices));
    }

    Mesh::from_vertices_and_connectivity(vertices, connectivity)
}

impl<'a, T: Real> From<&'a QuadMesh2d<T>> for Quad9Mesh2d<T> {
    fn from(mesh: &'a QuadMesh2d<T>) -> Self {
        elevate_degree::<_, _, Quad4d2Connectivity, _, 2, 9>(
            mesh,
            &QUAD9_PARENTS,
            &QUAD9_REFERENCE_NODES,
            Quad9d2Connectivity,
        )
    }
}

impl<'a, T: Real> From<&'a HexMesh<T>> for Hex27Mesh<T> {
    fn from(mesh: &'a HexMesh<T>) -> Self {
        elevate_degree::<_, _, Hex8Connectivity, _, 3, 27>(
            mesh,
            &HEX27_PARENTS,
            &HEX27_REFERENCE_NODES,
            Hex27Connectivity,
        )
    }
}
