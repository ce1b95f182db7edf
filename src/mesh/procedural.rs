//! Procedural generation of hypercube meshes.
use crate::allocators::DimAllocator;
use crate::connectivity::{Hex8Connectivity, Quad4d2Connectivity};
use crate::mesh::{HexMesh, Mesh, QuadMesh2d};
use crate::space::HypercubeDim;
use crate::Real;
use eyre::eyre;
use nalgebra::{convert, DefaultAllocator, Point2, Point3};

/// Coordinate of the `i`-th of `n + 1` equispaced vertices on `[-h, h]`.
///
/// Computed so that vertex `i` and vertex `n - i` are exact mirror images.
fn vertex_coordinate<T: Real>(half_width: T, i: usize, n: usize) -> T {
    let t = (2.0 * i as f64 - n as f64) / n as f64;
    half_width * convert::<f64, T>(t)
}

/// The square `[-h, h]^2` split into `cells_per_dim × cells_per_dim` quadrilaterals.
///
/// Vertices are numbered with the x-index varying fastest.
pub fn create_hypercube_quad_mesh_2d<T: Real>(half_width: T, cells_per_dim: usize) -> QuadMesh2d<T> {
    assert!(cells_per_dim > 0, "Need at least one cell per dimension");
    assert!(half_width > T::zero(), "Half width must be positive");
    let n = cells_per_dim;
    let to_global_vertex_index = |i: usize, j: usize| (n + 1) * j + i;

    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point2::new(
                vertex_coordinate(half_width, i, n),
                vertex_coordinate(half_width, j, n),
            ));
        }
    }

    let mut cells = Vec::with_capacity(n * n);
    for j in 0..n {
        for i in 0..n {
            cells.push(Quad4d2Connectivity([
                to_global_vertex_index(i, j),
                to_global_vertex_index(i + 1, j),
                to_global_vertex_index(i + 1, j + 1),
                to_global_vertex_index(i, j + 1),
            ]));
        }
    }

    QuadMesh2d::from_vertices_and_connectivity(vertices, cells)
}

/// The cube `[-h, h]^3` split into `cells_per_dim^3` hexahedra.
pub fn create_hypercube_hex_mesh<T: Real>(half_width: T, cells_per_dim: usize) -> HexMesh<T> {
    assert!(cells_per_dim > 0, "Need at least one cell per dimension");
    assert!(half_width > T::zero(), "Half width must be positive");
    let n = cells_per_dim;
    let num_vertices_per_dim = n + 1;
    let to_global_vertex_index =
        |i: usize, j: usize, k: usize| num_vertices_per_dim * num_vertices_per_dim * k + num_vertices_per_dim * j + i;

    let mut vertices = Vec::with_capacity(num_vertices_per_dim.pow(3));
    for k in 0..=n {
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(
                    vertex_coordinate(half_width, i, n),
                    vertex_coordinate(half_width, j, n),
                    vertex_coordinate(half_width, k, n),
                ));
            }
        }
    }

    let mut cells = Vec::with_capacity(n * n * n);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                let idx = &to_global_vertex_index;
                cells.push(Hex8Connectivity([
                    idx(i, j, k),
                    idx(i + 1, j, k),
                    idx(i + 1, j + 1, k),
                    idx(i, j + 1, k),
                    idx(i, j, k + 1),
                    idx(i + 1, j, k + 1),
                    idx(i + 1, j + 1, k + 1),
                    idx(i, j + 1, k + 1),
                ]));
            }
        }
    }

    Mesh::from_vertices_and_connectivity(vertices, cells)
}

/// The hypercube `[-h, h]^D` after `refinements` rounds of uniform refinement of a single
/// cell, i.e. with `2^refinements` cells along each axis.
///
/// Fails if `2^refinements` is not representable as a `usize`.
pub fn create_hypercube_mesh<T, D>(
    half_width: T,
    refinements: usize,
) -> eyre::Result<Mesh<T, D, D::LinearConnectivity>>
where
    T: Real,
    D: HypercubeDim<T>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let cells_per_dim = u32::try_from(refinements)
        .ok()
        .and_then(|refinements| 1usize.checked_shl(refinements))
        .ok_or_else(|| eyre!("Cannot refine the hypercube {} times", refinements))?;
    Ok(D::create_hypercube_mesh(half_width, cells_per_dim))
}
