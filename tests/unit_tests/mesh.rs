use nalgebra::{Point2, U2, U3};
use walldist::connectivity::{Connectivity, Quad4d2Connectivity};
use walldist::element::{FiniteElement, ReferenceFiniteElement};
use walldist::mesh::procedural::{create_hypercube_hex_mesh, create_hypercube_mesh, create_hypercube_quad_mesh_2d};
use walldist::mesh::{Hex27Mesh, Quad9Mesh2d, QuadMesh2d};
use walldist::space::{FiniteElementConnectivity, HypercubeDim, LagrangeDegree};

#[test]
fn hypercube_quad_mesh_has_expected_layout() {
    let mesh = create_hypercube_quad_mesh_2d(1.0, 2);
    assert_eq!(mesh.vertices().len(), 9);
    assert_eq!(mesh.connectivity().len(), 4);
    assert_eq!(mesh.vertices()[0], Point2::new(-1.0, -1.0));
    assert_eq!(mesh.vertices()[1], Point2::new(0.0, -1.0));
    assert_eq!(mesh.vertices()[3], Point2::new(-1.0, 0.0));
    assert_eq!(mesh.vertices()[8], Point2::new(1.0, 1.0));
    assert_eq!(mesh.connectivity()[0], Quad4d2Connectivity([0, 1, 4, 3]));
    assert_eq!(mesh.connectivity()[3], Quad4d2Connectivity([4, 5, 8, 7]));
}

#[test]
fn hypercube_quad_mesh_cells_are_counter_clockwise() {
    let mesh = create_hypercube_quad_mesh_2d(0.5, 4);
    for i in 0..mesh.connectivity().len() {
        let element = mesh.get_element(i).unwrap();
        let xi = Point2::origin();
        assert!(element.reference_jacobian(&xi).determinant() > 0.0);
    }
}

#[test]
fn hypercube_mesh_vertices_are_mirror_symmetric() {
    let n = 16;
    let mesh = create_hypercube_quad_mesh_2d(1.0, n);
    let index = |i: usize, j: usize| (n + 1) * j + i;
    for j in 0..=n {
        for i in 0..=n {
            let v = mesh.vertices()[index(i, j)];
            let mirrored = mesh.vertices()[index(n - i, n - j)];
            assert_eq!(v.coords, -mirrored.coords);
        }
    }
}

#[test]
fn quad4_find_boundary_faces() {
    let mesh = create_hypercube_quad_mesh_2d(1.0, 1);
    let boundary_faces = mesh.find_boundary_faces();
    let cells: Vec<_> = boundary_faces.iter().map(|(_, cell, _)| *cell).collect();
    let mut local_indices: Vec<_> = boundary_faces.iter().map(|(_, _, idx)| *idx).collect();
    local_indices.sort();

    assert_eq!(cells, [0, 0, 0, 0]);
    assert_eq!(local_indices, [0, 1, 2, 3]);

    let mesh = create_hypercube_quad_mesh_2d(1.0, 3);
    assert_eq!(mesh.find_boundary_faces().len(), 12);
}

#[test]
fn quad_mesh_boundary_vertices_exclude_interior() {
    let mesh = create_hypercube_quad_mesh_2d(1.0, 2);
    assert_eq!(mesh.find_boundary_vertices(), vec![0, 1, 2, 3, 5, 6, 7, 8]);
}

#[test]
fn hex_mesh_boundary() {
    let mesh = create_hypercube_hex_mesh(1.0, 2);
    assert_eq!(mesh.vertices().len(), 27);
    assert_eq!(mesh.connectivity().len(), 8);
    assert_eq!(mesh.find_boundary_faces().len(), 24);
    let boundary_vertices = mesh.find_boundary_vertices();
    assert_eq!(boundary_vertices.len(), 26);
    assert!(!boundary_vertices.contains(&13));
}

#[test]
fn quad9_find_boundary_vertices() {
    // Single element: corners keep their indices, followed by edge midpoints and the center
    let mesh = Quad9Mesh2d::from(&create_hypercube_quad_mesh_2d(1.0, 1));
    assert_eq!(mesh.vertices().len(), 9);
    assert_eq!(mesh.find_boundary_vertices(), vec![0, 1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn quad9_conversion_shares_nodes_between_cells() {
    let mesh = create_hypercube_mesh::<f64, U2>(1.0, 4).unwrap();
    assert_eq!(mesh.connectivity().len(), 256);
    let quad9_mesh = <U2 as HypercubeDim<f64>>::elevate_degree(&mesh);
    assert_eq!(quad9_mesh.connectivity().len(), 256);
    assert_eq!(quad9_mesh.num_nodes(), 33 * 33);
    assert_eq!(quad9_mesh.find_boundary_vertices().len(), 4 * 32);
    assert_eq!(quad9_mesh.element_node_count(0), 9);

    // Original vertices keep their indices
    assert_eq!(&quad9_mesh.vertices()[..mesh.vertices().len()], mesh.vertices());
}

#[test]
fn quad9_nodes_are_located_at_mapped_reference_nodes() {
    let quad9_mesh = Quad9Mesh2d::from(&create_hypercube_quad_mesh_2d(1.0, 3));
    for (cell_index, cell) in quad9_mesh.connectivity().iter().enumerate() {
        let element = quad9_mesh.get_element(cell_index).unwrap();
        for (local_index, &node) in cell.vertex_indices().iter().enumerate() {
            let x = element.map_reference_coords(&element.reference_node(local_index));
            assert!((quad9_mesh.vertices()[node] - x).norm() < 1e-14);
        }
    }
}

#[test]
fn hex27_conversion_shares_nodes_between_cells() {
    let mesh = create_hypercube_mesh::<f64, U3>(1.0, 1).unwrap();
    let hex27_mesh = Hex27Mesh::from(&mesh);
    assert_eq!(hex27_mesh.connectivity().len(), 8);
    assert_eq!(hex27_mesh.num_nodes(), 5 * 5 * 5);
    assert_eq!(hex27_mesh.find_boundary_vertices().len(), 125 - 27);

    for (cell_index, cell) in hex27_mesh.connectivity().iter().enumerate() {
        let element = hex27_mesh.get_element(cell_index).unwrap();
        for (local_index, &node) in cell.vertex_indices().iter().enumerate() {
            let x = element.map_reference_coords(&element.reference_node(local_index));
            assert!((hex27_mesh.vertices()[node] - x).norm() < 1e-14);
        }
    }
}

#[test]
fn mesh_serialization_roundtrip_preserves_mesh() {
    let mesh: QuadMesh2d<f64> = create_hypercube_quad_mesh_2d(1.0, 2);
    let json = serde_json::to_string(&mesh).unwrap();
    let deserialized: QuadMesh2d<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, mesh);
}

#[test]
fn lagrange_degree_display() {
    assert_eq!(LagrangeDegree::Linear.to_string(), "Q1");
    assert_eq!(LagrangeDegree::Quadratic.to_string(), "Q2");
    assert_eq!(LagrangeDegree::Quadratic.degree(), 2);
}

#[test]
fn hypercube_mesh_rejects_unrepresentable_refinement() {
    assert!(create_hypercube_mesh::<f64, U2>(1.0, 64).is_err());
    assert!(create_hypercube_mesh::<f64, U3>(1.0, usize::MAX).is_err());
}

fn assert_element_nodes_in_range(space: &impl FiniteElementConnectivity) {
    let n = space.num_nodes();
    let mut nodes = Vec::new();
    for element_index in 0..space.num_elements() {
        nodes.resize(space.element_node_count(element_index), usize::MAX);
        space.populate_element_nodes(&mut nodes, element_index);
        assert!(nodes.iter().all(|&node| node < n), "element {} has nodes outside [0, {})", element_index, n);
    }
}

#[test]
fn element_nodes_are_valid_global_indices() {
    let quad4_mesh = create_hypercube_mesh::<f64, U2>(1.0, 3).unwrap();
    let quad9_mesh = <U2 as HypercubeDim<f64>>::elevate_degree(&quad4_mesh);
    let hex8_mesh = create_hypercube_mesh::<f64, U3>(1.0, 2).unwrap();
    let hex27_mesh = <U3 as HypercubeDim<f64>>::elevate_degree(&hex8_mesh);

    assert_element_nodes_in_range(&quad4_mesh);
    assert_element_nodes_in_range(&quad9_mesh);
    assert_element_nodes_in_range(&hex8_mesh);
    assert_element_nodes_in_range(&hex27_mesh);
}
