use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector, Point2, U2};
use nalgebra_sparse::CsrMatrix;
use walldist::assembly::global::CsrAssembler;
use walldist::assembly::local::{ElementAssembler, ElementPoissonAssembler};
use walldist::assembly::AssemblyError;
use walldist::connectivity::Quad4d2Connectivity;
use walldist::mesh::procedural::create_hypercube_quad_mesh_2d;
use walldist::mesh::{Quad9Mesh2d, QuadMesh2d};
use walldist::quadrature::tensor::gauss_tensor;

fn reference_square() -> QuadMesh2d<f64> {
    let vertices = vec![
        Point2::new(-1.0, -1.0),
        Point2::new(1.0, -1.0),
        Point2::new(1.0, 1.0),
        Point2::new(-1.0, 1.0),
    ];
    QuadMesh2d::from_vertices_and_connectivity(vertices, vec![Quad4d2Connectivity([0, 1, 2, 3])])
}

#[test]
fn quad4_element_system_on_reference_square() {
    let mesh = reference_square();
    let quadrature = gauss_tensor::<f64, U2>(2).unwrap();
    let assembler = ElementPoissonAssembler::new(&mesh, quadrature, |_: &Point2<f64>| 1.0);

    let mut matrix = DMatrix::zeros(4, 4);
    let mut vector = DVector::zeros(4);
    assembler
        .assemble_element_system(0, (&mut matrix).into(), (&mut vector).into())
        .unwrap();

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(4, 4, &[
         4.0, -1.0, -2.0, -1.0,
        -1.0,  4.0, -1.0, -2.0,
        -2.0, -1.0,  4.0, -1.0,
        -1.0, -2.0, -1.0,  4.0,
    ]) / 6.0;
    assert_matrix_eq!(matrix, expected, comp = abs, tol = 1e-14);
    assert_matrix_eq!(vector, DVector::repeat(4, 1.0), comp = abs, tol = 1e-14);
}

#[test]
fn element_system_scales_load_with_area() {
    // The 2D stiffness matrix is invariant under uniform scaling, the load is not
    let mesh = create_hypercube_quad_mesh_2d(0.5, 1);
    let quadrature = gauss_tensor::<f64, U2>(2).unwrap();
    let assembler = ElementPoissonAssembler::new(&mesh, quadrature, |_: &Point2<f64>| 2.0);

    let mut matrix = DMatrix::zeros(4, 4);
    let mut vector = DVector::zeros(4);
    assembler
        .assemble_element_system(0, (&mut matrix).into(), (&mut vector).into())
        .unwrap();
    assert_scalar_eq!(matrix[(0, 0)], 4.0 / 6.0, comp = abs, tol = 1e-14);
    assert_matrix_eq!(vector, DVector::repeat(4, 0.5), comp = abs, tol = 1e-14);
}

#[test]
fn assemble_pattern_couples_nodes_sharing_an_element() {
    let mesh = create_hypercube_quad_mesh_2d(1.0, 2);
    let pattern = CsrAssembler::default().assemble_pattern(&mesh);
    assert_eq!(pattern.major_dim(), 9);
    // Corner vertex 0 only couples to the vertices of its single cell
    assert_eq!(pattern.lane(0), &[0, 1, 3, 4]);
    // The center vertex couples to everything
    assert_eq!(pattern.lane(4), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn assembled_quad9_system_is_symmetric_and_consistent() {
    let mesh = Quad9Mesh2d::from(&create_hypercube_quad_mesh_2d(1.0, 4));
    let quadrature = gauss_tensor::<f64, U2>(3).unwrap();
    let assembler = ElementPoissonAssembler::new(&mesh, quadrature, |_: &Point2<f64>| 1.0);
    let system = CsrAssembler::default()
        .with_block_size(3)
        .assemble_system(&assembler)
        .unwrap();

    let dense = DMatrix::from(&system.matrix);
    assert_eq!(dense.nrows(), 81);
    assert_matrix_eq!(dense, dense.transpose(), comp = abs, tol = 1e-13);

    // Constants are in the kernel of the stiffness matrix
    let row_sums = &dense * DVector::repeat(81, 1.0);
    assert!(row_sums.amax() < 1e-12);

    // The load vector integrates f = 1 over [-1, 1]^2
    assert_scalar_eq!(system.rhs.sum(), 4.0, comp = abs, tol = 1e-12);
}

#[test]
fn assembly_is_independent_of_block_size() {
    let mesh = Quad9Mesh2d::from(&create_hypercube_quad_mesh_2d(1.0, 3));
    let quadrature = gauss_tensor::<f64, U2>(3).unwrap();
    let assembler = ElementPoissonAssembler::new(&mesh, quadrature, |x: &Point2<f64>| x.x + 2.0);
    let a = CsrAssembler::default().assemble_system(&assembler).unwrap();
    let b = CsrAssembler::default()
        .with_block_size(1)
        .assemble_system(&assembler)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn assemble_into_csr_rejects_entries_outside_pattern() {
    let mesh = reference_square();
    let quadrature = gauss_tensor::<f64, U2>(2).unwrap();
    let assembler = ElementPoissonAssembler::new(&mesh, quadrature, |_: &Point2<f64>| 1.0);

    let mut matrix = CsrMatrix::<f64>::identity(4);
    let mut rhs = DVector::zeros(4);
    let err = CsrAssembler::default()
        .assemble_into_csr(&mut matrix, &mut rhs, &assembler)
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<AssemblyError>(),
        Some(&AssemblyError::EntryOutsidePattern { row: 0, col: 1 })
    );
}
