use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector, Point2, U2};
use nalgebra_sparse::CsrMatrix;
use std::collections::BTreeMap;
use walldist::assembly::global::CsrAssembler;
use walldist::assembly::local::ElementPoissonAssembler;
use walldist::assembly::AssembledSystem;
use walldist::boundary::{apply_boundary_values, interpolate_boundary_values};
use walldist::element::ElementConnectivity;
use walldist::mesh::procedural::{create_hypercube_mesh, create_hypercube_quad_mesh_2d};
use walldist::mesh::Mesh;
use walldist::quadrature::tensor::gauss_tensor;
use walldist::space::HypercubeDim;

#[rustfmt::skip]
fn tridiagonal_system() -> AssembledSystem<f64> {
    let dense = DMatrix::from_row_slice(3, 3, &[
         2.0, -1.0,  0.0,
        -1.0,  2.0, -1.0,
         0.0, -1.0,  2.0,
    ]);
    AssembledSystem {
        matrix: CsrMatrix::from(&dense),
        rhs: DVector::repeat(3, 1.0),
    }
}

#[test]
fn interpolate_boundary_values_evaluates_at_boundary_vertices() {
    let mesh = create_hypercube_quad_mesh_2d(1.0, 2);
    let values = interpolate_boundary_values(&mesh, |x: &Point2<f64>| x.x + 2.0 * x.y);
    let keys: Vec<_> = values.keys().copied().collect();
    assert_eq!(keys, vec![0, 1, 2, 3, 5, 6, 7, 8]);
    assert_eq!(values[&0], -3.0);
    assert_eq!(values[&5], 1.0);
    assert_eq!(values[&8], 3.0);
}

#[test]
#[rustfmt::skip]
fn apply_boundary_values_keeps_matrix_symmetric() {
    let AssembledSystem { mut matrix, mut rhs } = tridiagonal_system();
    let boundary_values = BTreeMap::from([(0, 3.0)]);
    apply_boundary_values(&boundary_values, &mut matrix, &mut rhs);

    let expected_matrix = DMatrix::from_row_slice(3, 3, &[
        1.0,  0.0,  0.0,
        0.0,  2.0, -1.0,
        0.0, -1.0,  2.0,
    ]);
    assert_matrix_eq!(DMatrix::from(&matrix), expected_matrix);
    assert_matrix_eq!(rhs, DVector::from_column_slice(&[3.0, 4.0, 1.0]));
}

#[test]
fn constrained_system_solution_satisfies_boundary_values() {
    let boundary_values = BTreeMap::from([(0, 3.0), (2, -1.0)]);
    let constrained = tridiagonal_system().constrain(&boundary_values);
    assert_eq!(constrained.num_constrained, 2);
    assert_matrix_eq!(constrained.initial_guess, DVector::from_column_slice(&[3.0, 0.0, -1.0]));

    let x = DMatrix::from(&constrained.matrix)
        .lu()
        .solve(&constrained.rhs)
        .unwrap();
    // Remaining equation: -3 + 2 x_1 + 1 = 1
    assert_matrix_eq!(x, DVector::from_column_slice(&[3.0, 1.5, -1.0]), comp = abs, tol = 1e-14);
}

#[test]
#[should_panic]
fn apply_boundary_values_panics_on_out_of_bounds_dof() {
    let AssembledSystem { mut matrix, mut rhs } = tridiagonal_system();
    apply_boundary_values(&BTreeMap::from([(3, 0.0)]), &mut matrix, &mut rhs);
}

#[test]
#[should_panic]
fn apply_boundary_values_panics_on_missing_diagonal() {
    let dense = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
    let mut matrix = CsrMatrix::from(&dense);
    let mut rhs = DVector::zeros(2);
    apply_boundary_values(&BTreeMap::from([(0, 1.0)]), &mut matrix, &mut rhs);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic]
fn apply_boundary_values_panics_on_unsymmetric_pattern() {
    let dense = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 2.0]);
    let mut matrix = CsrMatrix::from(&dense);
    let mut rhs = DVector::zeros(2);
    apply_boundary_values(&BTreeMap::from([(0, 1.0)]), &mut matrix, &mut rhs);
}

fn assert_constrained_poisson_system_is_symmetric_with_identity_rows<C>(mesh: &Mesh<f64, U2, C>)
where
    C: ElementConnectivity<f64, ReferenceDim = U2> + Sync,
{
    let quadrature = gauss_tensor::<f64, U2>(3).unwrap();
    let assembler = ElementPoissonAssembler::new(mesh, quadrature, |_: &Point2<f64>| 1.0);
    let system = CsrAssembler::default().assemble_system(&assembler).unwrap();
    let boundary_values = interpolate_boundary_values(mesh, |x: &Point2<f64>| 1.0 + x.x - 2.0 * x.y);
    assert!(!boundary_values.is_empty());

    let constrained = system.constrain(&boundary_values);
    let a = DMatrix::from(&constrained.matrix);
    assert_matrix_eq!(a, a.transpose());

    for (&k, &value) in &boundary_values {
        for i in 0..a.nrows() {
            let expected = if i == k { 1.0 } else { 0.0 };
            assert_eq!(a[(k, i)], expected);
            assert_eq!(a[(i, k)], expected);
        }
        assert_eq!(constrained.rhs[k], value);
        assert_eq!(constrained.initial_guess[k], value);
    }
}

#[test]
fn constrained_q1_system_is_symmetric_with_identity_rows() {
    let mesh = create_hypercube_mesh::<f64, U2>(1.0, 3).unwrap();
    assert_constrained_poisson_system_is_symmetric_with_identity_rows(&mesh);
}

#[test]
fn constrained_q2_system_is_symmetric_with_identity_rows() {
    let mesh = <U2 as HypercubeDim<f64>>::elevate_degree(&create_hypercube_mesh::<f64, U2>(1.0, 2).unwrap());
    assert_constrained_poisson_system_is_symmetric_with_identity_rows(&mesh);
}
