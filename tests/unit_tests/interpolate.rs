use nalgebra::{DVector, Point2, Vector2};
use walldist::interpolate::SolutionField;
use walldist::mesh::procedural::create_hypercube_quad_mesh_2d;
use walldist::mesh::Quad9Mesh2d;

fn quad9_mesh() -> Quad9Mesh2d<f64> {
    Quad9Mesh2d::from(&create_hypercube_quad_mesh_2d(1.0, 3))
}

fn nodal_interpolation(mesh: &Quad9Mesh2d<f64>, f: impl Fn(&Point2<f64>) -> f64) -> DVector<f64> {
    DVector::from_iterator(mesh.vertices().len(), mesh.vertices().iter().map(f))
}

#[test]
fn quadratic_field_is_reproduced_exactly() {
    let mesh = quad9_mesh();
    let coefficients = nodal_interpolation(&mesh, |x| x.x * x.x - x.x * x.y + 3.0);
    let field = SolutionField::new(&mesh, &coefficients);

    for x in [Point2::new(0.1, 0.2), Point2::new(-0.77, 0.5), Point2::new(0.99, -0.99)] {
        let (value, gradient) = field.evaluate_at_point(&x).unwrap();
        assert!((value - (x.x * x.x - x.x * x.y + 3.0)).abs() < 1e-12);
        assert!((gradient - Vector2::new(2.0 * x.x - x.y, -x.x)).norm() < 1e-12);
    }
}

#[test]
fn evaluate_at_point_outside_mesh_returns_none() {
    let mesh = quad9_mesh();
    let coefficients = DVector::zeros(mesh.vertices().len());
    let field = SolutionField::new(&mesh, &coefficients);
    assert!(field.evaluate_at_point(&Point2::new(1.5, 0.0)).is_none());
}

#[test]
fn nodal_gradients_of_polynomial_field_are_exact() {
    let mesh = quad9_mesh();
    let coefficients = nodal_interpolation(&mesh, |x| x.y * x.y + 2.0 * x.x);
    let field = SolutionField::new(&mesh, &coefficients);
    let (values, gradients) = field.nodal_values_and_gradients().unwrap();

    assert_eq!(values.len(), mesh.vertices().len());
    for ((x, value), gradient) in mesh.vertices().iter().zip(&values).zip(&gradients) {
        assert_eq!(*value, x.y * x.y + 2.0 * x.x);
        assert!((gradient - Vector2::new(2.0, 2.0 * x.y)).norm() < 1e-12);
    }
}

#[test]
#[should_panic]
fn solution_field_requires_one_coefficient_per_node() {
    let mesh = quad9_mesh();
    let coefficients = DVector::zeros(3);
    let _ = SolutionField::new(&mesh, &coefficients);
}
