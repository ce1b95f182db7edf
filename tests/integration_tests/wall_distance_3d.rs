use super::data_output_path;
use matrixcompare::assert_scalar_eq;
use nalgebra::{Point3, U3};
use walldist::pipeline::WallDistanceProblem;
use walldist::settings::WallDistanceSettings;
use walldist::space::HypercubeDim;

fn problem(test_name: &str) -> WallDistanceProblem<U3> {
    let settings = WallDistanceSettings::default()
        .with_refinements(2)
        .with_output_directory(data_output_path().join(test_name));
    WallDistanceProblem::new(settings)
}

#[test]
fn run_writes_solution_3d() {
    let report = problem("run_writes_solution_3d").run().unwrap();
    assert_eq!(report.dim, 3);
    assert_eq!(report.num_cells, 64);
    assert_eq!(report.num_dofs, 9 * 9 * 9);
    assert_eq!(report.num_constrained_dofs, 9 * 9 * 9 - 7 * 7 * 7);
    assert!(report.residual_norm <= 1e-12);
    assert!(report.output_path.ends_with("solution-3d.vtk"));
    assert!(report.output_path.exists());
}

#[test]
fn center_value_and_symmetry_3d() {
    let problem = problem("center_value_and_symmetry_3d");
    let mesh = <U3 as HypercubeDim<f64>>::elevate_degree(&problem.make_grid().unwrap());
    let solution = problem.solve_on_mesh(mesh).unwrap();
    let field = solution.field();

    let (u0, _) = field.evaluate_at_point(&Point3::origin()).unwrap();
    assert!(u0 > 0.2 && u0 < 0.25, "u(0) = {}", u0);

    let (u, _) = field.evaluate_at_point(&Point3::new(0.2, -0.5, 0.6)).unwrap();
    for x in [Point3::new(-0.2, 0.5, -0.6), Point3::new(0.6, 0.2, -0.5), Point3::new(-0.5, 0.6, 0.2)] {
        let (u_mirrored, _) = field.evaluate_at_point(&x).unwrap();
        assert_scalar_eq!(u, u_mirrored, comp = abs, tol = 1e-8);
    }
}
