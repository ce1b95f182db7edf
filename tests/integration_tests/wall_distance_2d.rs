use super::data_output_path;
use matrixcompare::assert_scalar_eq;
use nalgebra::{DVector, Point2, U2};
use walldist::pipeline::WallDistanceProblem;
use walldist::postprocess::WallDistancePostprocessor;
use walldist::settings::{SolverSettings, WallDistanceSettings};
use walldist::space::{HypercubeDim, LagrangeDegree};
use walldist::sparse::cg::{SolveError, SolveErrorKind};

/// Value of the exact solution of `-Δu = 1` on `[-1, 1]^2` at the origin.
const CENTER_VALUE_2D: f64 = 0.2946854;

fn settings(test_name: &str) -> WallDistanceSettings {
    WallDistanceSettings::default().with_output_directory(data_output_path().join(test_name))
}

fn quadratic_problem(test_name: &str) -> WallDistanceProblem<U2> {
    WallDistanceProblem::new(settings(test_name))
}

#[test]
fn default_run_writes_solution_2d() {
    let report = quadratic_problem("default_run_writes_solution_2d")
        .run()
        .unwrap();

    assert_eq!(report.dim, 2);
    assert_eq!(report.num_cells, 256);
    assert_eq!(report.num_dofs, 1089);
    assert_eq!(report.num_constrained_dofs, 128);
    assert!(report.cg_iterations <= 1000);
    assert!(report.residual_norm <= 1e-12);
    assert_eq!(
        report.output_path,
        data_output_path()
            .join("default_run_writes_solution_2d")
            .join("solution-2d.vtk")
    );
    assert!(report.output_path.exists());
}

#[test]
fn setup_system_allocates_zero_system() {
    let problem = quadratic_problem("setup_system_allocates_zero_system");
    let mesh = <U2 as HypercubeDim<f64>>::elevate_degree(&problem.make_grid().unwrap());
    let mut system = problem.setup_system(&mesh).unwrap();
    assert_eq!(system.matrix.nrows(), 1089);
    assert!(system.matrix.values().iter().all(|&v| v == 0.0));
    assert!(system.rhs.iter().all(|&v| v == 0.0));

    let nnz = system.matrix.nnz();
    problem.assemble_system(&mesh, &mut system).unwrap();
    assert_eq!(system.matrix.nnz(), nnz);
    assert!(system.matrix.values().iter().any(|&v| v != 0.0));
}

#[test]
fn solution_matches_reference_center_value() {
    let problem = quadratic_problem("solution_matches_reference_center_value");
    let mesh = <U2 as HypercubeDim<f64>>::elevate_degree(&problem.make_grid().unwrap());
    let solution = problem.solve_on_mesh(mesh).unwrap();
    let field = solution.field();

    let (u0, g0) = field.evaluate_at_point(&Point2::origin()).unwrap();
    assert_scalar_eq!(u0, CENTER_VALUE_2D, comp = abs, tol = 1e-3);
    // The gradient of a single element at a mesh vertex is only accurate to O(h)
    assert!(g0.norm() < 1e-3);

    // The written gradients are averaged over the elements sharing a node, which cancels
    // the one-sided errors at the symmetric center
    let center = solution
        .mesh
        .vertices()
        .iter()
        .position(|x| x.coords.norm() < 1e-12)
        .expect("Mesh should have a vertex at the origin");
    let (values, gradients) = field.nodal_values_and_gradients().unwrap();
    assert_scalar_eq!(values[center], u0, comp = abs, tol = 1e-12);
    assert!(gradients[center].norm() < 1e-8);

    let mut derived = vec![DVector::zeros(4); values.len()];
    WallDistancePostprocessor::<f64>::default()
        .compute_derived_quantities(&values, &gradients, &mut derived)
        .unwrap();
    let s_min = derived[center][2];
    let s_max = derived[center][3];
    assert_scalar_eq!(s_max, (2.0 * u0).sqrt(), comp = abs, tol = 1e-6);
    assert_scalar_eq!(s_min, (2.0 * u0).sqrt(), comp = abs, tol = 1e-6);
    assert!(s_max > 0.7 && s_max <= 1.0);
}

#[test]
fn solution_is_symmetric() {
    let problem = quadratic_problem("solution_is_symmetric");
    let mesh = <U2 as HypercubeDim<f64>>::elevate_degree(&problem.make_grid().unwrap());
    let solution = problem.solve_on_mesh(mesh).unwrap();
    let field = solution.field();

    let (u, _) = field.evaluate_at_point(&Point2::new(0.3, 0.7)).unwrap();
    for x in [Point2::new(-0.3, -0.7), Point2::new(0.7, 0.3), Point2::new(-0.3, 0.7)] {
        let (u_mirrored, _) = field.evaluate_at_point(&x).unwrap();
        assert_scalar_eq!(u, u_mirrored, comp = abs, tol = 1e-8);
    }

    // The solution vanishes on the boundary and is positive inside
    let (u_boundary, _) = field.evaluate_at_point(&Point2::new(1.0, 0.4)).unwrap();
    assert_scalar_eq!(u_boundary, 0.0, comp = abs, tol = 1e-14);
    assert!(u > 0.0);
}

#[test]
fn repeated_solves_are_identical() {
    let problem = quadratic_problem("repeated_solves_are_identical");
    let first = problem
        .solve_on_mesh(<U2 as HypercubeDim<f64>>::elevate_degree(&problem.make_grid().unwrap()))
        .unwrap();
    let second = problem
        .solve_on_mesh(<U2 as HypercubeDim<f64>>::elevate_degree(&problem.make_grid().unwrap()))
        .unwrap();
    assert_eq!(first.solution, second.solution);
    assert_eq!(first.cg_output.num_iterations, second.cg_output.num_iterations);
}

#[test]
fn harmonic_boundary_data_is_reproduced() {
    // u = x - 2y is harmonic and lies in the discrete space, so it is recovered exactly
    let problem = quadratic_problem("harmonic_boundary_data_is_reproduced")
        .with_source(|_| 0.0)
        .with_boundary_values(|x| x.x - 2.0 * x.y);
    let mesh = <U2 as HypercubeDim<f64>>::elevate_degree(&problem.make_grid().unwrap());
    let solution = problem.solve_on_mesh(mesh).unwrap();

    for (x, u) in solution.mesh.vertices().iter().zip(solution.solution.iter()) {
        assert_scalar_eq!(*u, x.x - 2.0 * x.y, comp = abs, tol = 1e-9);
    }
}

#[test]
fn linear_elements_give_coarser_approximation() {
    let problem = WallDistanceProblem::<U2>::new(
        settings("linear_elements_give_coarser_approximation").with_degree(LagrangeDegree::Linear),
    );
    let report = problem.run().unwrap();
    assert_eq!(report.num_dofs, 289);

    let solution = problem.solve_on_mesh(problem.make_grid().unwrap()).unwrap();
    let (u0, _) = solution
        .field()
        .evaluate_at_point(&Point2::origin())
        .unwrap();
    assert_scalar_eq!(u0, CENTER_VALUE_2D, comp = abs, tol = 1e-2);
}

#[test]
fn exceeding_iteration_limit_is_an_error() {
    let solver = SolverSettings {
        max_iterations: 2,
        ..SolverSettings::default()
    };
    let problem = WallDistanceProblem::<U2>::new(settings("exceeding_iteration_limit_is_an_error").with_solver(solver));
    let err = problem.run().unwrap_err();
    let solve_error = err
        .downcast_ref::<SolveError<f64>>()
        .expect("Error should originate in the linear solver");
    assert!(matches!(
        solve_error.kind,
        SolveErrorKind::MaxIterationsReached { max_iter: 2 }
    ));
}

#[test]
fn unrepresentable_refinement_is_an_error() {
    let problem =
        WallDistanceProblem::<U2>::new(settings("unrepresentable_refinement_is_an_error").with_refinements(64));
    assert!(problem.make_grid().is_err());
    assert!(problem.run().is_err());
}
