use std::path::PathBuf;
use walldist::postprocess::DomainViolationPolicy;
use walldist::settings::{SolverSettings, WallDistanceSettings};
use walldist::space::LagrangeDegree;

#[test]
fn default_settings_match_reference_configuration() {
    let settings = WallDistanceSettings::default();
    assert_eq!(settings.half_width, 1.0);
    assert_eq!(settings.refinements, 4);
    assert_eq!(settings.degree, LagrangeDegree::Quadratic);
    assert_eq!(settings.solver.max_iterations, 1000);
    assert_eq!(settings.solver.tolerance, 1e-12);
    assert_eq!(settings.solver.relaxation, 1.0);
    assert_eq!(settings.postprocess.policy, DomainViolationPolicy::Warn);
    assert_eq!(settings.effective_quadrature_points_per_dim(), 3);
}

#[test]
fn partial_settings_take_defaults_for_missing_fields() {
    let json = r#"{
        "refinements": 2,
        "degree": "Linear",
        "solver": { "tolerance": 1e-8 },
        "postprocess": { "policy": "Reject" }
    }"#;
    let settings: WallDistanceSettings = serde_json::from_str(json).unwrap();
    assert_eq!(settings.refinements, 2);
    assert_eq!(settings.degree, LagrangeDegree::Linear);
    assert_eq!(settings.half_width, 1.0);
    assert_eq!(
        settings.solver,
        SolverSettings {
            tolerance: 1e-8,
            ..SolverSettings::default()
        }
    );
    assert_eq!(settings.postprocess.policy, DomainViolationPolicy::Reject);
    assert_eq!(settings.postprocess.negative_tolerance, 1e-10);
    assert_eq!(settings.effective_quadrature_points_per_dim(), 2);
}

#[test]
fn builder_methods_override_fields() {
    let settings = WallDistanceSettings::default()
        .with_half_width(2.0)
        .with_refinements(1)
        .with_degree(LagrangeDegree::Linear)
        .with_quadrature_points_per_dim(4)
        .with_output_directory("out");
    assert_eq!(settings.half_width, 2.0);
    assert_eq!(settings.refinements, 1);
    assert_eq!(settings.effective_quadrature_points_per_dim(), 4);
    assert_eq!(settings.output_directory, PathBuf::from("out"));
}

#[test]
fn settings_roundtrip_through_json() {
    let settings = WallDistanceSettings::default().with_refinements(3);
    let json = serde_json::to_string(&settings).unwrap();
    let deserialized: WallDistanceSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, settings);
}
