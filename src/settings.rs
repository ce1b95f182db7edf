//! Configuration of a wall distance computation.
//!
//! The defaults reproduce the reference configuration: the hypercube `[-1, 1]^dim`
//! refined four times, quadratic elements, and a CG solve to an absolute residual of `1e-12`
//! within 1000 iterations. Settings can be deserialized from partial documents; missing
//! fields take their default values.
use crate::postprocess::{DomainViolationPolicy, WallDistancePostprocessor};
use crate::space::LagrangeDegree;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Absolute tolerance on the residual norm `‖b - Ax‖`.
    pub tolerance: f64,
    /// Relaxation factor of the SSOR preconditioner, in `(0, 2)`.
    pub relaxation: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-12,
            relaxation: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostprocessSettings {
    pub negative_tolerance: f64,
    pub policy: DomainViolationPolicy,
}

impl Default for PostprocessSettings {
    fn default() -> Self {
        Self {
            negative_tolerance: 1e-10,
            policy: DomainViolationPolicy::Warn,
        }
    }
}

impl PostprocessSettings {
    pub fn postprocessor(&self) -> WallDistancePostprocessor<f64> {
        WallDistancePostprocessor::new(self.negative_tolerance, self.policy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallDistanceSettings {
    pub half_width: f64,
    pub refinements: usize,
    pub degree: LagrangeDegree,
    /// Gauss points per axis. `None` selects `degree + 1`.
    pub quadrature_points_per_dim: Option<usize>,
    pub solver: SolverSettings,
    pub postprocess: PostprocessSettings,
    pub output_directory: PathBuf,
}

impl Default for WallDistanceSettings {
    fn default() -> Self {
        Self {
            half_width: 1.0,
            refinements: 4,
            degree: LagrangeDegree::Quadratic,
            quadrature_points_per_dim: None,
            solver: SolverSettings::default(),
            postprocess: PostprocessSettings::default(),
            output_directory: PathBuf::from("."),
        }
    }
}

impl WallDistanceSettings {
    pub fn with_half_width(self, half_width: f64) -> Self {
        Self { half_width, ..self }
    }

    pub fn with_refinements(self, refinements: usize) -> Self {
        Self { refinements, ..self }
    }

    pub fn with_degree(self, degree: LagrangeDegree) -> Self {
        Self { degree, ..self }
    }

    pub fn with_quadrature_points_per_dim(self, num_points: usize) -> Self {
        Self {
            quadrature_points_per_dim: Some(num_points),
            ..self
        }
    }

    pub fn with_solver(self, solver: SolverSettings) -> Self {
        Self { solver, ..self }
    }

    pub fn with_postprocess(self, postprocess: PostprocessSettings) -> Self {
        Self { postprocess, ..self }
    }

    pub fn with_output_directory(self, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            output_directory: output_directory.into(),
            ..self
        }
    }

    /// The number of Gauss points per axis used for assembly.
    pub fn effective_quadrature_points_per_dim(&self) -> usize {
        self.quadrature_points_per_dim
            .unwrap_or_else(|| self.degree.degree() + 1)
    }
}
