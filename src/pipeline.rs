//! End-to-end wall distance computation on a hypercube.
use crate::allocators::DimAllocator;
use crate::assembly::global::CsrAssembler;
use crate::assembly::local::ElementPoissonAssembler;
use crate::assembly::AssembledSystem;
use crate::boundary::{interpolate_boundary_values, BoundaryValueMap};
use crate::element::ElementConnectivity;
use crate::interpolate::SolutionField;
use crate::io::vtk::{VtkCellConnectivity, WallDistanceOutput};
use crate::mesh::procedural::create_hypercube_mesh;
use crate::mesh::Mesh;
use crate::quadrature::tensor::gauss_tensor;
use crate::settings::WallDistanceSettings;
use crate::space::{FiniteElementConnectivity, HypercubeDim, LagrangeDegree};
use eyre::{eyre, WrapErr};
use log::{info, warn};
use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DefaultAllocator, OPoint};
use nalgebra_sparse::CsrMatrix;
use std::path::PathBuf;
use std::sync::Arc;
use walldist_sparse::cg::{AbsoluteResidualCriterion, CgOutput, ConjugateGradient};
use walldist_sparse::ssor::SsorPreconditioner;

/// A scalar function of position, such as a source term or boundary data.
pub type ScalarFunction<D> = Arc<dyn Fn(&OPoint<f64, D>) -> f64 + Send + Sync>;

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct WallDistanceReport {
    pub dim: usize,
    pub num_cells: usize,
    pub num_dofs: usize,
    pub num_constrained_dofs: usize,
    pub cg_iterations: usize,
    /// The true residual norm `‖b - Ax‖` of the returned solution.
    pub residual_norm: f64,
    /// Number of output points whose square root argument was negative beyond tolerance.
    pub num_flagged_points: usize,
    pub output_path: PathBuf,
}

/// A solved Poisson problem on a particular mesh.
#[derive(Debug)]
pub struct WallDistanceSolution<D, C>
where
    D: HypercubeDim<f64>,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub mesh: Mesh<f64, D, C>,
    pub solution: DVector<f64>,
    pub cg_output: CgOutput<f64>,
    pub residual_norm: f64,
    pub num_constrained_dofs: usize,
}

impl<D, C> WallDistanceSolution<D, C>
where
    D: HypercubeDim<f64>,
    C: ElementConnectivity<f64, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub fn field(&self) -> SolutionField<f64, Mesh<f64, D, C>> {
        SolutionField::new(&self.mesh, &self.solution)
    }
}

/// The Poisson wall distance problem `-Δφ = f` in `[-h, h]^D` with `φ = g` on the boundary.
///
/// The computation runs in the phases [`make_grid`](Self::make_grid),
/// [`setup_system`](Self::setup_system), [`assemble_system`](Self::assemble_system),
/// [`solve`](Self::solve) and [`output_results`](Self::output_results), each consuming the
/// output of the previous one. [`run`](Self::run) executes all of them.
pub struct WallDistanceProblem<D>
where
    D: HypercubeDim<f64>,
    DefaultAllocator: DimAllocator<f64, D>,
{
    settings: WallDistanceSettings,
    source: ScalarFunction<D>,
    boundary_values: ScalarFunction<D>,
}

impl<D> WallDistanceProblem<D>
where
    D: HypercubeDim<f64>,
    DefaultAllocator: DimAllocator<f64, D>,
    <DefaultAllocator as Allocator<f64, D>>::Buffer: Sync,
{
    /// A problem with unit source and homogeneous boundary data.
    pub fn new(settings: WallDistanceSettings) -> Self {
        Self {
            settings,
            source: Arc::new(|_: &OPoint<f64, D>| 1.0),
            boundary_values: Arc::new(|_: &OPoint<f64, D>| 0.0),
        }
    }

    pub fn with_source(self, source: impl Fn(&OPoint<f64, D>) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            source: Arc::new(source),
            ..self
        }
    }

    pub fn with_boundary_values(
        self,
        boundary_values: impl Fn(&OPoint<f64, D>) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            boundary_values: Arc::new(boundary_values),
            ..self
        }
    }

    pub fn settings(&self) -> &WallDistanceSettings {
        &self.settings
    }

    /// Creates the linear hypercube mesh.
    pub fn make_grid(&self) -> eyre::Result<Mesh<f64, D, D::LinearConnectivity>> {
        let mesh = create_hypercube_mesh::<f64, D>(self.settings.half_width, self.settings.refinements)?;
        info!("Number of active cells: {}", mesh.connectivity().len());
        Ok(mesh)
    }

    /// Enumerates DOFs and allocates a zero-valued system with the final sparsity pattern.
    pub fn setup_system<C>(&self, mesh: &Mesh<f64, D, C>) -> eyre::Result<AssembledSystem<f64>>
    where
        C: ElementConnectivity<f64, ReferenceDim = D>,
    {
        let pattern = CsrAssembler::default().assemble_pattern(mesh);
        let num_dofs = pattern.major_dim();
        let nnz = pattern.nnz();
        info!("Number of degrees of freedom: {}", num_dofs);
        let matrix = CsrMatrix::try_from_pattern_and_values(pattern, vec![0.0; nnz])
            .map_err(|err| eyre!("Failed to allocate system matrix: {}", err))?;
        Ok(AssembledSystem {
            matrix,
            rhs: DVector::zeros(num_dofs),
        })
    }

    /// Adds the stiffness matrix and load vector of all elements to the system.
    pub fn assemble_system<C>(&self, mesh: &Mesh<f64, D, C>, system: &mut AssembledSystem<f64>) -> eyre::Result<()>
    where
        C: ElementConnectivity<f64, ReferenceDim = D> + Send + Sync,
    {
        let num_points = self.settings.effective_quadrature_points_per_dim();
        let quadrature = gauss_tensor::<f64, D>(num_points)
            .wrap_err_with(|| format!("No {}-point Gauss rule in {} dimensions", num_points, D::dim()))?;
        let source = &self.source;
        let element_assembler = ElementPoissonAssembler::new(mesh, quadrature, |x: &OPoint<f64, D>| source(x));
        CsrAssembler::default()
            .assemble_into_csr(&mut system.matrix, &mut system.rhs, &element_assembler)
            .wrap_err("Failed to assemble system")
    }

    /// The prescribed values at all boundary nodes of the mesh.
    pub fn boundary_values<C>(&self, mesh: &Mesh<f64, D, C>) -> BoundaryValueMap<f64>
    where
        C: ElementConnectivity<f64, ReferenceDim = D>,
    {
        let g = &self.boundary_values;
        interpolate_boundary_values(mesh, |x| g(x))
    }

    /// Applies the boundary values and solves the system with SSOR-preconditioned CG.
    ///
    /// Returns the solution, the solver output and the true residual norm. Failing to reach
    /// the tolerance within the iteration limit is an error.
    pub fn solve(
        &self,
        system: AssembledSystem<f64>,
        boundary_values: &BoundaryValueMap<f64>,
    ) -> eyre::Result<(DVector<f64>, CgOutput<f64>, f64)> {
        let constrained = system.constrain(boundary_values);
        let solver_settings = &self.settings.solver;

        let preconditioner = SsorPreconditioner::new(&constrained.matrix, solver_settings.relaxation)
            .wrap_err("Failed to set up SSOR preconditioner")?;
        let mut solution = constrained.initial_guess.clone();
        let output = ConjugateGradient::new()
            .with_operator(&constrained.matrix)
            .with_preconditioner(&preconditioner)
            .with_stopping_criterion(AbsoluteResidualCriterion::new(solver_settings.tolerance))
            .with_max_iter(solver_settings.max_iterations)
            .solve_with_guess(&constrained.rhs, &mut solution)
            .wrap_err("Linear solver failed")?;

        let residual = &constrained.rhs - &constrained.matrix * &solution;
        let residual_norm = residual.norm();
        info!(
            "{} CG iterations needed to obtain convergence (residual {:e})",
            output.num_iterations, residual_norm
        );
        Ok((solution, output, residual_norm))
    }

    /// Runs setup, assembly, boundary conditions and the linear solve on the given mesh.
    pub fn solve_on_mesh<C>(&self, mesh: Mesh<f64, D, C>) -> eyre::Result<WallDistanceSolution<D, C>>
    where
        C: ElementConnectivity<f64, ReferenceDim = D> + Send + Sync,
    {
        let mut system = self.setup_system(&mesh)?;
        self.assemble_system(&mesh, &mut system)?;
        let boundary_values = self.boundary_values(&mesh);
        let num_constrained_dofs = boundary_values.len();
        let (solution, cg_output, residual_norm) = self.solve(system, &boundary_values)?;
        Ok(WallDistanceSolution {
            mesh,
            solution,
            cg_output,
            residual_norm,
            num_constrained_dofs,
        })
    }

    /// Evaluates the wall distance estimates at the mesh nodes and writes all fields to
    /// `solution-{dim}d.vtk` in the output directory.
    ///
    /// Returns the path of the written file and the number of flagged points.
    pub fn output_results<C>(&self, solution: &WallDistanceSolution<D, C>) -> eyre::Result<(PathBuf, usize)>
    where
        C: ElementConnectivity<f64, ReferenceDim = D> + VtkCellConnectivity,
    {
        let (values, gradients) = solution.field().nodal_values_and_gradients()?;
        let mut derived = vec![DVector::zeros(D::dim() + 2); values.len()];
        let num_flagged = self
            .settings
            .postprocess
            .postprocessor()
            .compute_derived_quantities(&values, &gradients, &mut derived)
            .wrap_err("Wall distance post-processing failed")?;
        if num_flagged > 0 {
            warn!("{} output points had a negative square root argument", num_flagged);
        }

        let path = WallDistanceOutput::new(&solution.mesh, solution.solution.as_slice(), &derived)
            .write(&self.settings.output_directory)?;
        Ok((path, num_flagged))
    }

    fn run_on_mesh<C>(&self, mesh: Mesh<f64, D, C>) -> eyre::Result<WallDistanceReport>
    where
        C: ElementConnectivity<f64, ReferenceDim = D> + VtkCellConnectivity + Send + Sync,
    {
        let num_cells = mesh.num_elements();
        let solution = self.solve_on_mesh(mesh)?;
        let (output_path, num_flagged_points) = self.output_results(&solution)?;
        Ok(WallDistanceReport {
            dim: D::dim(),
            num_cells,
            num_dofs: solution.solution.len(),
            num_constrained_dofs: solution.num_constrained_dofs,
            cg_iterations: solution.cg_output.num_iterations,
            residual_norm: solution.residual_norm,
            num_flagged_points,
            output_path,
        })
    }

    /// Runs all phases in sequence.
    pub fn run(&self) -> eyre::Result<WallDistanceReport> {
        info!(
            "Solving problem in {} space dimensions with {} elements",
            D::dim(),
            self.settings.degree
        );
        let mesh = self.make_grid()?;
        match self.settings.degree {
            LagrangeDegree::Linear => self.run_on_mesh(mesh),
            LagrangeDegree::Quadratic => self.run_on_mesh(D::elevate_degree(&mesh)),
        }
    }
}
