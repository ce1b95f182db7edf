//! Wall distance estimation by the Poisson method.
//!
//! The distance to the nearest wall is approximated by solving `-Δφ = 1` with `φ = 0` on the
//! boundary using continuous Lagrange finite elements, and then evaluating
//!
//! ```text
//! s = sqrt(|∇φ|² + 2φ) ∓ |∇φ|₁
//! ```
//!
//! at the nodes of the mesh. See [`pipeline::WallDistanceProblem`] for the end-to-end driver.
use nalgebra::{DimMin, DimName};

pub mod allocators;
pub mod assembly;
pub mod boundary;
pub mod connectivity;
pub mod element;
pub mod interpolate;
pub mod io;
pub mod mesh;
pub mod pipeline;
pub mod postprocess;
pub mod quadrature;
pub mod settings;
pub mod space;

mod mesh_convert;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
pub extern crate vtkio;

pub use walldist_traits::Real;

pub mod sparse {
    pub use walldist_sparse::*;
}

/// A small, fixed-size dimension.
///
/// Used as a trait alias for various traits frequently needed by generic `walldist` routines.
pub trait SmallDim: DimName + DimMin<Self, Output = Self> {}

impl<D> SmallDim for D where D: DimName + DimMin<Self, Output = Self> {}
