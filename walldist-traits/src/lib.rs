use nalgebra::RealField;

pub use nalgebra;

/// Scalar type used throughout `walldist`.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

pub mod allocators;
