//! Helper traits for allocator trait bounds.
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, Scalar, U1};

/// An allocator for a single dimension.
///
/// Covers points, square matrices and row vectors of dimension `D`, plus the
/// permutation storage needed by LU-based determinants and inverses.
pub trait DimAllocator<T: Scalar, D: DimName>:
    Allocator<T, D> + Allocator<T, D, D> + Allocator<T, U1, D> + Allocator<usize, D> + Allocator<(usize, usize), D>
{
}

impl<T, D> DimAllocator<T, D> for DefaultAllocator
where
    T: Scalar,
    D: DimName,
    DefaultAllocator:
        Allocator<T, D> + Allocator<T, D, D> + Allocator<T, U1, D> + Allocator<usize, D> + Allocator<(usize, usize), D>,
{
}
