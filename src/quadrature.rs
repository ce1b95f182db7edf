use crate::allocators::DimAllocator;
use crate::{Real, SmallDim};
use nalgebra::{convert, DefaultAllocator, OPoint, OVector};
use num::Zero;
use std::ops::{AddAssign, Mul};

/// Errors returned by quadrature methods.
pub use walldist_quadrature::Error as QuadratureError;

pub type QuadraturePair<T, D> = (Vec<T>, Vec<OPoint<T, D>>);

/// A quadrature rule consisting of weights and points on a reference domain.
pub trait Quadrature<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn weights(&self) -> &[T];
    fn points(&self) -> &[OPoint<T, D>];

    /// Approximates the integral of the given function using this quadrature rule.
    fn integrate<U, Function>(&self, f: Function) -> U
    where
        Function: Fn(&OPoint<T, D>) -> U,
        U: Zero + Mul<T, Output = U> + AddAssign<U>,
    {
        let mut integral = U::zero();
        for (&w, p) in self.weights().iter().zip(self.points()) {
            integral += f(p) * w;
        }
        integral
    }
}

impl<T, D> Quadrature<T, D> for QuadraturePair<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    fn weights(&self) -> &[T] {
        &self.0
    }

    fn points(&self) -> &[OPoint<T, D>] {
        &self.1
    }
}

fn convert_rule<T, D, const N: usize>(rule: walldist_quadrature::Rule<N>) -> QuadraturePair<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    assert_eq!(D::dim(), N);
    let (weights, points) = rule;
    let weights = weights.into_iter().map(convert).collect();
    let points = points
        .iter()
        .map(|p| OPoint::from(OVector::<T, D>::from_iterator(p.iter().map(|&x| convert(x)))))
        .collect();
    (weights, points)
}

pub mod tensor {
    use super::{convert_rule, QuadratureError, QuadraturePair};
    use crate::allocators::DimAllocator;
    use crate::{Real, SmallDim};
    use nalgebra::DefaultAllocator;
    use walldist_quadrature::{tensor, univariate};

    /// Tensor-product Gauss rule with `num_points_per_dim` points along each axis of
    /// the reference domain `[-1, 1]^D`.
    ///
    /// Returns an error for zero points, or for dimensions other than 1, 2 and 3.
    pub fn gauss_tensor<T, D>(num_points_per_dim: usize) -> Result<QuadraturePair<T, D>, QuadratureError>
    where
        T: Real,
        D: SmallDim,
        DefaultAllocator: DimAllocator<T, D>,
    {
        if num_points_per_dim == 0 {
            return Err(QuadratureError::NoRuleAvailable);
        }
        match D::dim() {
            1 => Ok(convert_rule(univariate::gauss(num_points_per_dim))),
            2 => Ok(convert_rule(tensor::quadrilateral_gauss(num_points_per_dim))),
            3 => Ok(convert_rule(tensor::hexahedron_gauss(num_points_per_dim))),
            _ => Err(QuadratureError::NoRuleAvailable),
        }
    }
}
