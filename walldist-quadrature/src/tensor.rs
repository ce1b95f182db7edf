//! Quadrature rules for quadrilaterals and hexahedra built as tensor products of
//! one-dimensional Gauss rules.

use crate::univariate::gauss;
use crate::Rule;

/// Forms the tensor product of the `n`-point Gauss rule with itself `D` times.
///
/// Points are ordered with the first coordinate varying slowest.
fn gauss_tensor_product<const D: usize>(num_points_per_dim: usize) -> Rule<D> {
    let (weights1d, points1d) = gauss(num_points_per_dim);
    let n = weights1d.len();
    let total = n.pow(D as u32);

    let mut weights = Vec::with_capacity(total);
    let mut points = Vec::with_capacity(total);
    for linear_index in 0..total {
        let mut remainder = linear_index;
        let mut weight = 1.0;
        let mut point = [0.0; D];
        for d in (0..D).rev() {
            let i = remainder % n;
            remainder /= n;
            weight *= weights1d[i];
            point[d] = points1d[i][0];
        }
        weights.push(weight);
        points.push(point);
    }

    (weights, points)
}

/// A Gauss quadrature rule for the reference quadrilateral `[-1, 1]^2`.
///
/// Integrates polynomials of degree up to `2n - 1` in each variable exactly.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule<2> {
    gauss_tensor_product(num_points_per_dim)
}

/// A Gauss quadrature rule for the reference hexahedron `[-1, 1]^3`.
///
/// Integrates polynomials of degree up to `2n - 1` in each variable exactly.
pub fn hexahedron_gauss(num_points_per_dim: usize) -> Rule<3> {
    gauss_tensor_product(num_points_per_dim)
}
