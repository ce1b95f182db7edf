//! Lagrange finite elements on quadrilaterals and hexahedra.
use crate::allocators::DimAllocator;
use crate::connectivity::Connectivity;
use crate::{Real, SmallDim};
use nalgebra::{convert, DefaultAllocator, Dim, Dyn, MatrixViewMut, OMatrix, OPoint, OVector};
use numeric_literals::replace_float_literals;
use std::fmt::Debug;

mod hexahedron;
mod quadrilateral;

pub use hexahedron::*;
pub use quadrilateral::*;

pub(crate) use hexahedron::HEX27_REFERENCE_NODES;
pub(crate) use quadrilateral::QUAD9_REFERENCE_NODES;

pub trait ReferenceFiniteElement<T>
where
    T: Real,
    DefaultAllocator: DimAllocator<T, Self::ReferenceDim>,
{
    type ReferenceDim: SmallDim;

    /// Returns the number of nodes in the element.
    fn num_nodes(&self) -> usize;

    /// Reference coordinates of the node with the given local index.
    ///
    /// Panics if the index is out of bounds.
    fn reference_node(&self, local_index: usize) -> OPoint<T, Self::ReferenceDim>;

    /// Evaluates each basis function at the given reference coordinates.
    ///
    /// Panics if `basis_values.len() != self.num_nodes()`.
    fn populate_basis(&self, basis_values: &mut [T], reference_coords: &OPoint<T, Self::ReferenceDim>);

    /// Populates a matrix whose columns are the reference gradients of each basis function.
    ///
    /// Panics if the matrix does not have exactly `self.num_nodes()` columns.
    fn populate_basis_gradients(
        &self,
        basis_gradients: MatrixViewMut<T, Self::ReferenceDim, Dyn>,
        reference_coords: &OPoint<T, Self::ReferenceDim>,
    );
}

/// A finite element embedded in a space of the same dimension as its reference element.
pub trait FiniteElement<T>: ReferenceFiniteElement<T>
where
    T: Real,
    DefaultAllocator: DimAllocator<T, Self::ReferenceDim>,
{
    /// Compute the Jacobian of the transformation from the reference element to the given
    /// element at the given reference coordinates.
    fn reference_jacobian(
        &self,
        reference_coords: &OPoint<T, Self::ReferenceDim>,
    ) -> OMatrix<T, Self::ReferenceDim, Self::ReferenceDim>;

    /// Maps reference coordinates to physical coordinates in the element.
    fn map_reference_coords(&self, reference_coords: &OPoint<T, Self::ReferenceDim>) -> OPoint<T, Self::ReferenceDim>;

    /// The largest distance between any two vertices of the element.
    fn diameter(&self) -> T;
}

pub trait ElementConnectivity<T>: Debug + Connectivity
where
    T: Real,
    DefaultAllocator: DimAllocator<T, Self::ReferenceDim>,
{
    type Element: FiniteElement<T, ReferenceDim = Self::ReferenceDim>;
    type ReferenceDim: SmallDim;

    /// Returns the finite element associated with this connectivity.
    ///
    /// Returns `None` if any of the connectivity's indices are out of bounds.
    fn element(&self, vertices: &[OPoint<T, Self::ReferenceDim>]) -> Option<Self::Element>;
}

pub type ElementForConnectivity<T, C> = <C as ElementConnectivity<T>>::Element;

/// Value and derivative of the linear Lagrange basis function on `[-1, 1]` associated with
/// the node `alpha ∈ {-1, 1}`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn phi_linear_1d<T: Real>(alpha: T, x: T) -> (T, T) {
    ((1.0 + alpha * x) / 2.0, alpha / 2.0)
}

/// Value and derivative of the quadratic Lagrange basis function on `[-1, 1]` associated with
/// the node `alpha ∈ {-1, 0, 1}`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn phi_quadratic_1d<T: Real>(alpha: T, x: T) -> (T, T) {
    let alpha2 = alpha * alpha;
    let a = (3.0 / 2.0) * alpha2 - 1.0;
    let b = alpha / 2.0;
    let c = 1.0 - alpha2;
    (a * x * x + b * x + c, 2.0 * a * x + b)
}

/// Evaluates a tensor product basis whose nodes are given in reference coordinates.
pub(crate) fn populate_tensor_product_basis<T: Real, const D: usize>(
    phi_1d: fn(T, T) -> (T, T),
    nodes: &[[f64; D]],
    xi: &[T],
    basis_values: &mut [T],
) {
    assert_eq!(basis_values.len(), nodes.len(), "Basis buffer must have one entry per node");
    for (value, node) in basis_values.iter_mut().zip(nodes) {
        *value = node
            .iter()
            .zip(xi)
            .fold(T::one(), |acc, (&alpha, &x)| acc * phi_1d(convert(alpha), x).0);
    }
}

/// Evaluates the reference gradients of a tensor product basis.
pub(crate) fn populate_tensor_product_gradients<T: Real, R: Dim, const D: usize>(
    phi_1d: fn(T, T) -> (T, T),
    nodes: &[[f64; D]],
    xi: &[T],
    mut gradients: MatrixViewMut<T, R, Dyn>,
) {
    assert_eq!(gradients.nrows(), D);
    assert_eq!(gradients.ncols(), nodes.len(), "Gradient buffer must have one column per node");
    for (i, node) in nodes.iter().enumerate() {
        let factors: [(T, T); D] = std::array::from_fn(|d| phi_1d(convert(node[d]), xi[d]));
        for k in 0..D {
            gradients[(k, i)] = factors
                .iter()
                .enumerate()
                .fold(T::one(), |acc, (d, &(phi, dphi))| if d == k { acc * dphi } else { acc * phi });
        }
    }
}

pub(crate) fn reference_point<T: Real, D: SmallDim, const N: usize>(node: &[f64; N]) -> OPoint<T, D>
where
    DefaultAllocator: DimAllocator<T, D>,
{
    assert_eq!(D::dim(), N);
    OPoint::from(OVector::<T, D>::from_iterator(node.iter().map(|&x| convert(x))))
}

/// Maps reference coordinates through the isoparametric map defined by the element's basis.
pub(crate) fn isoparametric_map<T, D, E>(element: &E, vertices: &[OPoint<T, D>], xi: &OPoint<T, D>) -> OPoint<T, D>
where
    T: Real,
    D: SmallDim,
    E: ReferenceFiniteElement<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let mut phi = vec![T::zero(); vertices.len()];
    element.populate_basis(&mut phi, xi);
    let x = vertices
        .iter()
        .zip(&phi)
        .fold(OVector::<T, D>::zeros(), |x, (v, &phi_i)| x + &v.coords * phi_i);
    OPoint::from(x)
}

/// Jacobian of the isoparametric map, `J = Σ_i x_i ⊗ ∇φ_i`.
pub(crate) fn isoparametric_jacobian<T, D, E>(
    element: &E,
    vertices: &[OPoint<T, D>],
    xi: &OPoint<T, D>,
) -> OMatrix<T, D, D>
where
    T: Real,
    D: SmallDim,
    E: ReferenceFiniteElement<T, ReferenceDim = D>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let n = vertices.len();
    let mut gradients = OMatrix::<T, D, Dyn>::zeros(n);
    element.populate_basis_gradients(gradients.columns_mut(0, n), xi);
    let mut jacobian = OMatrix::<T, D, D>::zeros();
    for (v, grad) in vertices.iter().zip(gradients.column_iter()) {
        jacobian += &v.coords * grad.transpose();
    }
    jacobian
}

/// Finds reference coordinates `xi` such that `element.map_reference_coords(xi) == x`.
///
/// Uses Newton's method starting from the reference element's center. Returns `None` if the
/// iteration fails to converge or encounters a singular Jacobian. The returned coordinates
/// may lie outside the reference element if `x` is outside the element.
pub fn map_physical_coordinates<T, E>(element: &E, x: &OPoint<T, E::ReferenceDim>) -> Option<OPoint<T, E::ReferenceDim>>
where
    T: Real,
    E: FiniteElement<T>,
    DefaultAllocator: DimAllocator<T, E::ReferenceDim>,
{
    let max_iterations = 50;
    let tolerance = convert::<f64, T>(1e-13) * (T::one() + element.diameter());
    let mut xi = OPoint::<T, E::ReferenceDim>::origin();
    for _ in 0..max_iterations {
        let residual = element.map_reference_coords(&xi) - x;
        if residual.norm() <= tolerance {
            return Some(xi);
        }
        let jacobian = element.reference_jacobian(&xi);
        let step = jacobian.lu().solve(&residual)?;
        xi -= step;
    }
    None
}
