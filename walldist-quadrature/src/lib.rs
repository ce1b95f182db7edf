//! Quadrature rules for the reference domains `[-1, 1]^d`, `d = 1, 2, 3`.
//!
//! Rules are plain `f64` data so that they can be used independently of `walldist`.
//! A rule is stored as a pair `(weights, points)` of equal length.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod tensor;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable => {
                write!(f, "There is no quadrature rule satisfying the requirements available")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A D-dimensional rule.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// Approximates the integral of `f` over the reference domain of the rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    assert_eq!(weights.len(), points.len(), "Weights and points must have the same length");
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| w * f(x))
        .sum()
}
