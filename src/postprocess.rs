//! Wall distance estimates derived from the Poisson solution.
//!
//! Given the solution value `u` and gradient `g = ∇u` at a point, the estimates are
//!
//! ```text
//! root  = sqrt(max(|g|² + 2u, 0))
//! s_min = root - |g|₁
//! s_max = root + |g|₁
//! ```
//!
//! and the gradient itself is reported as the direction towards the nearest wall.
use crate::allocators::DimAllocator;
use crate::{Real, SmallDim};
use log::warn;
use nalgebra::{DVector, DefaultAllocator, OVector};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do when `|g|² + 2u` is negative beyond the configured tolerance.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainViolationPolicy {
    /// Log a warning for each offending point and continue with the clamped value.
    #[default]
    Warn,
    /// Fail on the first offending point.
    Reject,
}

/// How each component of the derived quantity vector should be interpreted by output writers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataComponentInterpretation {
    Scalar,
    PartOfVector,
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PostprocessError<T> {
    NegativeDiscriminant { point: usize, value: T },
}

impl<T: fmt::Display> fmt::Display for PostprocessError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDiscriminant { point, value } => write!(
                f,
                "|∇u|² + 2u = {} is negative at point {}, the solution is not a valid distance function",
                value, point
            ),
        }
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for PostprocessError<T> {}

/// Derived quantities at a single point.
#[derive(Debug, Clone, PartialEq)]
pub struct WallDistanceSample<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    pub direction: OVector<T, D>,
    pub s_min: T,
    pub s_max: T,
    /// The unclamped value of `|g|² + 2u`.
    pub discriminant: T,
}

impl<T, D> WallDistanceSample<T, D>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    /// The sample as `[g_0, ..., g_{dim-1}, s_min, s_max]`.
    pub fn to_vector(&self) -> DVector<T> {
        let d = D::dim();
        let mut v = DVector::zeros(d + 2);
        v.rows_mut(0, d).copy_from(&self.direction);
        v[d] = self.s_min;
        v[d + 1] = self.s_max;
        v
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WallDistancePostprocessor<T> {
    pub negative_tolerance: T,
    pub policy: DomainViolationPolicy,
}

impl<T: Real> Default for WallDistancePostprocessor<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn default() -> Self {
        Self {
            negative_tolerance: 1e-10,
            policy: DomainViolationPolicy::Warn,
        }
    }
}

impl<T: Real> WallDistancePostprocessor<T> {
    pub fn new(negative_tolerance: T, policy: DomainViolationPolicy) -> Self {
        assert!(negative_tolerance >= T::zero(), "Tolerance must be non-negative");
        Self {
            negative_tolerance,
            policy,
        }
    }

    /// Evaluates the derived quantities for a solution value `u` and gradient `g`.
    pub fn evaluate<D>(&self, u: T, g: &OVector<T, D>) -> WallDistanceSample<T, D>
    where
        D: SmallDim,
        DefaultAllocator: DimAllocator<T, D>,
    {
        let l2 = g.norm_squared();
        let l1 = g.iter().fold(T::zero(), |acc, &g_d| acc + g_d.abs());
        let discriminant = l2 + (u + u);
        let root = discriminant.max(T::zero()).sqrt();
        WallDistanceSample {
            direction: g.clone(),
            s_min: root - l1,
            s_max: root + l1,
            discriminant,
        }
    }

    /// Returns `Ok(true)` if the sample violates the square root domain and the policy
    /// allows continuing.
    fn check_domain<D>(&self, point: usize, sample: &WallDistanceSample<T, D>) -> Result<bool, PostprocessError<T>>
    where
        D: SmallDim,
        DefaultAllocator: DimAllocator<T, D>,
    {
        if sample.discriminant >= -self.negative_tolerance {
            return Ok(false);
        }
        match self.policy {
            DomainViolationPolicy::Warn => {
                warn!(
                    "Negative value |∇u|² + 2u = {} at point {} clamped to zero",
                    sample.discriminant, point
                );
                Ok(true)
            }
            DomainViolationPolicy::Reject => Err(PostprocessError::NegativeDiscriminant {
                point,
                value: sample.discriminant,
            }),
        }
    }

    /// Evaluates the derived quantities at a batch of points, writing
    /// `[g_0, ..., g_{dim-1}, s_min, s_max]` into each entry of `computed`.
    ///
    /// Returns the number of points whose discriminant was negative beyond the tolerance.
    ///
    /// Panics if the input and output lengths differ, or if an output vector does not have
    /// exactly `dim + 2` entries.
    pub fn compute_derived_quantities<D>(
        &self,
        uh: &[T],
        duh: &[OVector<T, D>],
        computed: &mut [DVector<T>],
    ) -> Result<usize, PostprocessError<T>>
    where
        D: SmallDim,
        DefaultAllocator: DimAllocator<T, D>,
    {
        let d = D::dim();
        assert_eq!(uh.len(), duh.len(), "Need one gradient per solution value");
        assert_eq!(uh.len(), computed.len(), "Need one output vector per solution value");

        let mut num_flagged = 0;
        for (point, ((&u, g), output)) in uh.iter().zip(duh).zip(computed.iter_mut()).enumerate() {
            assert_eq!(output.len(), d + 2, "Output vector {} must have dim + 2 entries", point);
            let sample = self.evaluate(u, g);
            if self.check_domain(point, &sample)? {
                num_flagged += 1;
            }
            output.rows_mut(0, d).copy_from(&sample.direction);
            output[d] = sample.s_min;
            output[d + 1] = sample.s_max;
        }
        Ok(num_flagged)
    }
}

/// Field names for the components of the derived quantity vector.
pub fn names(dim: usize) -> Vec<&'static str> {
    let mut names = vec!["direction"; dim];
    names.extend(["s_min", "s_max"]);
    names
}

pub fn component_interpretation(dim: usize) -> Vec<DataComponentInterpretation> {
    let mut interpretation = vec![DataComponentInterpretation::PartOfVector; dim];
    interpretation.extend([DataComponentInterpretation::Scalar, DataComponentInterpretation::Scalar]);
    interpretation
}
