//! Preconditioned conjugate gradient.
use core::fmt;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, Scalar};
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CsrMatrix;
use std::cell::RefCell;
use std::error::Error;
use std::ops::{Deref, DerefMut};
use walldist_traits::Real;

/// Error type returned by operators and preconditioners.
pub type OperatorError = Box<dyn Error + Send + Sync>;

/// A linear map `y = A x` between vectors of equal length.
pub trait LinearOperator<T: Scalar> {
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError>;
}

impl<'a, T, A> LinearOperator<T> for &'a A
where
    T: Scalar,
    A: ?Sized + LinearOperator<T>,
{
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        <A as LinearOperator<T>>::apply(self, y, x)
    }
}

fn check_operator_dimensions(nrows: usize, ncols: usize, y_len: usize, x_len: usize) -> Result<(), OperatorError> {
    if nrows != y_len || ncols != x_len {
        Err(format!(
            "Cannot apply {}x{} operator to vector of length {} with output of length {}",
            nrows, ncols, x_len, y_len
        )
        .into())
    } else {
        Ok(())
    }
}

impl<T: Real> LinearOperator<T> for DMatrix<T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        check_operator_dimensions(self.nrows(), self.ncols(), y.len(), x.len())?;
        y.gemv(T::one(), self, &x, T::zero());
        Ok(())
    }
}

impl<T: Real> LinearOperator<T> for CsrMatrix<T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        check_operator_dimensions(self.nrows(), self.ncols(), y.len(), x.len())?;
        spmm_csr_dense(T::zero(), &mut y, T::one(), Op::NoOp(self), Op::NoOp(&x));
        Ok(())
    }
}

pub struct IdentityOperator;

impl<T: Scalar> LinearOperator<T> for IdentityOperator {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), OperatorError> {
        y.copy_from(&x);
        Ok(())
    }
}

pub trait CgStoppingCriterion<T: Scalar> {
    /// Called by CG at the start of a new solve.
    fn reset(&self, _a: &dyn LinearOperator<T>, _x: DVectorView<T>, _b: DVectorView<T>) {}

    fn has_converged(
        &self,
        a: &dyn LinearOperator<T>,
        x: DVectorView<T>,
        b: DVectorView<T>,
        b_norm: T,
        iteration: usize,
        approx_residual: DVectorView<T>,
    ) -> Result<bool, SolveErrorKind>;
}

/// Absolute residual tolerance `||b - Ax|| <= tol`.
///
/// The recursively updated CG residual is used as a cheap first test. Once it passes, the
/// true residual is computed with an additional operator application, and convergence is
/// only reported if the true residual also satisfies the tolerance.
#[derive(Debug)]
pub struct AbsoluteResidualCriterion<T: Scalar> {
    tol: T,
    residual: RefCell<DVector<T>>,
}

impl<T: Real> AbsoluteResidualCriterion<T> {
    pub fn new(tol: T) -> Self {
        Self {
            tol,
            residual: RefCell::new(DVector::zeros(0)),
        }
    }

    pub fn tolerance(&self) -> T {
        self.tol
    }
}

impl Default for AbsoluteResidualCriterion<f64> {
    fn default() -> Self {
        Self::new(1e-12)
    }
}

impl<T: Real> CgStoppingCriterion<T> for AbsoluteResidualCriterion<T> {
    fn has_converged(
        &self,
        a: &dyn LinearOperator<T>,
        x: DVectorView<T>,
        b: DVectorView<T>,
        _b_norm: T,
        _iteration: usize,
        approx_residual: DVectorView<T>,
    ) -> Result<bool, SolveErrorKind> {
        if approx_residual.norm() > self.tol {
            return Ok(false);
        }

        let mut residual = self.residual.borrow_mut();
        residual.resize_vertically_mut(b.len(), T::zero());
        a.apply((&mut *residual).into(), x)
            .map_err(SolveErrorKind::StoppingCriterionError)?;
        // r = b - Ax
        residual.axpy(T::one(), &b, -T::one());
        Ok(residual.norm() <= self.tol)
    }
}

/// Relative residual tolerance `||r|| <= tol * ||b||`, evaluated on the recursively updated
/// CG residual.
#[derive(Debug)]
pub struct RelativeResidualCriterion<T: Scalar> {
    tol: T,
}

impl<T: Real> RelativeResidualCriterion<T> {
    pub fn new(tol: T) -> Self {
        Self { tol }
    }
}

impl Default for RelativeResidualCriterion<f64> {
    fn default() -> Self {
        Self::new(1e-8)
    }
}

impl<T: Real> CgStoppingCriterion<T> for RelativeResidualCriterion<T> {
    fn has_converged(
        &self,
        _a: &dyn LinearOperator<T>,
        _x: DVectorView<T>,
        _b: DVectorView<T>,
        b_norm: T,
        _iteration: usize,
        approx_residual: DVectorView<T>,
    ) -> Result<bool, SolveErrorKind> {
        Ok(approx_residual.norm() <= self.tol * b_norm)
    }
}

#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct CgWorkspace<T: Scalar> {
    r: DVector<T>,
    z: DVector<T>,
    p: DVector<T>,
    Ap: DVector<T>,
}

#[allow(non_snake_case)]
struct Buffers<'a, T: Scalar> {
    r: &'a mut DVector<T>,
    z: &'a mut DVector<T>,
    p: &'a mut DVector<T>,
    Ap: &'a mut DVector<T>,
}

impl<T: Real> Default for CgWorkspace<T> {
    fn default() -> Self {
        Self {
            r: DVector::zeros(0),
            z: DVector::zeros(0),
            p: DVector::zeros(0),
            Ap: DVector::zeros(0),
        }
    }
}

impl<T: Real> CgWorkspace<T> {
    fn prepare_buffers(&mut self, dim: usize) -> Buffers<'_, T> {
        self.r.resize_vertically_mut(dim, T::zero());
        self.z.resize_vertically_mut(dim, T::zero());
        self.p.resize_vertically_mut(dim, T::zero());
        self.Ap.resize_vertically_mut(dim, T::zero());
        Buffers {
            r: &mut self.r,
            z: &mut self.z,
            p: &mut self.p,
            Ap: &mut self.Ap,
        }
    }
}

#[derive(Debug)]
enum OwnedOrMutRef<'a, T> {
    Owned(T),
    MutRef(&'a mut T),
}

impl<'a, T> Deref for OwnedOrMutRef<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Owned(owned) => owned,
            Self::MutRef(mutref) => mutref,
        }
    }
}

impl<'a, T> DerefMut for OwnedOrMutRef<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Self::Owned(owned) => owned,
            Self::MutRef(mutref) => mutref,
        }
    }
}

/// Preconditioned conjugate gradient solver, configured through builder methods.
///
/// ```ignore
/// let output = ConjugateGradient::new()
///     .with_operator(&matrix)
///     .with_preconditioner(&preconditioner)
///     .with_stopping_criterion(AbsoluteResidualCriterion::new(1e-12))
///     .with_max_iter(1000)
///     .solve_with_guess(&b, &mut x)?;
/// ```
#[derive(Debug)]
pub struct ConjugateGradient<'a, T, A, P, Criterion>
where
    T: Scalar,
{
    workspace: OwnedOrMutRef<'a, CgWorkspace<T>>,
    operator: A,
    preconditioner: P,
    stopping_criterion: Criterion,
    max_iter: Option<usize>,
}

impl<'a, T: Real> ConjugateGradient<'a, T, (), IdentityOperator, ()> {
    pub fn new() -> Self {
        Self {
            workspace: OwnedOrMutRef::Owned(CgWorkspace::default()),
            operator: (),
            preconditioner: IdentityOperator,
            stopping_criterion: (),
            max_iter: None,
        }
    }

    pub fn with_workspace(workspace: &'a mut CgWorkspace<T>) -> Self {
        Self {
            workspace: OwnedOrMutRef::MutRef(workspace),
            operator: (),
            preconditioner: IdentityOperator,
            stopping_criterion: (),
            max_iter: None,
        }
    }
}

impl<'a, T: Real> Default for ConjugateGradient<'a, T, (), IdentityOperator, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Scalar, P, Criterion> ConjugateGradient<'a, T, (), P, Criterion> {
    pub fn with_operator<A>(self, operator: A) -> ConjugateGradient<'a, T, A, P, Criterion> {
        ConjugateGradient {
            workspace: self.workspace,
            operator,
            preconditioner: self.preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

impl<'a, T: Scalar, A, P, Criterion> ConjugateGradient<'a, T, A, P, Criterion> {
    pub fn with_preconditioner<P2>(self, preconditioner: P2) -> ConjugateGradient<'a, T, A, P2, Criterion> {
        ConjugateGradient {
            workspace: self.workspace,
            operator: self.operator,
            preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self {
            max_iter: Some(max_iter),
            ..self
        }
    }
}

impl<'a, T: Scalar, A, P> ConjugateGradient<'a, T, A, P, ()> {
    pub fn with_stopping_criterion<Criterion>(
        self,
        stopping_criterion: Criterion,
    ) -> ConjugateGradient<'a, T, A, P, Criterion> {
        ConjugateGradient {
            workspace: self.workspace,
            operator: self.operator,
            preconditioner: self.preconditioner,
            stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(OperatorError),
    PreconditionerError(OperatorError),
    StoppingCriterionError(OperatorError),
    IndefiniteOperator,
    IndefinitePreconditioner,
    MaxIterationsReached { max_iter: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => write!(f, "Error applying operator: {}", err),
            Self::PreconditionerError(err) => write!(f, "Error applying preconditioner: {}", err),
            Self::StoppingCriterionError(err) => write!(f, "Error evaluating stopping criterion: {}", err),
            Self::IndefiniteOperator => write!(f, "Operator appears to be indefinite"),
            Self::IndefinitePreconditioner => write!(f, "Preconditioner appears to be indefinite"),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "Max iterations ({}) reached without convergence", max_iter)
            }
        }
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct SolveError<T> {
    pub output: CgOutput<T>,
    pub kind: SolveErrorKind,
}

impl<T> SolveError<T> {
    fn new(output: CgOutput<T>, kind: SolveErrorKind) -> Self {
        Self { output, kind }
    }
}

impl<T: fmt::Display> fmt::Display for SolveError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CG solve failed after {} iterations with residual norm {}: {}",
            self.output.num_iterations, self.output.residual_norm, self.kind
        )
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for SolveError<T> {}

/// y = Ax
fn apply_operator<'a, T, A>(
    y: impl Into<DVectorViewMut<'a, T>>,
    a: &'a A,
    x: impl Into<DVectorView<'a, T>>,
) -> Result<(), OperatorError>
where
    T: Scalar,
    A: LinearOperator<T>,
{
    a.apply(y.into(), x.into())
}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct CgOutput<T> {
    /// Number of updates made to the initial guess.
    pub num_iterations: usize,
    /// Norm of the recursively updated residual at termination.
    pub residual_norm: T,
}

impl<'a, T, A, P, Criterion> ConjugateGradient<'a, T, A, P, Criterion>
where
    T: Real,
    A: LinearOperator<T>,
    P: LinearOperator<T>,
    Criterion: CgStoppingCriterion<T>,
{
    pub fn solve_with_guess<'b>(
        &mut self,
        b: impl Into<DVectorView<'b, T>>,
        x: impl Into<DVectorViewMut<'b, T>>,
    ) -> Result<CgOutput<T>, SolveError<T>> {
        self.solve_with_guess_(b.into(), x.into())
    }

    #[allow(non_snake_case)]
    fn solve_with_guess_(&mut self, b: DVectorView<T>, mut x: DVectorViewMut<T>) -> Result<CgOutput<T>, SolveError<T>> {
        use SolveErrorKind::*;
        assert_eq!(b.len(), x.len(), "Right-hand side and solution must have the same length");

        let mut output = CgOutput {
            num_iterations: 0,
            residual_norm: T::zero(),
        };

        let Buffers { r, z, p, Ap } = self.workspace.prepare_buffers(x.len());

        // r = b - Ax
        if let Err(err) = apply_operator(&mut *r, &self.operator, &x) {
            return Err(SolveError::new(output, OperatorError(err)));
        }
        r.axpy(T::one(), &b, -T::one());
        output.residual_norm = r.norm();

        let b_norm = b.norm();
        if b_norm == T::zero() {
            x.fill(T::zero());
            output.residual_norm = T::zero();
            return Ok(output);
        }

        self.stopping_criterion.reset(&self.operator, (&x).into(), b);

        // z = Pr
        if let Err(err) = apply_operator(&mut *z, &self.preconditioner, &*r) {
            return Err(SolveError::new(output, PreconditionerError(err)));
        }

        p.copy_from(&*z);
        let mut zTr = z.dot(&*r);

        loop {
            let convergence = self.stopping_criterion.has_converged(
                &self.operator,
                (&x).into(),
                b,
                b_norm,
                output.num_iterations,
                (&*r).into(),
            );

            match convergence {
                Ok(true) => break,
                Ok(false) => {}
                Err(error_kind) => return Err(SolveError::new(output, error_kind)),
            }

            if let Some(max_iter) = self.max_iter {
                if output.num_iterations >= max_iter {
                    return Err(SolveError::new(output, MaxIterationsReached { max_iter }));
                }
            }

            // Ap = A * p
            if let Err(err) = apply_operator(&mut *Ap, &self.operator, &*p) {
                return Err(SolveError::new(output, OperatorError(err)));
            }
            let pAp = p.dot(&*Ap);

            if pAp <= T::zero() {
                return Err(SolveError::new(output, IndefiniteOperator));
            }
            if zTr <= T::zero() {
                return Err(SolveError::new(output, IndefinitePreconditioner));
            }

            let alpha = zTr / pAp;
            // x <- x + alpha * p
            x.axpy(alpha, &*p, T::one());
            // r <- r - alpha * Ap
            r.axpy(-alpha, &*Ap, T::one());

            output.num_iterations += 1;
            output.residual_norm = r.norm();

            // z <- P r
            if let Err(err) = apply_operator(&mut *z, &self.preconditioner, &*r) {
                return Err(SolveError::new(output, PreconditionerError(err)));
            }
            let zTr_next = z.dot(&*r);
            let beta = zTr_next / zTr;

            // p <- z + beta * p
            p.axpy(T::one(), &*z, beta);

            zTr = zTr_next;
        }

        log::debug!(
            "CG converged in {} iterations (residual norm {})",
            output.num_iterations,
            output.residual_norm
        );

        Ok(output)
    }
}
