//! Gaussian priors on the parameter field.
//!
//! The model only needs the precision operator R, its inverse, the prior
//! mean and the mass matrix solve used to measure gradients in the L²
//! metric. [`BiLaplacianPrior`] is the concrete elliptic prior shipped
//! with the crate.

mod bilaplacian;

pub use bilaplacian::BiLaplacianPrior;

use thiserror::Error;

use crate::linalg::LinAlgError;

/// Error type for prior construction and application.
#[derive(Debug, Error, PartialEq)]
pub enum PriorError {
    /// A coefficient of the elliptic operator is not positive.
    #[error("Prior coefficient {name} must be positive and finite, got {value}")]
    InvalidCoefficient { name: &'static str, value: f64 },

    /// Vector length differs from the parameter dimension.
    #[error("Prior dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Backend failure while applying or solving.
    #[error(transparent)]
    LinAlg(#[from] LinAlgError),
}

/// A Gaussian prior N(mean, R⁻¹) on the parameter.
pub trait Prior: Send + Sync {
    /// Parameter dimension.
    fn dim(&self) -> usize;

    /// Prior mean.
    fn mean(&self) -> &[f64];

    /// ½ (m - mean)ᵀ R (m - mean)
    fn cost(&self, m: &[f64]) -> Result<f64, PriorError>;

    /// out = R x
    fn apply_r(&self, x: &[f64], out: &mut [f64]) -> Result<(), PriorError>;

    /// out = R⁻¹ rhs
    fn r_solve(&self, rhs: &[f64], out: &mut [f64]) -> Result<(), PriorError>;

    /// out = M⁻¹ rhs with the parameter mass matrix M.
    fn m_solve(&self, rhs: &[f64], out: &mut [f64]) -> Result<(), PriorError>;
}

/// Borrowed handle that applies R⁻¹.
///
/// Used by preconditioned solvers that only need the inverse precision.
#[derive(Clone, Copy)]
pub struct RSolver<'a> {
    prior: &'a dyn Prior,
}

impl<'a> RSolver<'a> {
    /// Wrap a prior.
    pub fn new(prior: &'a dyn Prior) -> Self {
        Self { prior }
    }

    /// out = R⁻¹ rhs
    pub fn solve(&self, rhs: &[f64], out: &mut [f64]) -> Result<(), PriorError> {
        self.prior.r_solve(rhs, out)
    }

    /// Dimension of the operator.
    pub fn dim(&self) -> usize {
        self.prior.dim()
    }
}

pub(crate) fn check_len(expected: usize, actual: usize) -> Result<(), PriorError> {
    if expected == actual {
        Ok(())
    } else {
        Err(PriorError::DimensionMismatch { expected, actual })
    }
}
