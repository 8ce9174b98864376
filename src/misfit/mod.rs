//! Data misfit functionals.
//!
//! A misfit depends on the state history only. Its derivatives with respect
//! to the parameter and the adjoint vanish identically, and its second
//! derivative is the state-state block used by the reduced Hessian.

mod pointwise;

pub use pointwise::PointwiseStateObservation;

use thiserror::Error;

use crate::forms::{Field, FieldMut, Role};
use crate::linalg::LinAlgError;
use crate::mesh::MeshError;
use crate::model::ModelVectors;
use crate::time::{TimeDependentVector, TimeGridError};

/// Error type for misfit evaluation.
#[derive(Debug, Error, PartialEq)]
pub enum MisfitError {
    /// Cost or derivatives requested before a noise variance was set.
    #[error("Noise variance has not been set")]
    NoiseVarianceUnset,

    /// Noise variance must be strictly positive and finite.
    #[error("Noise variance must be positive and finite, got {0}")]
    InvalidNoiseVariance(f64),

    /// An argument has the wrong layout for its role.
    #[error("Argument layout does not match the {0} role")]
    LayoutMismatch(Role),

    /// Observation data have the wrong shape.
    #[error("Observation dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Time(#[from] TimeGridError),

    #[error(transparent)]
    LinAlg(#[from] LinAlgError),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// A data misfit term of the cost functional.
pub trait Misfit: Send + Sync {
    /// Times at which data are available.
    fn observation_times(&self) -> &[f64];

    /// Sample the state history of `x` into `obs`.
    fn observe(&self, x: &ModelVectors, obs: &mut TimeDependentVector) -> Result<(), MisfitError>;

    /// Misfit value at the state history of `x`.
    fn cost(&self, x: &ModelVectors) -> Result<f64, MisfitError>;

    /// out = ∂misfit/∂(role) at `x`. Zero for every role but the state.
    fn grad(&self, role: Role, x: &ModelVectors, out: FieldMut<'_>) -> Result<(), MisfitError>;

    /// out = ∂²misfit/∂(i)∂(j) · direction. Zero for every block but
    /// (state, state).
    fn apply_ij(
        &self,
        i: Role,
        j: Role,
        direction: Field<'_>,
        out: FieldMut<'_>,
    ) -> Result<(), MisfitError>;

    /// Freeze a point for second derivatives. Quadratic misfits ignore it.
    fn set_linearization_point(&mut self, _x: &ModelVectors, _gauss_newton: bool) {}
}
