//! The time-dependent advection-diffusion model.
//!
//! [`TimeDependentAD`] owns the SUPG-stabilized implicit Euler scheme for
//!
//! ∂u/∂t - ∇·(exp(m)∇u) + w·∇u = 0,  u(0) = u₀
//!
//! and provides the forward and adjoint solves, the reduced gradient with
//! respect to the log-diffusivity m, and the second-derivative blocks of the
//! Lagrangian needed for Hessian-vector products.
//!
//! Parameter-dependent factorizations live in a [`PreparedOperator`] built
//! by [`TimeDependentAD::prepare`]. A prepared operator remembers the
//! parameter it was built for, so solving against a different parameter is
//! rejected instead of silently producing wrong results.

mod blocks;
mod config;
mod prepared;
mod time_dependent_ad;
mod vectors;

pub use blocks::{Block, BlockOutput};
pub use config::{BlockStrategy, ModelConfig};
pub use prepared::PreparedOperator;
pub use time_dependent_ad::{LinearizationPoint, TimeDependentAD};
pub use vectors::{Component, GeneratedVector, ModelVectors};

use thiserror::Error;

use crate::forms::Role;
use crate::io::VtkError;
use crate::linalg::LinAlgError;
use crate::mesh::MeshError;
use crate::misfit::MisfitError;
use crate::prior::PriorError;
use crate::time::TimeGridError;

/// Error type for model construction and evaluation.
#[derive(Debug, Error)]
pub enum ModelError {
    /// `generate_vector` received an unrecognized tag.
    #[error("Unknown component tag '{0}' (expected ALL, STATE, PARAMETER or ADJOINT)")]
    UnknownComponent(String),

    /// Inconsistent construction input.
    #[error("Invalid model configuration: {0}")]
    Config(String),

    /// A Hessian action was requested before a linearization point was set.
    #[error("No linearization point set; call set_point_for_hessian_evaluations first")]
    NoLinearizationPoint,

    /// The role pair has no second-derivative block.
    #[error("Unsupported block ({i}, {j})")]
    UnsupportedBlock { i: Role, j: Role },

    /// An argument has the wrong layout for its role.
    #[error("Argument layout does not match the {0} role")]
    LayoutMismatch(Role),

    /// A prepared operator was built for a different parameter.
    #[error("Prepared operator was built for a different parameter")]
    StaleOperator,

    #[error(transparent)]
    LinAlg(#[from] LinAlgError),

    #[error(transparent)]
    Time(#[from] TimeGridError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Misfit(#[from] MisfitError),

    #[error(transparent)]
    Prior(#[from] PriorError),

    #[error(transparent)]
    Vtk(#[from] VtkError),
}
