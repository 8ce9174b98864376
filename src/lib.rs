//! # ad-rs
//!
//! Forward, adjoint and Hessian-action model for a time-dependent
//! advection-diffusion inverse problem.
//!
//! The unknown is the log-diffusivity m of
//!
//! ∂u/∂t - ∇·(exp(m)∇u) + w·∇u = 0
//!
//! observed pointwise in space and discretely in time. This crate provides
//! the pieces an inexact Newton-CG driver calls:
//! - P1 finite elements on 1D meshes with SUPG stabilization
//! - Forward and adjoint implicit Euler solves
//! - Reduced gradient and the second-derivative blocks of the Lagrangian
//! - Pointwise state observations and a bi-Laplacian prior
//! - Reduced Hessian products and finite-difference verification
//! - VTK export of state histories

pub mod config;
pub mod fem;
pub mod forms;
pub mod hessian;
pub mod io;
pub mod linalg;
pub mod mesh;
pub mod misfit;
pub mod model;
pub mod polynomial;
pub mod prior;
pub mod time;
pub mod verify;

// Re-export main types for convenience
pub use config::{AdvectionDiffusionProblem, ProblemConfig};
pub use fem::{P1Space, StabilizationConfig, SupgOperators, WindField};
pub use forms::{AdvectionDiffusionForm, Field, FieldMut, Role, VariationalForm};
pub use hessian::ReducedHessian;
pub use linalg::{LinearSolver, LuSolver, SparseMatrix};
pub use mesh::Mesh1D;
pub use misfit::{Misfit, MisfitError, PointwiseStateObservation};
pub use model::{
    BlockStrategy, Component, ModelConfig, ModelError, ModelVectors, PreparedOperator,
    TimeDependentAD,
};
pub use prior::{BiLaplacianPrior, Prior};
pub use time::{TimeDependentVector, TimeGrid};
