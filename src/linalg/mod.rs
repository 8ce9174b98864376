//! Sparse storage, sparse LU factorization and vector kernels.
//!
//! The finite element operators are assembled into CSR matrices. Time
//! stepping factorizes the implicit operator once per solve through the
//! [`LinearSolver`] trait and reuses the factorization for every step.

mod csr;
mod solver;
pub mod vector;

pub use csr::{SparseBuilder, SparseMatrix};
pub use solver::{LinearSolver, LuSolver};

use thiserror::Error;

/// Error type for linear algebra operations.
#[derive(Debug, Error, PartialEq)]
pub enum LinAlgError {
    /// Operand dimensions do not agree.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Factorization requested for a non-square operator.
    #[error("Operator must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    /// The system is singular or too ill-conditioned to solve.
    #[error("Linear solve produced non-finite values (singular or ill-conditioned operator)")]
    Singular,

    /// The backend could not build or factorize the operator.
    #[error("Factorization failed: {0}")]
    Factorization(String),

    /// Solve called before an operator was set.
    #[error("No operator has been factorized")]
    NotFactorized,
}
