//! Time grids and time-indexed vectors.
//!
//! State and adjoint histories are stored as one spatial vector per stamp of
//! a [`TimeGrid`]. Lookups by time match stamps within a fixed absolute
//! tolerance and never interpolate.

mod grid;
mod series;

pub use grid::{TIME_TOLERANCE, TimeGrid};
pub use series::TimeDependentVector;

use thiserror::Error;

/// Error type for time grids and time-indexed storage.
#[derive(Debug, Error, PartialEq)]
pub enum TimeGridError {
    /// A grid needs at least one stamp.
    #[error("Time grid is empty")]
    Empty,

    /// Stamps must strictly increase.
    #[error("Time stamps must be strictly increasing (violated at stamp {index})")]
    NotIncreasing { index: usize },

    /// Step size for `arange` must be positive and finite.
    #[error("Invalid time step {0}")]
    InvalidStep(f64),

    /// A uniform step needs at least two stamps.
    #[error("Need at least two time stamps for a time step, got {0}")]
    TooFewSteps(usize),

    /// The grid spacing varies.
    #[error("Non-uniform time grid at stamp {index}: expected step {expected}, got {actual}")]
    NonUniform {
        index: usize,
        expected: f64,
        actual: f64,
    },

    /// A requested time is not one of the stamps.
    #[error("Time {0} is not on the time grid")]
    TimeNotOnGrid(f64),

    /// Snapshot length differs from the vector's spatial dimension.
    #[error("Snapshot dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Two time-indexed vectors live on different grids.
    #[error("Time-indexed vectors are defined on different grids")]
    GridMismatch,
}
