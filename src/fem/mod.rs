//! Continuous P1 finite elements on a 1D mesh.
//!
//! This module provides:
//! - The P1 function space with element-wise assembly helpers (`P1Space`)
//! - A piecewise-constant wind field (`WindField`)
//! - Pointwise observation operators (`assemble_pointwise_observation`)
//! - The constant SUPG-stabilized time-stepping operators (`SupgOperators`)

mod observation;
mod space;
mod supg;
mod wind;

pub use observation::assemble_pointwise_observation;
pub use space::P1Space;
pub use supg::{StabilizationConfig, SupgOperators, DEFAULT_STABILIZATION_KAPPA};
pub use wind::WindField;
