//! Mesh representation.
//!
//! Provides the 1D interval mesh the P1 discretization is built on.

mod mesh1d;

pub use mesh1d::{Mesh1D, MeshError};
