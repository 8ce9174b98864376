//! Polynomial evaluation and quadrature.
//!
//! Provides 1D Legendre polynomials and the Gauss-Legendre rules used to
//! integrate the weak forms element by element.

mod gauss;

pub use gauss::{GaussLegendre, legendre_and_derivative};
