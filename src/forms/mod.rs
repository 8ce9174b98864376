//! Weak forms and the argument roles they are differentiated against.
//!
//! The PDE residual r(u, m, p) takes a state, a parameter and an adjoint
//! argument. Every derivative the inverse problem needs is a first or
//! mixed second derivative of r with respect to these roles.

mod advection_diffusion;
mod variational;

pub use advection_diffusion::AdvectionDiffusionForm;
pub use variational::{FormPoint, LocalPoint, VariationalForm};

use std::fmt;

use crate::time::TimeDependentVector;

/// The three argument roles of the residual.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// PDE solution u, time-indexed
    State,
    /// Inferred field m, a single spatial vector
    Parameter,
    /// Lagrange multiplier p, time-indexed
    Adjoint,
}

impl Role {
    /// All roles in canonical order.
    pub const ALL: [Role; 3] = [Role::State, Role::Parameter, Role::Adjoint];

    /// Whether vectors of this role carry a time dimension.
    #[inline]
    pub fn is_time_indexed(self) -> bool {
        !matches!(self, Role::Parameter)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::State => "state",
            Role::Parameter => "parameter",
            Role::Adjoint => "adjoint",
        };
        f.write_str(name)
    }
}

/// Read-only argument in the layout of some role.
#[derive(Clone, Copy, Debug)]
pub enum Field<'a> {
    /// Time-indexed vector (state or adjoint layout)
    Series(&'a TimeDependentVector),
    /// Spatial vector (parameter layout)
    Vector(&'a [f64]),
}

impl<'a> Field<'a> {
    /// Whether this layout fits `role`.
    pub fn matches(&self, role: Role) -> bool {
        matches!(
            (self, role.is_time_indexed()),
            (Field::Series(_), true) | (Field::Vector(_), false)
        )
    }

    /// Spatial slice at stamp index `i`; spatial vectors ignore the index.
    pub fn snapshot(&self, i: usize) -> &'a [f64] {
        match *self {
            Field::Series(s) => s.at(i),
            Field::Vector(v) => v,
        }
    }
}

/// Output argument in the layout of some role.
#[derive(Debug)]
pub enum FieldMut<'a> {
    /// Time-indexed vector (state or adjoint layout)
    Series(&'a mut TimeDependentVector),
    /// Spatial vector (parameter layout)
    Vector(&'a mut [f64]),
}

impl FieldMut<'_> {
    /// Whether this layout fits `role`.
    pub fn matches(&self, role: Role) -> bool {
        matches!(
            (self, role.is_time_indexed()),
            (FieldMut::Series(_), true) | (FieldMut::Vector(_), false)
        )
    }

    /// Set every entry to zero.
    pub fn zero(&mut self) {
        match self {
            FieldMut::Series(s) => s.zero(),
            FieldMut::Vector(v) => v.iter_mut().for_each(|x| *x = 0.0),
        }
    }
}
