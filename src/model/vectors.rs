//! Vector layouts exchanged with the optimization driver.

use std::fmt;
use std::str::FromStr;

use crate::forms::{Field, FieldMut, Role};
use crate::time::{TimeDependentVector, TimeGrid};

use super::ModelError;

/// Which part of x = [u, m, p] a generated vector covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    /// The full triple
    All,
    State,
    Parameter,
    Adjoint,
}

impl Component {
    /// The single role this component stands for, if any.
    pub fn role(self) -> Option<Role> {
        match self {
            Component::All => None,
            Component::State => Some(Role::State),
            Component::Parameter => Some(Role::Parameter),
            Component::Adjoint => Some(Role::Adjoint),
        }
    }
}

impl From<Role> for Component {
    fn from(role: Role) -> Self {
        match role {
            Role::State => Component::State,
            Role::Parameter => Component::Parameter,
            Role::Adjoint => Component::Adjoint,
        }
    }
}

impl FromStr for Component {
    type Err = ModelError;

    /// Parse the tags `ALL`, `STATE`, `PARAMETER` and `ADJOINT`
    /// (case-insensitive). Anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Component::All),
            "STATE" => Ok(Component::State),
            "PARAMETER" => Ok(Component::Parameter),
            "ADJOINT" => Ok(Component::Adjoint),
            _ => Err(ModelError::UnknownComponent(s.to_string())),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Component::All => "ALL",
            Component::State => "STATE",
            Component::Parameter => "PARAMETER",
            Component::Adjoint => "ADJOINT",
        };
        f.write_str(tag)
    }
}

/// The triple x = [u, m, p].
#[derive(Clone, Debug, PartialEq)]
pub struct ModelVectors {
    /// State history
    pub u: TimeDependentVector,
    /// Parameter
    pub m: Vec<f64>,
    /// Adjoint history
    pub p: TimeDependentVector,
}

impl ModelVectors {
    /// Zero triple on `grid` with spatial dimension `dim`.
    pub fn zeros(grid: &TimeGrid, dim: usize) -> Self {
        Self {
            u: TimeDependentVector::new(grid.clone(), dim),
            m: vec![0.0; dim],
            p: TimeDependentVector::new(grid.clone(), dim),
        }
    }

    /// Read-only view of one role.
    pub fn field(&self, role: Role) -> Field<'_> {
        match role {
            Role::State => Field::Series(&self.u),
            Role::Parameter => Field::Vector(&self.m),
            Role::Adjoint => Field::Series(&self.p),
        }
    }

    /// Mutable view of one role.
    pub fn field_mut(&mut self, role: Role) -> FieldMut<'_> {
        match role {
            Role::State => FieldMut::Series(&mut self.u),
            Role::Parameter => FieldMut::Vector(&mut self.m),
            Role::Adjoint => FieldMut::Series(&mut self.p),
        }
    }
}

/// A zero-initialized vector returned by `generate_vector`.
#[derive(Clone, Debug, PartialEq)]
pub enum GeneratedVector {
    All(ModelVectors),
    State(TimeDependentVector),
    Parameter(Vec<f64>),
    Adjoint(TimeDependentVector),
}

impl GeneratedVector {
    pub fn component(&self) -> Component {
        match self {
            GeneratedVector::All(_) => Component::All,
            GeneratedVector::State(_) => Component::State,
            GeneratedVector::Parameter(_) => Component::Parameter,
            GeneratedVector::Adjoint(_) => Component::Adjoint,
        }
    }

    /// The full triple, if this is one.
    pub fn into_all(self) -> Option<ModelVectors> {
        match self {
            GeneratedVector::All(x) => Some(x),
            _ => None,
        }
    }

    /// The time-indexed vector of a state or adjoint component.
    pub fn into_series(self) -> Option<TimeDependentVector> {
        match self {
            GeneratedVector::State(v) | GeneratedVector::Adjoint(v) => Some(v),
            _ => None,
        }
    }

    /// The parameter vector of a parameter component.
    pub fn into_parameter(self) -> Option<Vec<f64>> {
        match self {
            GeneratedVector::Parameter(v) => Some(v),
            _ => None,
        }
    }
}
