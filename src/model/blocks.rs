//! Second-derivative blocks of the time-discrete Lagrangian.
//!
//! Block (i, j) maps a direction in role j to a vector in role i:
//!
//! out_i = Δt Σ_t ∂/∂(i) [∂r/∂(j)(u_t, m, p_t) · d_t]
//!
//! where the sum is kept per stamp when role i is time-indexed and
//! collapsed when i is the parameter. The stamp t0 never contributes
//! because the initial condition is fixed.

use std::fmt;

use crate::forms::{Field, FormPoint, Role, VariationalForm};
use crate::linalg::vector;
use crate::time::TimeDependentVector;

use super::{BlockStrategy, ModelError};

/// Shape of a block's output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutput {
    /// One vector per stamp, zero at t0
    Series,
    /// A single spatial vector summed over stamps
    Accumulated,
}

/// A supported role pair (i, j). Only the constants below exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    /// Output role
    pub i: Role,
    /// Direction role
    pub j: Role,
    name: &'static str,
}

impl Block {
    /// ∂²/∂u∂m
    pub const WUM: Block = Block::new(Role::State, Role::Parameter, "Wum");
    /// ∂²/∂p∂m, the linearized forward source
    pub const C: Block = Block::new(Role::Adjoint, Role::Parameter, "C");
    /// ∂²/∂m∂m
    pub const WMM: Block = Block::new(Role::Parameter, Role::Parameter, "Wmm");
    /// ∂²/∂m∂p
    pub const CT: Block = Block::new(Role::Parameter, Role::Adjoint, "Ct");
    /// ∂²/∂m∂u
    pub const WMU: Block = Block::new(Role::Parameter, Role::State, "Wmu");

    /// Every block the model evaluates itself.
    pub const TABLE: [Block; 5] = [Block::WUM, Block::C, Block::WMM, Block::CT, Block::WMU];

    const fn new(i: Role, j: Role, name: &'static str) -> Self {
        Self { i, j, name }
    }

    /// Look up (i, j).
    ///
    /// `Ok(None)` for (state, state), which is identically zero in the
    /// model and supplied by the misfit. Pairs outside the table are
    /// rejected.
    pub fn lookup(i: Role, j: Role) -> Result<Option<Block>, ModelError> {
        if (i, j) == (Role::State, Role::State) {
            return Ok(None);
        }
        Self::TABLE
            .iter()
            .copied()
            .find(|b| b.i == i && b.j == j)
            .map(Some)
            .ok_or(ModelError::UnsupportedBlock { i, j })
    }

    pub fn output(&self) -> BlockOutput {
        if self.i.is_time_indexed() {
            BlockOutput::Series
        } else {
            BlockOutput::Accumulated
        }
    }

    /// Conventional name of the block.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Contribution at a single stamp, before the Δt weight.
    fn evaluate<F: VariationalForm + ?Sized>(
        &self,
        form: &F,
        strategy: BlockStrategy,
        point: &FormPoint<'_>,
        direction: &[f64],
        out: &mut [f64],
    ) -> Result<(), ModelError> {
        match strategy {
            BlockStrategy::Directional => {
                form.second_derivative_action(self.i, self.j, point, direction, out);
            }
            BlockStrategy::Assembled => {
                let w = form.assemble_second_derivative(self.i, self.j, point);
                w.mul_vec(direction, out)?;
            }
        }
        Ok(())
    }

    /// Apply the block to a direction, writing one vector per stamp.
    pub(crate) fn apply_series<F: VariationalForm + ?Sized>(
        &self,
        at: &BlockContext<'_, F>,
        direction: Field<'_>,
        out: &mut TimeDependentVector,
    ) -> Result<(), ModelError> {
        out.zero();
        for step in 1..at.u.n_steps() {
            let target = out.at_mut(step);
            self.evaluate(at.form, at.strategy, &at.point(step), direction.snapshot(step), target)?;
            vector::scale(at.dt, target);
        }
        log::trace!("Applied {} over {} steps", self.name(), at.u.n_steps() - 1);
        Ok(())
    }

    /// Apply the block to a direction and sum over stamps.
    pub(crate) fn apply_accumulated<F: VariationalForm + ?Sized>(
        &self,
        at: &BlockContext<'_, F>,
        direction: Field<'_>,
        out: &mut [f64],
    ) -> Result<(), ModelError> {
        let sum = accumulate_steps(at.u.n_steps(), at.m.len(), |step| {
            let mut local = vec![0.0; at.m.len()];
            self.evaluate(at.form, at.strategy, &at.point(step), direction.snapshot(step), &mut local)?;
            Ok(local)
        })?;
        out.copy_from_slice(&sum);
        vector::scale(at.dt, out);
        Ok(())
    }
}

/// The frozen history a block is evaluated at.
pub(crate) struct BlockContext<'a, F: ?Sized> {
    pub form: &'a F,
    pub strategy: BlockStrategy,
    pub u: &'a TimeDependentVector,
    pub m: &'a [f64],
    pub p: &'a TimeDependentVector,
    pub dt: f64,
}

impl<'a, F: ?Sized> BlockContext<'a, F> {
    fn point(&self, step: usize) -> FormPoint<'a> {
        FormPoint {
            u: self.u.at(step),
            m: self.m,
            p: self.p.at(step),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name(), self.i, self.j)
    }
}

/// Σ_{step ≥ 1} contribution(step).
#[cfg(not(feature = "parallel"))]
pub(crate) fn accumulate_steps<G>(n_steps: usize, dim: usize, contribution: G) -> Result<Vec<f64>, ModelError>
where
    G: Fn(usize) -> Result<Vec<f64>, ModelError>,
{
    let mut sum = vec![0.0; dim];
    for step in 1..n_steps {
        vector::axpy(1.0, &contribution(step)?, &mut sum);
    }
    Ok(sum)
}

/// Σ_{step ≥ 1} contribution(step), evaluated across threads.
#[cfg(feature = "parallel")]
pub(crate) fn accumulate_steps<G>(n_steps: usize, dim: usize, contribution: G) -> Result<Vec<f64>, ModelError>
where
    G: Fn(usize) -> Result<Vec<f64>, ModelError> + Sync + Send,
{
    use rayon::prelude::*;

    (1..n_steps)
        .into_par_iter()
        .map(contribution)
        .try_reduce(
            || vec![0.0; dim],
            |mut a, b| {
                vector::axpy(1.0, &b, &mut a);
                Ok(a)
            },
        )
}
