//! Factorized implicit operators for one parameter value.

use crate::fem::SupgOperators;
use crate::forms::VariationalForm;
use crate::linalg::{LinearSolver, LuSolver, SparseMatrix};

use super::ModelError;

/// L = M + Δt N(m) + stab and Lᵀ, factorized for a fixed parameter m.
///
/// Built by [`TimeDependentAD::prepare`](super::TimeDependentAD::prepare)
/// and reused for every step of the solves at that parameter.
pub struct PreparedOperator {
    parameter: Vec<f64>,
    forward: LuSolver,
    adjoint: LuSolver,
}

impl PreparedOperator {
    pub(crate) fn new<F: VariationalForm + ?Sized>(
        form: &F,
        supg: &SupgOperators,
        dt: f64,
        m: &[f64],
    ) -> Result<Self, ModelError> {
        let n = form.space().dim();
        if m.len() != n {
            return Err(ModelError::Config(format!(
                "parameter has length {}, expected {n}",
                m.len()
            )));
        }

        let implicit = |transport: SparseMatrix| -> Result<SparseMatrix, ModelError> {
            Ok(supg.mass.add_scaled(dt, &transport)?.add_scaled(1.0, &supg.stab)?)
        };
        let l = implicit(form.assemble_operator(m))?;
        let lt = implicit(form.assemble_transpose_operator(m))?;

        let forward = LuSolver::factorized(&l)?;
        let adjoint = LuSolver::factorized(&lt)?;
        log::debug!("Prepared implicit operators: n={n}, nnz={}", l.nnz());

        Ok(Self {
            parameter: m.to_vec(),
            forward,
            adjoint,
        })
    }

    /// The parameter the operators were built for.
    pub fn parameter(&self) -> &[f64] {
        &self.parameter
    }

    /// Whether this operator was built for exactly `m`.
    pub fn matches(&self, m: &[f64]) -> bool {
        self.parameter.as_slice() == m
    }

    /// Error unless built for `m`.
    pub(crate) fn check(&self, m: &[f64]) -> Result<(), ModelError> {
        if self.matches(m) {
            Ok(())
        } else {
            Err(ModelError::StaleOperator)
        }
    }

    /// Solve L x = rhs.
    pub(crate) fn solve_forward(&self, rhs: &[f64], out: &mut [f64]) -> Result<(), ModelError> {
        self.forward.solve(rhs, out)?;
        Ok(())
    }

    /// Solve Lᵀ x = rhs.
    pub(crate) fn solve_adjoint(&self, rhs: &[f64], out: &mut [f64]) -> Result<(), ModelError> {
        self.adjoint.solve(rhs, out)?;
        Ok(())
    }
}
