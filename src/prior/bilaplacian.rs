//! Bi-Laplacian prior with precision R = A M⁻¹ A, A = γK + δM.

use crate::fem::P1Space;
use crate::linalg::vector::dot;
use crate::linalg::{LinearSolver, LuSolver, SparseMatrix};

use super::{check_len, Prior, PriorError};

/// Elliptic Gaussian prior on a P1 parameter space.
///
/// γ controls the correlation strength and δ the pointwise variance;
/// the correlation length scales like √(γ/δ).
pub struct BiLaplacianPrior {
    gamma: f64,
    delta: f64,
    mean: Vec<f64>,
    /// A = γK + δM
    operator: SparseMatrix,
    mass: SparseMatrix,
    operator_solver: LuSolver,
    mass_solver: LuSolver,
}

impl BiLaplacianPrior {
    /// Build the prior with zero mean.
    pub fn new(space: &P1Space, gamma: f64, delta: f64) -> Result<Self, PriorError> {
        for (name, value) in [("gamma", gamma), ("delta", delta)] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(PriorError::InvalidCoefficient { name, value });
            }
        }

        let mass = space.mass_matrix();
        let mut operator = space.stiffness_matrix();
        operator.scale(gamma);
        let operator = operator.add_scaled(delta, &mass)?;

        let operator_solver = LuSolver::factorized(&operator)?;
        let mass_solver = LuSolver::factorized(&mass)?;

        log::debug!(
            "Bi-Laplacian prior: gamma={gamma:.3e}, delta={delta:.3e}, dim={}",
            space.dim()
        );

        Ok(Self {
            gamma,
            delta,
            mean: vec![0.0; space.dim()],
            operator,
            mass,
            operator_solver,
            mass_solver,
        })
    }

    /// Replace the prior mean.
    pub fn set_mean(&mut self, mean: Vec<f64>) -> Result<(), PriorError> {
        check_len(self.mean.len(), mean.len())?;
        self.mean = mean;
        Ok(())
    }

    /// Builder form of [`set_mean`](Self::set_mean).
    pub fn with_mean(mut self, mean: Vec<f64>) -> Result<Self, PriorError> {
        self.set_mean(mean)?;
        Ok(self)
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Parameter mass matrix.
    pub fn mass(&self) -> &SparseMatrix {
        &self.mass
    }
}

impl Prior for BiLaplacianPrior {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn mean(&self) -> &[f64] {
        &self.mean
    }

    fn cost(&self, m: &[f64]) -> Result<f64, PriorError> {
        check_len(self.dim(), m.len())?;
        let dm: Vec<f64> = m.iter().zip(&self.mean).map(|(a, b)| a - b).collect();
        let mut rdm = vec![0.0; dm.len()];
        self.apply_r(&dm, &mut rdm)?;
        Ok(0.5 * dot(&dm, &rdm))
    }

    fn apply_r(&self, x: &[f64], out: &mut [f64]) -> Result<(), PriorError> {
        let n = self.dim();
        check_len(n, x.len())?;
        check_len(n, out.len())?;
        let mut ax = vec![0.0; n];
        let mut minv_ax = vec![0.0; n];
        self.operator.mul_vec(x, &mut ax)?;
        self.mass_solver.solve(&ax, &mut minv_ax)?;
        self.operator.mul_vec(&minv_ax, out)?;
        Ok(())
    }

    fn r_solve(&self, rhs: &[f64], out: &mut [f64]) -> Result<(), PriorError> {
        let n = self.dim();
        check_len(n, rhs.len())?;
        check_len(n, out.len())?;
        let mut y = vec![0.0; n];
        let mut my = vec![0.0; n];
        self.operator_solver.solve(rhs, &mut y)?;
        self.mass.mul_vec(&y, &mut my)?;
        self.operator_solver.solve(&my, out)?;
        Ok(())
    }

    fn m_solve(&self, rhs: &[f64], out: &mut [f64]) -> Result<(), PriorError> {
        check_len(self.dim(), rhs.len())?;
        self.mass_solver.solve(rhs, out)?;
        Ok(())
    }
}
