//! Forward, adjoint and incremental solves, the reduced gradient and the
//! Hessian block dispatch.

use std::path::Path;

use crate::fem::{P1Space, SupgOperators, WindField};
use crate::forms::{AdvectionDiffusionForm, Field, FieldMut, FormPoint, Role, VariationalForm};
use crate::io::export_state;
use crate::linalg::vector;
use crate::misfit::Misfit;
use crate::polynomial::GaussLegendre;
use crate::prior::{Prior, RSolver};
use crate::time::{TimeDependentVector, TimeGrid};

use super::blocks::{accumulate_steps, BlockContext};
use super::{
    Block, BlockOutput, Component, GeneratedVector, ModelConfig, ModelError, ModelVectors,
    PreparedOperator,
};

/// The frozen point x = [u, m, p] of second-derivative evaluations.
pub struct LinearizationPoint {
    x: ModelVectors,
    operator: PreparedOperator,
    gauss_newton: bool,
}

impl LinearizationPoint {
    pub fn x(&self) -> &ModelVectors {
        &self.x
    }

    /// Operators factorized at the frozen parameter.
    pub fn operator(&self) -> &PreparedOperator {
        &self.operator
    }

    pub fn gauss_newton(&self) -> bool {
        self.gauss_newton
    }
}

/// Time-dependent advection-diffusion model with a log-diffusivity parameter.
pub struct TimeDependentAD<P, F> {
    form: AdvectionDiffusionForm,
    supg: SupgOperators,
    prior: P,
    misfit: F,
    grid: TimeGrid,
    dt: f64,
    initial_condition: Vec<f64>,
    config: ModelConfig,
    linearization: Option<LinearizationPoint>,
}

impl<P: Prior, F: Misfit> TimeDependentAD<P, F> {
    /// Assemble the constant operators.
    ///
    /// The simulation grid must be uniform, every observation time of the
    /// misfit must be one of its stamps, and the prior and initial
    /// condition must match the space dimension.
    pub fn new(
        space: P1Space,
        wind: WindField,
        prior: P,
        misfit: F,
        simulation_times: TimeGrid,
        initial_condition: Vec<f64>,
        config: ModelConfig,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        let dt = simulation_times.uniform_step()?;

        let n = space.dim();
        if wind.len() != space.n_elements() {
            return Err(ModelError::Config(format!(
                "wind has {} values for {} elements",
                wind.len(),
                space.n_elements()
            )));
        }
        if prior.dim() != n {
            return Err(ModelError::Config(format!(
                "prior dimension {} does not match space dimension {n}",
                prior.dim()
            )));
        }
        if initial_condition.len() != n {
            return Err(ModelError::Config(format!(
                "initial condition has length {}, expected {n}",
                initial_condition.len()
            )));
        }
        for &t in misfit.observation_times() {
            simulation_times.index_of(t)?;
        }

        if config.stabilization.enabled && wind.max_speed() == 0.0 {
            log::warn!("Stabilization enabled with zero wind; tau falls back to h^2/(2 kappa)");
        }

        let space = P1Space::with_quadrature(
            space.mesh,
            &GaussLegendre::new(config.quadrature_points),
        );
        let supg = SupgOperators::assemble(&space, &wind, dt, &config.stabilization);
        let form = AdvectionDiffusionForm::new(space, wind)?;

        log::debug!(
            "TimeDependentAD: {n} dofs, {} stamps, dt={dt:.3e}, {} observation times",
            simulation_times.len(),
            misfit.observation_times().len()
        );

        Ok(Self {
            form,
            supg,
            prior,
            misfit,
            grid: simulation_times,
            dt,
            initial_condition,
            config,
            linearization: None,
        })
    }

    pub fn space(&self) -> &P1Space {
        self.form.space()
    }

    pub fn form(&self) -> &AdvectionDiffusionForm {
        &self.form
    }

    pub fn operators(&self) -> &SupgOperators {
        &self.supg
    }

    pub fn prior(&self) -> &P {
        &self.prior
    }

    pub fn misfit(&self) -> &F {
        &self.misfit
    }

    pub fn misfit_mut(&mut self) -> &mut F {
        &mut self.misfit
    }

    pub fn simulation_times(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn initial_condition(&self) -> &[f64] {
        &self.initial_condition
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The frozen linearization point, if any.
    pub fn linearization_point(&self) -> Option<&LinearizationPoint> {
        self.linearization.as_ref()
    }

    /// Gauss-Newton flag of the current linearization point.
    pub fn gauss_newton(&self) -> Result<bool, ModelError> {
        Ok(self.linearized()?.gauss_newton)
    }

    fn dim(&self) -> usize {
        self.space().dim()
    }

    /// Zero vectors of the requested component.
    pub fn generate_vector(&self, component: Component) -> GeneratedVector {
        let n = self.dim();
        match component {
            Component::All => GeneratedVector::All(ModelVectors::zeros(&self.grid, n)),
            Component::State => GeneratedVector::State(self.generate_series()),
            Component::Parameter => GeneratedVector::Parameter(vec![0.0; n]),
            Component::Adjoint => GeneratedVector::Adjoint(self.generate_series()),
        }
    }

    /// [`generate_vector`](Self::generate_vector) from a string tag.
    pub fn generate_vector_by_tag(&self, tag: &str) -> Result<GeneratedVector, ModelError> {
        Ok(self.generate_vector(tag.parse()?))
    }

    /// Zero triple x = [u, m, p].
    pub fn generate_vectors(&self) -> ModelVectors {
        ModelVectors::zeros(&self.grid, self.dim())
    }

    /// Zero vector on the simulation grid.
    pub fn generate_series(&self) -> TimeDependentVector {
        TimeDependentVector::new(self.grid.clone(), self.dim())
    }

    /// [total, regularization, misfit]
    pub fn cost(&self, x: &ModelVectors) -> Result<[f64; 3], ModelError> {
        let reg = self.prior.cost(&x.m)?;
        let misfit = self.misfit.cost(x)?;
        Ok([reg + misfit, reg, misfit])
    }

    /// Assemble and factorize L(m) and Lᵀ(m).
    pub fn prepare(&self, m: &[f64]) -> Result<PreparedOperator, ModelError> {
        PreparedOperator::new(&self.form, &self.supg, self.dt, m)
    }

    /// Forward solve at parameter `m`.
    ///
    /// Stores the initial condition at t0 and marches
    /// L u(t) = M_stab u(t - Δt). Returns the operator it prepared so that
    /// the adjoint solve can reuse it.
    pub fn solve_fwd(
        &self,
        out: &mut TimeDependentVector,
        m: &[f64],
    ) -> Result<PreparedOperator, ModelError> {
        let prepared = self.prepare(m)?;
        self.solve_fwd_with(out, &prepared)?;
        Ok(prepared)
    }

    /// Forward solve with an already prepared operator.
    pub fn solve_fwd_with(
        &self,
        out: &mut TimeDependentVector,
        prepared: &PreparedOperator,
    ) -> Result<(), ModelError> {
        self.check_series(out)?;
        out.zero();
        out.at_mut(0).copy_from_slice(&self.initial_condition);
        self.march_forward(out, prepared, None)?;
        log::debug!("Forward solve: {} steps", self.grid.len() - 1);
        Ok(())
    }

    /// Adjoint solve at the history and parameter of `x`.
    ///
    /// Marches Lᵀ p(t) = Mt_stab p(t + Δt) - g(t) backward over every stamp
    /// with g the misfit state gradient and no contribution past the final
    /// time. `out` is a separate vector; move it into `x.p` afterwards.
    pub fn solve_adj(&self, out: &mut TimeDependentVector, x: &ModelVectors) -> Result<(), ModelError> {
        let prepared = self.prepare(&x.m)?;
        self.solve_adj_with(out, x, &prepared)
    }

    /// Adjoint solve with an operator prepared for `x.m`.
    pub fn solve_adj_with(
        &self,
        out: &mut TimeDependentVector,
        x: &ModelVectors,
        prepared: &PreparedOperator,
    ) -> Result<(), ModelError> {
        prepared.check(&x.m)?;
        self.check_series(out)?;

        let mut grad_state = self.generate_series();
        self.misfit
            .grad(Role::State, x, FieldMut::Series(&mut grad_state))?;

        self.march_backward(out, prepared, &grad_state)?;
        log::debug!("Adjoint solve: {} steps", self.grid.len());
        Ok(())
    }

    /// Linearized forward solve L û(t) = M_stab û(t - Δt) - rhs(t), û(t0) = 0,
    /// with the operator of the linearization point.
    pub fn solve_fwd_incremental(
        &self,
        sol: &mut TimeDependentVector,
        rhs: &TimeDependentVector,
    ) -> Result<(), ModelError> {
        let point = self.linearized()?;
        self.check_series(sol)?;
        self.check_series(rhs)?;
        sol.zero();
        self.march_forward(sol, &point.operator, Some(rhs))
    }

    /// Linearized adjoint solve Lᵀ p̂(t) = Mt_stab p̂(t + Δt) - rhs(t), with
    /// the operator of the linearization point.
    pub fn solve_adj_incremental(
        &self,
        sol: &mut TimeDependentVector,
        rhs: &TimeDependentVector,
    ) -> Result<(), ModelError> {
        let point = self.linearized()?;
        self.check_series(sol)?;
        self.check_series(rhs)?;
        self.march_backward(sol, &point.operator, rhs)
    }

    /// u(t) from u(t - Δt) for every stamp after the first; `out` holds u(t0).
    fn march_forward(
        &self,
        out: &mut TimeDependentVector,
        prepared: &PreparedOperator,
        source: Option<&TimeDependentVector>,
    ) -> Result<(), ModelError> {
        let n = self.dim();
        let mut rhs = vec![0.0; n];
        let mut next = vec![0.0; n];
        for step in 1..self.grid.len() {
            self.supg.mass_stab.mul_vec(out.at(step - 1), &mut rhs)?;
            if let Some(source) = source {
                vector::axpy(-1.0, source.at(step), &mut rhs);
            }
            prepared.solve_forward(&rhs, &mut next)?;
            out.at_mut(step).copy_from_slice(&next);
            log::trace!("Forward step {step} at t={:.4}", self.grid.times()[step]);
        }
        Ok(())
    }

    /// p(t) from p(t + Δt), backward over every stamp including t0.
    fn march_backward(
        &self,
        out: &mut TimeDependentVector,
        prepared: &PreparedOperator,
        forcing: &TimeDependentVector,
    ) -> Result<(), ModelError> {
        let n = self.dim();
        let mut previous = vec![0.0; n];
        let mut rhs = vec![0.0; n];
        out.zero();
        for step in (0..self.grid.len()).rev() {
            self.supg.mass_stab_t.mul_vec(&previous, &mut rhs)?;
            vector::axpy(-1.0, forcing.at(step), &mut rhs);
            prepared.solve_adjoint(&rhs, out.at_mut(step))?;
            previous.copy_from_slice(out.at(step));
            log::trace!("Adjoint step {step} at t={:.4}", self.grid.times()[step]);
        }
        Ok(())
    }

    /// Reduced gradient into `mg`; returns (g, mg) with g = M⁻¹ mg.
    ///
    /// mg = R (m - mean) + Δt Σ_{t > t0} ∂r/∂m(u(t), m, p(t)). The prior term
    /// is skipped when `misfit_only` is set.
    pub fn eval_gradient_parameter(
        &self,
        x: &ModelVectors,
        mg: &mut [f64],
        misfit_only: bool,
    ) -> Result<f64, ModelError> {
        let n = self.dim();
        self.check_parameter(mg)?;
        self.check_vectors(x)?;

        if misfit_only {
            mg.iter_mut().for_each(|v| *v = 0.0);
        } else {
            let dm: Vec<f64> = x.m.iter().zip(self.prior.mean()).map(|(a, b)| a - b).collect();
            self.prior.apply_r(&dm, mg)?;
        }

        let pde = accumulate_steps(self.grid.len(), n, |step| {
            let mut local = vec![0.0; n];
            let point = FormPoint {
                u: x.u.at(step),
                m: &x.m,
                p: x.p.at(step),
            };
            self.form.first_derivative(Role::Parameter, &point, &mut local);
            Ok(local)
        })?;
        vector::axpy(self.dt, &pde, mg);

        let mut g = vec![0.0; n];
        self.prior.m_solve(mg, &mut g)?;
        let grad_norm = vector::dot(&g, mg);
        log::debug!("Reduced gradient: (g, g) = {grad_norm:.6e}");
        Ok(grad_norm)
    }

    /// Freeze x for subsequent Hessian actions and factorize at x.m.
    pub fn set_point_for_hessian_evaluations(
        &mut self,
        x: &ModelVectors,
        gauss_newton: bool,
    ) -> Result<(), ModelError> {
        self.check_vectors(x)?;
        let operator = self.prepare(&x.m)?;
        self.misfit.set_linearization_point(x, gauss_newton);
        self.linearization = Some(LinearizationPoint {
            x: x.clone(),
            operator,
            gauss_newton,
        });
        log::debug!("Linearization point set (gauss_newton={gauss_newton})");
        Ok(())
    }

    fn linearized(&self) -> Result<&LinearizationPoint, ModelError> {
        self.linearization
            .as_ref()
            .ok_or(ModelError::NoLinearizationPoint)
    }

    /// out = block (i, j) applied to `direction` at the linearization point.
    ///
    /// Time-indexed outputs are zero at t0. (state, state) is zero here;
    /// its misfit part is [`apply_wuu`](Self::apply_wuu).
    pub fn apply_ij(
        &self,
        i: Role,
        j: Role,
        direction: Field<'_>,
        mut out: FieldMut<'_>,
    ) -> Result<(), ModelError> {
        let point = self.linearized()?;
        let block = Block::lookup(i, j)?;
        self.check_field(j, &direction)?;
        self.check_field_mut(i, &out)?;

        let Some(block) = block else {
            out.zero();
            return Ok(());
        };

        let at = BlockContext {
            form: &self.form,
            strategy: self.config.strategy,
            u: &point.x.u,
            m: &point.x.m,
            p: &point.x.p,
            dt: self.dt,
        };
        match (block.output(), out) {
            (BlockOutput::Series, FieldMut::Series(out)) => block.apply_series(&at, direction, out),
            (BlockOutput::Accumulated, FieldMut::Vector(out)) => {
                block.apply_accumulated(&at, direction, out)
            }
            _ => Err(ModelError::LayoutMismatch(i)),
        }
    }

    /// C m̂ = Δt ∂²r/∂p∂m · m̂ per stamp.
    pub fn apply_c(&self, dm: &[f64], out: &mut TimeDependentVector) -> Result<(), ModelError> {
        self.apply_ij(Role::Adjoint, Role::Parameter, Field::Vector(dm), FieldMut::Series(out))
    }

    /// Cᵀ p̂
    pub fn apply_ct(&self, dp: &TimeDependentVector, out: &mut [f64]) -> Result<(), ModelError> {
        self.apply_ij(Role::Parameter, Role::Adjoint, Field::Series(dp), FieldMut::Vector(out))
    }

    /// Misfit Hessian applied to a state direction.
    pub fn apply_wuu(&self, du: &TimeDependentVector, out: &mut TimeDependentVector) -> Result<(), ModelError> {
        self.linearized()?;
        self.check_series(du)?;
        self.check_series(out)?;
        self.misfit.apply_ij(
            Role::State,
            Role::State,
            Field::Series(du),
            FieldMut::Series(out),
        )?;
        Ok(())
    }

    pub fn apply_wum(&self, dm: &[f64], out: &mut TimeDependentVector) -> Result<(), ModelError> {
        self.apply_ij(Role::State, Role::Parameter, Field::Vector(dm), FieldMut::Series(out))
    }

    pub fn apply_wmu(&self, du: &TimeDependentVector, out: &mut [f64]) -> Result<(), ModelError> {
        self.apply_ij(Role::Parameter, Role::State, Field::Series(du), FieldMut::Vector(out))
    }

    /// Prior precision R applied to a parameter direction.
    pub fn apply_r(&self, dm: &[f64], out: &mut [f64]) -> Result<(), ModelError> {
        self.prior.apply_r(dm, out)?;
        Ok(())
    }

    pub fn apply_wmm(&self, dm: &[f64], out: &mut [f64]) -> Result<(), ModelError> {
        self.apply_ij(Role::Parameter, Role::Parameter, Field::Vector(dm), FieldMut::Vector(out))
    }

    /// Solver for the prior precision R.
    pub fn r_solver(&self) -> RSolver<'_> {
        RSolver::new(&self.prior)
    }

    /// Write the state history of `x` and its parameter for visualization.
    pub fn export_state(
        &self,
        x: &ModelVectors,
        path: impl AsRef<Path>,
        name: &str,
    ) -> Result<(), ModelError> {
        self.check_vectors(x)?;
        export_state(path, &self.space().mesh, &x.u, &x.m, name)?;
        Ok(())
    }

    fn check_series(&self, v: &TimeDependentVector) -> Result<(), ModelError> {
        if v.grid() != &self.grid {
            return Err(crate::time::TimeGridError::GridMismatch.into());
        }
        if v.dim() != self.dim() {
            return Err(crate::time::TimeGridError::DimensionMismatch {
                expected: self.dim(),
                actual: v.dim(),
            }
            .into());
        }
        Ok(())
    }

    fn check_parameter(&self, v: &[f64]) -> Result<(), ModelError> {
        if v.len() == self.dim() {
            Ok(())
        } else {
            Err(ModelError::LayoutMismatch(Role::Parameter))
        }
    }

    fn check_vectors(&self, x: &ModelVectors) -> Result<(), ModelError> {
        self.check_series(&x.u)?;
        self.check_series(&x.p)?;
        self.check_parameter(&x.m)
    }

    fn check_field(&self, role: Role, field: &Field<'_>) -> Result<(), ModelError> {
        match field {
            Field::Series(s) if role.is_time_indexed() => self.check_series(s),
            Field::Vector(v) if !role.is_time_indexed() => self.check_parameter(v),
            _ => Err(ModelError::LayoutMismatch(role)),
        }
    }

    fn check_field_mut(&self, role: Role, field: &FieldMut<'_>) -> Result<(), ModelError> {
        match field {
            FieldMut::Series(s) if role.is_time_indexed() => self.check_series(s),
            FieldMut::Vector(v) if !role.is_time_indexed() => self.check_parameter(v),
            _ => Err(ModelError::LayoutMismatch(role)),
        }
    }
}
