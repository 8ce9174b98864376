//! Pointwise-in-space, discrete-in-time state observations.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::fem::{assemble_pointwise_observation, P1Space};
use crate::forms::{Field, FieldMut, Role};
use crate::linalg::vector::{dot, norm_linf};
use crate::linalg::SparseMatrix;
use crate::model::ModelVectors;
use crate::time::{TimeDependentVector, TimeGrid};

use super::{Misfit, MisfitError};

/// Quadratic misfit Σ_t |B u(t) - d(t)|² / (2σ²) over observation times.
///
/// B samples a P1 state at fixed target points. The observation times must
/// be stamps of the simulation grid the state lives on; they are looked up,
/// never interpolated.
#[derive(Clone, Debug)]
pub struct PointwiseStateObservation {
    targets: Vec<f64>,
    operator: SparseMatrix,
    data: TimeDependentVector,
    noise_variance: Option<f64>,
}

impl PointwiseStateObservation {
    /// Observation operator for `targets` with zero data on `observation_times`.
    pub fn new(
        space: &P1Space,
        targets: Vec<f64>,
        observation_times: TimeGrid,
    ) -> Result<Self, MisfitError> {
        let operator = assemble_pointwise_observation(space, &targets)?;
        let data = TimeDependentVector::new(observation_times, targets.len());
        Ok(Self {
            targets,
            operator,
            data,
            noise_variance: None,
        })
    }

    /// Use an explicit observation operator.
    pub fn from_operator(
        operator: SparseMatrix,
        observation_times: TimeGrid,
    ) -> Self {
        let data = TimeDependentVector::new(observation_times, operator.n_rows());
        Self {
            targets: Vec::new(),
            operator,
            data,
            noise_variance: None,
        }
    }

    /// Observation locations (empty for explicit operators).
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Number of observed values per time.
    pub fn n_observations(&self) -> usize {
        self.operator.n_rows()
    }

    /// The sampling operator B.
    pub fn operator(&self) -> &SparseMatrix {
        &self.operator
    }

    /// Observed data d.
    pub fn data(&self) -> &TimeDependentVector {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut TimeDependentVector {
        &mut self.data
    }

    /// Replace the data; the grid and dimension must match.
    pub fn set_data(&mut self, data: TimeDependentVector) -> Result<(), MisfitError> {
        if data.grid() != self.data.grid() {
            return Err(crate::time::TimeGridError::GridMismatch.into());
        }
        if data.dim() != self.n_observations() {
            return Err(MisfitError::DimensionMismatch {
                expected: self.n_observations(),
                actual: data.dim(),
            });
        }
        self.data = data;
        Ok(())
    }

    /// σ², if set.
    pub fn noise_variance(&self) -> Option<f64> {
        self.noise_variance
    }

    /// Set σ². Must be strictly positive.
    pub fn set_noise_variance(&mut self, variance: f64) -> Result<(), MisfitError> {
        if !(variance > 0.0) || !variance.is_finite() {
            return Err(MisfitError::InvalidNoiseVariance(variance));
        }
        self.noise_variance = Some(variance);
        Ok(())
    }

    /// σ = `relative_level` · |d|_∞, returned for use with [`add_noise`](Self::add_noise).
    pub fn set_noise_from_relative_level(&mut self, relative_level: f64) -> Result<f64, MisfitError> {
        let std_dev = relative_level * data_scale(self);
        self.set_noise_variance(std_dev * std_dev)?;
        log::debug!("Noise std dev {std_dev:.3e} from relative level {relative_level}");
        Ok(std_dev)
    }

    /// Perturb every data entry with N(0, std_dev²) noise.
    pub fn add_noise<R: Rng + ?Sized>(&mut self, std_dev: f64, rng: &mut R) -> Result<(), MisfitError> {
        let normal =
            Normal::new(0.0, std_dev).map_err(|_| MisfitError::InvalidNoiseVariance(std_dev * std_dev))?;
        for value in self.data.as_mut_slice() {
            *value += normal.sample(rng);
        }
        Ok(())
    }

    /// Fill the data with B u(t) from a state history.
    pub fn synthesize(&mut self, x: &ModelVectors) -> Result<(), MisfitError> {
        let mut obs = self.data.zeros_like();
        self.observe(x, &mut obs)?;
        self.data = obs;
        Ok(())
    }

    fn variance(&self) -> Result<f64, MisfitError> {
        self.noise_variance.ok_or(MisfitError::NoiseVarianceUnset)
    }

    /// B u(t) - d(t) into `residual`.
    fn residual_at(
        &self,
        u: &TimeDependentVector,
        index: usize,
        residual: &mut [f64],
    ) -> Result<(), MisfitError> {
        let t = self.data.times()[index];
        self.operator.mul_vec(u.view(t)?, residual)?;
        for (r, d) in residual.iter_mut().zip(self.data.at(index)) {
            *r -= d;
        }
        Ok(())
    }
}

impl Misfit for PointwiseStateObservation {
    fn observation_times(&self) -> &[f64] {
        self.data.times()
    }

    fn observe(&self, x: &ModelVectors, obs: &mut TimeDependentVector) -> Result<(), MisfitError> {
        if obs.dim() != self.n_observations() {
            return Err(MisfitError::DimensionMismatch {
                expected: self.n_observations(),
                actual: obs.dim(),
            });
        }
        for i in 0..obs.n_steps() {
            let t = obs.times()[i];
            self.operator.mul_vec(x.u.view(t)?, obs.at_mut(i))?;
        }
        Ok(())
    }

    fn cost(&self, x: &ModelVectors) -> Result<f64, MisfitError> {
        let variance = self.variance()?;
        let mut residual = vec![0.0; self.n_observations()];
        let mut total = 0.0;
        for i in 0..self.data.n_steps() {
            self.residual_at(&x.u, i, &mut residual)?;
            total += dot(&residual, &residual);
        }
        Ok(total / (2.0 * variance))
    }

    fn grad(&self, role: Role, x: &ModelVectors, mut out: FieldMut<'_>) -> Result<(), MisfitError> {
        if !out.matches(role) {
            return Err(MisfitError::LayoutMismatch(role));
        }
        let variance = self.variance()?;
        out.zero();

        let FieldMut::Series(out) = out else {
            return Ok(());
        };
        if role != Role::State {
            return Ok(());
        }

        let mut residual = vec![0.0; self.n_observations()];
        for i in 0..self.data.n_steps() {
            self.residual_at(&x.u, i, &mut residual)?;
            let target = out.view_mut(self.data.times()[i])?;
            self.operator.transpose_mul_vec(&residual, target)?;
            target.iter_mut().for_each(|v| *v /= variance);
        }
        Ok(())
    }

    fn apply_ij(
        &self,
        i: Role,
        j: Role,
        direction: Field<'_>,
        mut out: FieldMut<'_>,
    ) -> Result<(), MisfitError> {
        if !direction.matches(j) {
            return Err(MisfitError::LayoutMismatch(j));
        }
        if !out.matches(i) {
            return Err(MisfitError::LayoutMismatch(i));
        }
        let variance = self.variance()?;
        out.zero();

        let (Role::State, Role::State, Field::Series(direction), FieldMut::Series(out)) =
            (i, j, direction, out)
        else {
            return Ok(());
        };

        let mut sampled = vec![0.0; self.n_observations()];
        for &t in self.data.times() {
            self.operator.mul_vec(direction.view(t)?, &mut sampled)?;
            let target = out.view_mut(t)?;
            self.operator.transpose_mul_vec(&sampled, target)?;
            target.iter_mut().for_each(|v| *v /= variance);
        }
        Ok(())
    }
}

/// Largest absolute observed value, used to scale relative noise.
fn data_scale(obs: &PointwiseStateObservation) -> f64 {
    norm_linf(obs.data.as_slice())
}
