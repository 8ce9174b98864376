//! JSON problem descriptions.
//!
//! A [`ProblemConfig`] describes a complete 1D inverse problem: domain and
//! mesh, simulation and observation times, observation targets, wind,
//! prior and noise level. [`ProblemConfig::build`] validates it and
//! assembles the model.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fem::{P1Space, WindField};
use crate::mesh::Mesh1D;
use crate::misfit::PointwiseStateObservation;
use crate::model::{ModelConfig, ModelError, TimeDependentAD};
use crate::prior::BiLaplacianPrior;
use crate::time::TimeGrid;

/// The model type a [`ProblemConfig`] builds.
pub type AdvectionDiffusionProblem = TimeDependentAD<BiLaplacianPrior, PointwiseStateObservation>;

/// Error type for loading problem files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wind field description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindConfig {
    /// Same velocity on every element
    Constant { velocity: f64 },
    /// One velocity per element
    Values { values: Vec<f64> },
}

/// Initial condition description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InitialConditionConfig {
    /// min(cap, exp(-sharpness (x - center)²))
    Gaussian {
        center: f64,
        sharpness: f64,
        cap: f64,
    },
    /// Vertex values
    Values { values: Vec<f64> },
}

impl Default for InitialConditionConfig {
    fn default() -> Self {
        InitialConditionConfig::Gaussian {
            center: 0.35,
            sharpness: 100.0,
            cap: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeConfig {
    pub t_init: f64,
    pub t_final: f64,
    pub dt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationConfig {
    /// First observation time
    pub t_start: f64,
    /// Spacing of observation times, a multiple of the simulation step
    pub dt: f64,
    pub targets: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorConfig {
    pub gamma: f64,
    pub delta: f64,
    /// Constant prior mean
    #[serde(default)]
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Noise std dev relative to the largest observed value
    pub relative_level: f64,
    #[serde(default)]
    pub seed: u64,
}

/// A complete problem description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub n_elements: usize,
    pub time: TimeConfig,
    pub observation: ObservationConfig,
    pub wind: WindConfig,
    pub prior: PriorConfig,
    pub noise: NoiseConfig,
    #[serde(default)]
    pub initial_condition: InitialConditionConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

impl ProblemConfig {
    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// The mesh.
    pub fn mesh(&self) -> Result<Mesh1D, ModelError> {
        Ok(Mesh1D::uniform(self.x_min, self.x_max, self.n_elements)?)
    }

    /// Simulation stamps t_init, t_init + dt, ..., t_final.
    pub fn simulation_times(&self) -> Result<TimeGrid, ModelError> {
        Ok(TimeGrid::arange(self.time.t_init, self.time.t_final, self.time.dt)?)
    }

    /// Observation stamps t_start, t_start + dt, ..., t_final.
    pub fn observation_times(&self) -> Result<TimeGrid, ModelError> {
        Ok(TimeGrid::arange(
            self.observation.t_start,
            self.time.t_final,
            self.observation.dt,
        )?)
    }

    /// Validate and assemble the model with zero data.
    ///
    /// The noise variance is left unset: it depends on the data, which the
    /// caller synthesizes or loads.
    pub fn build(&self) -> Result<AdvectionDiffusionProblem, ModelError> {
        let mesh = self.mesh()?;
        let space = P1Space::new(mesh);

        let wind = match &self.wind {
            WindConfig::Constant { velocity } => WindField::constant(&space.mesh, *velocity),
            WindConfig::Values { values } => {
                if values.len() != space.n_elements() {
                    return Err(ModelError::Config(format!(
                        "wind has {} values for {} elements",
                        values.len(),
                        space.n_elements()
                    )));
                }
                WindField::from_values(values.clone())
            }
        };

        let initial_condition = match &self.initial_condition {
            InitialConditionConfig::Gaussian {
                center,
                sharpness,
                cap,
            } => space
                .mesh
                .interpolate(|x| cap.min((-sharpness * (x - center).powi(2)).exp())),
            InitialConditionConfig::Values { values } => values.clone(),
        };

        let prior = BiLaplacianPrior::new(&space, self.prior.gamma, self.prior.delta)?
            .with_mean(vec![self.prior.mean; space.dim()])?;

        if !(self.noise.relative_level > 0.0) {
            return Err(ModelError::Config(format!(
                "relative noise level must be positive, got {}",
                self.noise.relative_level
            )));
        }

        let misfit = PointwiseStateObservation::new(
            &space,
            self.observation.targets.clone(),
            self.observation_times()?,
        )?;

        TimeDependentAD::new(
            space,
            wind,
            prior,
            misfit,
            self.simulation_times()?,
            initial_condition,
            self.model,
        )
    }
}
