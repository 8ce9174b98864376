//! Model settings.

use serde::{Deserialize, Serialize};

use crate::fem::StabilizationConfig;

use super::ModelError;

/// How second-derivative blocks are evaluated.
///
/// Both strategies produce the same vectors up to rounding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStrategy {
    /// Element-wise directional second derivatives
    #[default]
    Directional,
    /// Assemble the mixed second-derivative matrix, then multiply
    Assembled,
}

/// Construction settings for [`TimeDependentAD`](super::TimeDependentAD).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub stabilization: StabilizationConfig,
    #[serde(default)]
    pub strategy: BlockStrategy,
    /// Gauss points per element for the exp(m) coefficient
    #[serde(default = "default_quadrature_points")]
    pub quadrature_points: usize,
}

fn default_quadrature_points() -> usize {
    2
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            stabilization: StabilizationConfig::default(),
            strategy: BlockStrategy::default(),
            quadrature_points: default_quadrature_points(),
        }
    }
}

impl ModelConfig {
    pub fn with_strategy(mut self, strategy: BlockStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_stabilization(mut self, enabled: bool) -> Self {
        self.stabilization.enabled = enabled;
        self
    }

    pub fn with_quadrature_points(mut self, n: usize) -> Self {
        self.quadrature_points = n;
        self
    }

    /// Reject settings the discretization cannot use.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.quadrature_points == 0 {
            return Err(ModelError::Config(
                "quadrature_points must be at least 1".into(),
            ));
        }
        if !(self.stabilization.kappa > 0.0) || !self.stabilization.kappa.is_finite() {
            return Err(ModelError::Config(format!(
                "stabilization kappa must be positive, got {}",
                self.stabilization.kappa
            )));
        }
        Ok(())
    }
}
