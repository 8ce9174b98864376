//! Time-stepping operators with SUPG/GLS stabilization.
//!
//! For the implicit Euler step of ∂u/∂t - ∇·(κ∇u) + w·∇u = 0 the strong
//! residual applied to a function v is
//!
//! r(v) = v + Δt (-∇·(κ∇v) + w·∇v) = v + Δt w v'
//!
//! since the diffusive term vanishes element-wise on P1. With the
//! element parameter τ = min(h²/(2κ), h/|w|) the operators are
//!
//! - M       = ∫ u v
//! - stab    = ∫ τ r(u) r(v)
//! - M_stab  = ∫ u (v + τ r(v))
//! - Mt_stab = ∫ (u + τ r(u)) v
//!
//! None of them depend on the inferred parameter, so they are assembled
//! once per model.

use serde::{Deserialize, Serialize};

use crate::linalg::SparseMatrix;

use super::{P1Space, WindField};

/// Diffusivity used inside the stabilization parameter.
pub const DEFAULT_STABILIZATION_KAPPA: f64 = 1e-3;

/// Stabilization settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StabilizationConfig {
    /// Add the residual-based stabilization terms
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Diffusivity κ entering τ
    #[serde(default = "default_kappa")]
    pub kappa: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_kappa() -> f64 {
    DEFAULT_STABILIZATION_KAPPA
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            kappa: default_kappa(),
        }
    }
}

/// The constant operators of the stabilized implicit scheme.
#[derive(Clone, Debug)]
pub struct SupgOperators {
    /// Consistent mass matrix M
    pub mass: SparseMatrix,
    /// Stabilization form ∫ τ r(u) r(v)
    pub stab: SparseMatrix,
    /// Right-hand side operator of the forward step
    pub mass_stab: SparseMatrix,
    /// Right-hand side operator of the adjoint step (transpose of `mass_stab`)
    pub mass_stab_t: SparseMatrix,
    /// τ per element
    pub tau: Vec<f64>,
}

impl SupgOperators {
    /// Assemble all operators for step size `dt`.
    pub fn assemble(
        space: &P1Space,
        wind: &WindField,
        dt: f64,
        config: &StabilizationConfig,
    ) -> Self {
        let tau: Vec<f64> = (0..space.n_elements())
            .map(|k| stabilization_parameter(space.h(k), wind.on_element(k), config))
            .collect();

        // Local residual r(φ_i) at unit coordinate ξ on element k
        let residual = |k: usize, xi: f64| -> [f64; 2] {
            let phi = P1Space::basis(xi);
            let dphi = space.basis_gradients(k);
            let w = wind.on_element(k);
            [phi[0] + dt * w * dphi[0], phi[1] + dt * w * dphi[1]]
        };

        let integrate = |k: usize, integrand: &dyn Fn([f64; 2], [f64; 2], usize, usize) -> f64| {
            let h = space.h(k);
            let mut local = [[0.0; 2]; 2];
            for (xi, w) in space.quadrature() {
                let phi = P1Space::basis(xi);
                let r = residual(k, xi);
                for (i, row) in local.iter_mut().enumerate() {
                    for (j, entry) in row.iter_mut().enumerate() {
                        *entry += h * w * integrand(phi, r, i, j);
                    }
                }
            }
            local
        };

        let mass = space.mass_matrix();
        let stab = space.assemble_matrix(|k| {
            let t = tau[k];
            integrate(k, &|_, r, i, j| t * r[j] * r[i])
        });
        let mass_stab = space.assemble_matrix(|k| {
            let t = tau[k];
            integrate(k, &|phi, r, i, j| phi[j] * (phi[i] + t * r[i]))
        });
        let mass_stab_t = space.assemble_matrix(|k| {
            let t = tau[k];
            integrate(k, &|phi, r, i, j| (phi[j] + t * r[j]) * phi[i])
        });

        if config.enabled {
            log::debug!(
                "Assembled SUPG operators: dt={:.3e}, tau in [{:.3e}, {:.3e}]",
                dt,
                tau.iter().copied().fold(f64::INFINITY, f64::min),
                tau.iter().copied().fold(0.0, f64::max)
            );
        }

        Self {
            mass,
            stab,
            mass_stab,
            mass_stab_t,
            tau,
        }
    }
}

/// τ = min(h²/(2κ), h/|w|), or zero when stabilization is disabled.
pub(crate) fn stabilization_parameter(h: f64, w: f64, config: &StabilizationConfig) -> f64 {
    if !config.enabled {
        return 0.0;
    }
    let diffusive = h * h / (2.0 * config.kappa);
    let speed = w.abs();
    if speed > 0.0 {
        diffusive.min(h / speed)
    } else {
        diffusive
    }
}
