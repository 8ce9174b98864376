//! Advection-diffusion residual with a log-diffusivity parameter.
//!
//! r(u, m, p) = ∫ exp(m) u' p' dx + ∫ w u' p dx
//!
//! On element k with size h and unit quadrature (ξ_q, ω_q):
//!
//! - diffusion: κ̄(m) D(u, p) with κ̄ = Σ_q ω_q exp(m(ξ_q)) and
//!   D(u, p) = (u_b - u_a)(p_b - p_a) / h
//! - advection: w (u_b - u_a)(p_a + p_b) / 2
//!
//! Only the diffusion term depends on m. The derivatives below are exact
//! for this quadrature, which keeps gradients and Hessian blocks
//! consistent with the discrete residual.

use crate::fem::{P1Space, WindField};
use crate::mesh::MeshError;

use super::{LocalPoint, Role, VariationalForm};

/// The advection-diffusion weak form on a P1 space.
#[derive(Clone, Debug)]
pub struct AdvectionDiffusionForm {
    space: P1Space,
    wind: WindField,
}

/// exp(m) moments over one element.
struct Coefficient {
    /// Σ ω exp(m)
    mean: f64,
    /// Σ ω exp(m) φ_c
    weighted: [f64; 2],
}

impl AdvectionDiffusionForm {
    /// Create the form. The wind must cover every element.
    pub fn new(space: P1Space, wind: WindField) -> Result<Self, MeshError> {
        if wind.len() != space.n_elements() {
            return Err(MeshError::ElementFieldLength {
                expected: space.n_elements(),
                got: wind.len(),
            });
        }
        Ok(Self { space, wind })
    }

    /// The advecting velocity.
    pub fn wind(&self) -> &WindField {
        &self.wind
    }

    fn coefficient(&self, m: [f64; 2]) -> Coefficient {
        let mut mean = 0.0;
        let mut weighted = [0.0; 2];
        for (xi, w) in self.space.quadrature() {
            let phi = P1Space::basis(xi);
            let kq = w * P1Space::eval(m, xi).exp();
            mean += kq;
            weighted[0] += kq * phi[0];
            weighted[1] += kq * phi[1];
        }
        Coefficient { mean, weighted }
    }

    /// Σ ω exp(m) dm φ_c, and its sum over c (Σ ω exp(m) dm).
    fn coefficient_in_direction(&self, m: [f64; 2], dm: [f64; 2]) -> ([f64; 2], f64) {
        let mut weighted = [0.0; 2];
        for (xi, w) in self.space.quadrature() {
            let phi = P1Space::basis(xi);
            let kq = w * P1Space::eval(m, xi).exp() * P1Space::eval(dm, xi);
            weighted[0] += kq * phi[0];
            weighted[1] += kq * phi[1];
        }
        (weighted, weighted[0] + weighted[1])
    }

    /// D(x, y) = (x_b - x_a)(y_b - y_a) / h
    #[inline]
    fn jump_product(h: f64, x: [f64; 2], y: [f64; 2]) -> f64 {
        (x[1] - x[0]) * (y[1] - y[0]) / h
    }

    /// ∂D(x, y)/∂x, which only depends on y.
    #[inline]
    fn jump_gradient(h: f64, y: [f64; 2]) -> [f64; 2] {
        let s = (y[1] - y[0]) / h;
        [-s, s]
    }

    /// ∂/∂u of the advection term, given the adjoint values.
    #[inline]
    fn advection_state_gradient(w: f64, p: [f64; 2]) -> [f64; 2] {
        let s = 0.5 * w * (p[0] + p[1]);
        [-s, s]
    }

    /// ∂/∂p of the advection term, given the state values.
    #[inline]
    fn advection_adjoint_gradient(w: f64, u: [f64; 2]) -> [f64; 2] {
        let s = 0.5 * w * (u[1] - u[0]);
        [s, s]
    }

    fn state_gradient(&self, k: usize, kappa: f64, p: [f64; 2]) -> [f64; 2] {
        let h = self.space.h(k);
        let dd = Self::jump_gradient(h, p);
        let da = Self::advection_state_gradient(self.wind.on_element(k), p);
        [kappa * dd[0] + da[0], kappa * dd[1] + da[1]]
    }

    fn adjoint_gradient(&self, k: usize, kappa: f64, u: [f64; 2]) -> [f64; 2] {
        let h = self.space.h(k);
        let dd = Self::jump_gradient(h, u);
        let da = Self::advection_adjoint_gradient(self.wind.on_element(k), u);
        [kappa * dd[0] + da[0], kappa * dd[1] + da[1]]
    }
}

impl VariationalForm for AdvectionDiffusionForm {
    fn space(&self) -> &P1Space {
        &self.space
    }

    fn local_residual(&self, k: usize, x: &LocalPoint) -> f64 {
        let h = self.space.h(k);
        let w = self.wind.on_element(k);
        let kappa = self.coefficient(x.m).mean;
        kappa * Self::jump_product(h, x.u, x.p) + 0.5 * w * (x.u[1] - x.u[0]) * (x.p[0] + x.p[1])
    }

    fn local_first_derivative(&self, k: usize, role: Role, x: &LocalPoint) -> [f64; 2] {
        let h = self.space.h(k);
        let c = self.coefficient(x.m);
        match role {
            Role::State => self.state_gradient(k, c.mean, x.p),
            Role::Adjoint => self.adjoint_gradient(k, c.mean, x.u),
            Role::Parameter => {
                let d = Self::jump_product(h, x.u, x.p);
                [c.weighted[0] * d, c.weighted[1] * d]
            }
        }
    }

    fn local_second_derivative(
        &self,
        k: usize,
        wrt: Role,
        dir: Role,
        x: &LocalPoint,
        d: [f64; 2],
    ) -> [f64; 2] {
        let h = self.space.h(k);
        match (wrt, dir) {
            // Linear in u and in p separately
            (Role::State, Role::State) | (Role::Adjoint, Role::Adjoint) => [0.0; 2],
            // Transport operator and its transpose
            (Role::Adjoint, Role::State) => {
                self.adjoint_gradient(k, self.coefficient(x.m).mean, d)
            }
            (Role::State, Role::Adjoint) => {
                self.state_gradient(k, self.coefficient(x.m).mean, d)
            }
            (Role::Parameter, Role::Parameter) => {
                let (weighted, _) = self.coefficient_in_direction(x.m, d);
                let jump = Self::jump_product(h, x.u, x.p);
                [weighted[0] * jump, weighted[1] * jump]
            }
            (Role::State, Role::Parameter) => {
                let (_, total) = self.coefficient_in_direction(x.m, d);
                let g = Self::jump_gradient(h, x.p);
                [total * g[0], total * g[1]]
            }
            (Role::Adjoint, Role::Parameter) => {
                let (_, total) = self.coefficient_in_direction(x.m, d);
                let g = Self::jump_gradient(h, x.u);
                [total * g[0], total * g[1]]
            }
            (Role::Parameter, Role::State) => {
                let c = self.coefficient(x.m);
                let jump = Self::jump_product(h, d, x.p);
                [c.weighted[0] * jump, c.weighted[1] * jump]
            }
            (Role::Parameter, Role::Adjoint) => {
                let c = self.coefficient(x.m);
                let jump = Self::jump_product(h, x.u, d);
                [c.weighted[0] * jump, c.weighted[1] * jump]
            }
        }
    }
}
