//! Reduced Hessian-vector products.
//!
//! With the linearization point x = [u, m, p] frozen in the model, the
//! action on a parameter direction m̂ is
//!
//! - û solves the incremental forward problem with source C m̂
//! - p̂ solves the incremental adjoint problem with source Wuu û + Wum m̂
//! - H m̂ = R m̂ + Wmm m̂ + Cᵀ p̂ + Wmu û
//!
//! The Gauss-Newton approximation keeps only the misfit curvature and
//! drops Wum, Wmu and Wmm.

use crate::linalg::vector;
use crate::misfit::Misfit;
use crate::model::{ModelError, TimeDependentAD};
use crate::prior::Prior;

/// Matrix-free reduced Hessian at the model's linearization point.
pub struct ReducedHessian<'a, P, F> {
    model: &'a TimeDependentAD<P, F>,
    /// Leave out the prior precision R
    pub misfit_only: bool,
    n_applications: usize,
}

impl<'a, P: Prior, F: Misfit> ReducedHessian<'a, P, F> {
    /// Hessian of `model`, which must have a linearization point.
    pub fn new(model: &'a TimeDependentAD<P, F>, misfit_only: bool) -> Result<Self, ModelError> {
        model.gauss_newton()?;
        Ok(Self {
            model,
            misfit_only,
            n_applications: 0,
        })
    }

    /// Parameter dimension.
    pub fn dim(&self) -> usize {
        self.model.space().dim()
    }

    /// Number of products computed so far.
    pub fn n_applications(&self) -> usize {
        self.n_applications
    }

    /// y = H x
    pub fn mult(&mut self, x: &[f64], y: &mut [f64]) -> Result<(), ModelError> {
        let model = self.model;
        let gauss_newton = model.gauss_newton()?;
        let n = self.dim();

        let mut rhs = model.generate_series();
        let mut u_hat = model.generate_series();
        model.apply_c(x, &mut rhs)?;
        model.solve_fwd_incremental(&mut u_hat, &rhs)?;

        model.apply_wuu(&u_hat, &mut rhs)?;
        if !gauss_newton {
            let mut wum = model.generate_series();
            model.apply_wum(x, &mut wum)?;
            rhs.axpy(1.0, &wum)?;
        }
        let mut p_hat = model.generate_series();
        model.solve_adj_incremental(&mut p_hat, &rhs)?;

        model.apply_ct(&p_hat, y)?;

        let mut work = vec![0.0; n];
        if !gauss_newton {
            model.apply_wmm(x, &mut work)?;
            vector::axpy(1.0, &work, y);
            model.apply_wmu(&u_hat, &mut work)?;
            vector::axpy(1.0, &work, y);
        }
        if !self.misfit_only {
            model.apply_r(x, &mut work)?;
            vector::axpy(1.0, &work, y);
        }

        self.n_applications += 1;
        log::trace!(
            "Hessian application {} (gauss_newton={gauss_newton}, misfit_only={})",
            self.n_applications,
            self.misfit_only
        );
        Ok(())
    }

    /// ⟨x, H y⟩
    pub fn inner(&mut self, x: &[f64], y: &[f64]) -> Result<f64, ModelError> {
        let mut hy = vec![0.0; self.dim()];
        self.mult(y, &mut hy)?;
        Ok(vector::dot(x, &hy))
    }
}
