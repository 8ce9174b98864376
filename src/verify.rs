//! Finite-difference checks of the model derivatives.
//!
//! The gradient check compares ⟨g, dm⟩ with forward differences of the
//! cost; the Hessian check compares H dm with differences of the gradient.
//! Both errors should decrease linearly with the step until round-off
//! takes over.

use crate::hessian::ReducedHessian;
use crate::linalg::vector;
use crate::misfit::Misfit;
use crate::model::{ModelError, ModelVectors, TimeDependentAD};
use crate::prior::Prior;

/// One finite-difference step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FdStep {
    pub eps: f64,
    /// |finite difference - analytic|
    pub error: f64,
}

/// Result of a derivative check.
#[derive(Clone, Debug, PartialEq)]
pub struct FdCheck {
    /// Size of the analytic quantity (|⟨g, dm⟩| or |H dm|)
    pub reference: f64,
    pub steps: Vec<FdStep>,
}

impl FdCheck {
    /// Smallest error over all steps.
    pub fn min_error(&self) -> f64 {
        self.steps
            .iter()
            .map(|s| s.error)
            .fold(f64::INFINITY, f64::min)
    }

    /// Smallest error relative to the analytic quantity.
    pub fn min_relative_error(&self) -> f64 {
        self.min_error() / self.reference.max(f64::MIN_POSITIVE)
    }
}

/// Steps 1e-2 · 2⁻ⁱ for i < n.
pub fn default_steps(n: usize) -> Vec<f64> {
    (0..n).map(|i| 1e-2 * 0.5f64.powi(i as i32)).collect()
}

/// State and adjoint histories at parameter `m`.
pub fn solve_point<P: Prior, F: Misfit>(
    model: &TimeDependentAD<P, F>,
    m: &[f64],
) -> Result<ModelVectors, ModelError> {
    let mut x = model.generate_vectors();
    x.m.copy_from_slice(m);
    let prepared = model.solve_fwd(&mut x.u, &x.m)?;
    let mut p = model.generate_series();
    model.solve_adj_with(&mut p, &x, &prepared)?;
    x.p = p;
    Ok(x)
}

fn cost_of<P: Prior, F: Misfit>(
    model: &TimeDependentAD<P, F>,
    x: &ModelVectors,
    misfit_only: bool,
) -> Result<f64, ModelError> {
    let [total, _, misfit] = model.cost(x)?;
    Ok(if misfit_only { misfit } else { total })
}

fn perturbed(m0: &[f64], dm: &[f64], eps: f64) -> Vec<f64> {
    m0.iter().zip(dm).map(|(a, b)| a + eps * b).collect()
}

/// Check the reduced gradient at `m0` in direction `dm`.
pub fn verify_gradient<P: Prior, F: Misfit>(
    model: &TimeDependentAD<P, F>,
    m0: &[f64],
    dm: &[f64],
    misfit_only: bool,
    steps: &[f64],
) -> Result<FdCheck, ModelError> {
    let x0 = solve_point(model, m0)?;
    let c0 = cost_of(model, &x0, misfit_only)?;
    let mut g = vec![0.0; m0.len()];
    model.eval_gradient_parameter(&x0, &mut g, misfit_only)?;
    let gdm = vector::dot(&g, dm);

    let mut out = Vec::with_capacity(steps.len());
    for &eps in steps {
        let mut x = model.generate_vectors();
        x.m = perturbed(m0, dm, eps);
        model.solve_fwd(&mut x.u, &x.m)?;
        let fd = (cost_of(model, &x, misfit_only)? - c0) / eps;
        out.push(FdStep {
            eps,
            error: (fd - gdm).abs(),
        });
    }

    let check = FdCheck {
        reference: gdm.abs(),
        steps: out,
    };
    log::info!(
        "Gradient check: (g, dm) = {gdm:.6e}, min error {:.3e}",
        check.min_error()
    );
    Ok(check)
}

/// Check the full-Newton reduced Hessian at `m0` in direction `dm`.
///
/// Sets the model's linearization point to the solution at `m0`.
pub fn verify_hessian<P: Prior, F: Misfit>(
    model: &mut TimeDependentAD<P, F>,
    m0: &[f64],
    dm: &[f64],
    misfit_only: bool,
    steps: &[f64],
) -> Result<FdCheck, ModelError> {
    let n = m0.len();
    let x0 = solve_point(model, m0)?;
    let mut g0 = vec![0.0; n];
    model.eval_gradient_parameter(&x0, &mut g0, misfit_only)?;
    model.set_point_for_hessian_evaluations(&x0, false)?;

    let mut h_dm = vec![0.0; n];
    ReducedHessian::new(model, misfit_only)?.mult(dm, &mut h_dm)?;

    let mut out = Vec::with_capacity(steps.len());
    let mut g = vec![0.0; n];
    for &eps in steps {
        let x = solve_point(model, &perturbed(m0, dm, eps))?;
        model.eval_gradient_parameter(&x, &mut g, misfit_only)?;
        let diff: Vec<f64> = g
            .iter()
            .zip(&g0)
            .zip(&h_dm)
            .map(|((a, b), h)| (a - b) / eps - h)
            .collect();
        out.push(FdStep {
            eps,
            error: vector::norm_l2(&diff),
        });
    }

    let check = FdCheck {
        reference: vector::norm_l2(&h_dm),
        steps: out,
    };
    log::info!(
        "Hessian check: |H dm| = {:.6e}, min error {:.3e}",
        check.reference,
        check.min_error()
    );
    Ok(check)
}

/// ⟨d1, H d2⟩ and ⟨d2, H d1⟩ at the current linearization point.
pub fn verify_symmetry<P: Prior, F: Misfit>(
    hessian: &mut ReducedHessian<'_, P, F>,
    d1: &[f64],
    d2: &[f64],
) -> Result<(f64, f64), ModelError> {
    let a = hessian.inner(d1, d2)?;
    let b = hessian.inner(d2, d1)?;
    log::info!(
        "Symmetry check: <d1, H d2> = {a:.6e}, <d2, H d1> = {b:.6e}, difference {:.3e}",
        (a - b).abs()
    );
    Ok((a, b))
}
