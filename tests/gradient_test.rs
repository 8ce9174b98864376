//! Finite-difference checks of the reduced gradient.

mod common;

use ad_rs::verify::{default_steps, solve_point, verify_gradient};
use ad_rs::BlockStrategy;
use common::{field, small_problem, true_parameter};

#[test]
fn test_gradient_matches_finite_differences() {
    let model = small_problem(BlockStrategy::Directional);
    let m0 = field(&model, 0.0);
    let dm = field(&model, 1.3);

    for misfit_only in [false, true] {
        let check = verify_gradient(&model, &m0, &dm, misfit_only, &default_steps(20)).unwrap();
        assert!(check.reference > 0.0);
        assert!(
            check.min_relative_error() < 1e-4,
            "misfit_only={misfit_only}: relative error {:.3e}",
            check.min_relative_error()
        );
    }
}

#[test]
fn test_gradient_error_decreases_with_step() {
    let model = small_problem(BlockStrategy::Directional);
    let m0 = field(&model, 0.2);
    let dm = field(&model, 2.0);

    let check = verify_gradient(&model, &m0, &dm, true, &[1e-2, 1e-3]).unwrap();
    assert!(check.steps[1].error < check.steps[0].error);
}

#[test]
fn test_misfit_gradient_vanishes_at_truth() {
    // Noise-free data: u(m_true) reproduces the data, so the adjoint is zero
    let model = small_problem(BlockStrategy::Directional);
    let x = solve_point(&model, &true_parameter(&model)).unwrap();

    let [_, _, misfit] = model.cost(&x).unwrap();
    assert!(misfit < 1e-20);

    let mut g = vec![1.0; model.space().dim()];
    let norm = model.eval_gradient_parameter(&x, &mut g, true).unwrap();
    assert!(g.iter().all(|v| v.abs() < 1e-10));
    assert!(norm.abs() < 1e-18);
}

#[test]
fn test_gradient_norm_is_mass_weighted() {
    let model = small_problem(BlockStrategy::Directional);
    let x = solve_point(&model, &field(&model, 0.0)).unwrap();
    let mut g = vec![0.0; model.space().dim()];
    let norm = model.eval_gradient_parameter(&x, &mut g, false).unwrap();

    // (M⁻¹ g, g) is a squared norm
    assert!(norm > 0.0);
}
