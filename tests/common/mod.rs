//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::f64::consts::PI;

use ad_rs::verify::solve_point;
use ad_rs::{
    BiLaplacianPrior, BlockStrategy, Mesh1D, ModelConfig, ModelVectors, P1Space,
    PointwiseStateObservation, TimeDependentAD, TimeGrid, WindField,
};

pub type Model = TimeDependentAD<BiLaplacianPrior, PointwiseStateObservation>;

/// Small advection-dominated problem with synthetic, noise-free data.
///
/// 16 elements on [0, 1], stamps 0, 0.05, ..., 0.5, observations at
/// 0.2, 0.3, 0.4, 0.5 in three points. Data come from the parameter
/// [`true_parameter`].
pub fn small_problem(strategy: BlockStrategy) -> Model {
    small_problem_with(ModelConfig::default().with_strategy(strategy), 0.4)
}

pub fn small_problem_with(config: ModelConfig, wind: f64) -> Model {
    let mesh = Mesh1D::uniform(0.0, 1.0, 16).unwrap();
    let space = P1Space::new(mesh);
    let wind = WindField::constant(&space.mesh, wind);
    let prior = BiLaplacianPrior::new(&space, 0.05, 1.0).unwrap();
    let sim = TimeGrid::arange(0.0, 0.5, 0.05).unwrap();
    let obs = TimeGrid::arange(0.2, 0.5, 0.1).unwrap();
    let misfit = PointwiseStateObservation::new(&space, vec![0.3, 0.55, 0.8], obs).unwrap();
    let ic = space
        .mesh
        .interpolate(|x| 0.5_f64.min((-100.0 * (x - 0.35) * (x - 0.35)).exp()));

    let mut model = TimeDependentAD::new(space, wind, prior, misfit, sim, ic, config).unwrap();

    let mut truth = model.generate_vectors();
    truth.m = true_parameter(&model);
    model.solve_fwd(&mut truth.u, &truth.m).unwrap();
    model.misfit_mut().synthesize(&truth).unwrap();
    model.misfit_mut().set_noise_variance(1e-3).unwrap();
    model
}

/// log-diffusivity used to synthesize the data.
pub fn true_parameter(model: &Model) -> Vec<f64> {
    model
        .space()
        .mesh
        .interpolate(|x| -1.0 + 0.5 * (PI * x).sin())
}

/// A smooth field different from the truth.
pub fn field(model: &Model, phase: f64) -> Vec<f64> {
    model
        .space()
        .mesh
        .interpolate(|x| -1.2 + 0.3 * (3.0 * x + phase).cos())
}

/// Time series with smooth, time-varying entries.
pub fn series(model: &Model, phase: f64) -> ad_rs::TimeDependentVector {
    let mut v = model.generate_series();
    for i in 0..v.n_steps() {
        let t = v.times()[i];
        let values = model
            .space()
            .mesh
            .interpolate(|x| (2.0 * x + 3.0 * t + phase).sin());
        v.at_mut(i).copy_from_slice(&values);
    }
    v
}

/// Solve at a parameter different from the truth so the misfit is active,
/// and freeze that point.
pub fn linearized(model: &mut Model, gauss_newton: bool) -> ModelVectors {
    let m = field(model, 0.4);
    let x = solve_point(model, &m).unwrap();
    model
        .set_point_for_hessian_evaluations(&x, gauss_newton)
        .unwrap();
    x
}
