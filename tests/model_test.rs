//! Forward and adjoint solves, vector generation and the block dispatch.

mod common;

use ad_rs::linalg::vector::dot;
use ad_rs::verify::solve_point;
use ad_rs::{
    BiLaplacianPrior, BlockStrategy, Component, Field, FieldMut, Mesh1D, Misfit, MisfitError,
    ModelConfig, ModelError, P1Space, PointwiseStateObservation, Role, TimeDependentAD,
    TimeDependentVector, TimeGrid, WindField,
};
use approx::assert_relative_eq;
use common::{field, linearized, series, small_problem, small_problem_with, Model};

/// Pure diffusion with m = 0 on 20 elements, Δt = 0.01.
fn diffusion_problem() -> Model {
    let mesh = Mesh1D::uniform(0.0, 1.0, 20).unwrap();
    let space = P1Space::new(mesh);
    let wind = WindField::constant(&space.mesh, 0.0);
    let prior = BiLaplacianPrior::new(&space, 0.1, 1.0).unwrap();
    let sim = TimeGrid::arange(0.0, 0.2, 0.01).unwrap();
    let obs = TimeGrid::arange(0.1, 0.2, 0.1).unwrap();
    let misfit = PointwiseStateObservation::new(&space, vec![0.5], obs).unwrap();
    let ic = space
        .mesh
        .interpolate(|x| 0.5_f64.min((-100.0 * (x - 0.35) * (x - 0.35)).exp()));
    let config = ModelConfig::default().with_stabilization(false);
    TimeDependentAD::new(space, wind, prior, misfit, sim, ic, config).unwrap()
}

#[test]
fn test_forward_stores_initial_condition() {
    let model = small_problem(BlockStrategy::Directional);
    let mut u = model.generate_series();
    model.solve_fwd(&mut u, &field(&model, 0.0)).unwrap();
    assert_eq!(u.at(0), model.initial_condition());
    assert!(u.at(1) != model.initial_condition());
}

#[test]
fn test_diffusion_maximum_principle() {
    let model = diffusion_problem();
    let m = vec![0.0; model.space().dim()];
    let mut u = model.generate_series();
    model.solve_fwd(&mut u, &m).unwrap();

    let mass = model.operators().mass.clone();
    let total = |v: &[f64]| {
        let mut mv = vec![0.0; v.len()];
        mass.mul_vec(v, &mut mv).unwrap();
        mv.iter().sum::<f64>()
    };
    let mass0 = total(u.at(0));

    for step in 1..u.n_steps() {
        let prev_max = u.at(step - 1).iter().cloned().fold(f64::MIN, f64::max);
        let max = u.at(step).iter().cloned().fold(f64::MIN, f64::max);
        assert!(u.at(step).iter().all(|&v| v >= -1e-14), "negative state at step {step}");
        assert!(max <= prev_max + 1e-14, "maximum grew at step {step}");
        assert_relative_eq!(total(u.at(step)), mass0, max_relative = 1e-12);
    }
}

#[test]
fn test_stabilized_diffusion_maximum_principle() {
    let mesh = Mesh1D::uniform(0.0, 1.0, 20).unwrap();
    let space = P1Space::new(mesh);
    let wind = WindField::constant(&space.mesh, 0.0);
    let prior = BiLaplacianPrior::new(&space, 0.1, 1.0).unwrap();
    let sim = TimeGrid::arange(0.0, 0.2, 0.01).unwrap();
    let obs = TimeGrid::arange(0.1, 0.2, 0.1).unwrap();
    let misfit = PointwiseStateObservation::new(&space, vec![0.5], obs).unwrap();
    let ic = space
        .mesh
        .interpolate(|x| 0.5_f64.min((-100.0 * (x - 0.35) * (x - 0.35)).exp()));
    let model =
        TimeDependentAD::new(space, wind, prior, misfit, sim, ic, ModelConfig::default()).unwrap();

    let mut x = model.generate_vector(Component::All).into_all().unwrap();
    model.solve_fwd(&mut x.u, &x.m).unwrap();

    for step in 1..x.u.n_steps() {
        let prev_max = x.u.at(step - 1).iter().cloned().fold(f64::MIN, f64::max);
        let max = x.u.at(step).iter().cloned().fold(f64::MIN, f64::max);
        let min = x.u.at(step).iter().cloned().fold(f64::MAX, f64::min);
        assert!(min >= -1e-14, "negative state {min:e} at step {step}");
        assert!(max <= prev_max + 1e-14, "maximum grew at step {step}");
    }
}

#[test]
fn test_forward_needs_no_noise_variance() {
    // Synthetic data are built from a forward solve before the noise level is known
    let mut model = diffusion_problem();
    let mut x = model.generate_vectors();
    model.solve_fwd(&mut x.u, &x.m).unwrap();
    model.misfit_mut().synthesize(&x).unwrap();

    let mut p = model.generate_series();
    assert!(matches!(
        model.solve_adj(&mut p, &x),
        Err(ModelError::Misfit(MisfitError::NoiseVarianceUnset))
    ));

    model.misfit_mut().set_noise_variance(1e-2).unwrap();
    model.solve_adj(&mut p, &x).unwrap();
    assert!(p.norm_linf() < 1e-12);
}

#[test]
fn test_adjoint_is_zero_without_misfit() {
    // Noise-free data at the truth give a zero forcing
    let model = small_problem(BlockStrategy::Directional);
    let x = solve_point(&model, &common::true_parameter(&model)).unwrap();
    assert!(x.p.norm_linf() < 1e-12);
}

#[test]
fn test_adjoint_rejects_stale_operator() {
    let model = small_problem(BlockStrategy::Directional);
    let mut x = model.generate_vectors();
    x.m = field(&model, 0.0);
    let prepared = model.solve_fwd(&mut x.u, &x.m).unwrap();
    assert!(prepared.matches(&x.m));

    x.m[3] += 0.1;
    let mut p = model.generate_series();
    assert!(matches!(
        model.solve_adj_with(&mut p, &x, &prepared),
        Err(ModelError::StaleOperator)
    ));
    // Re-preparing at the new parameter works
    model.solve_adj(&mut p, &x).unwrap();
}

#[test]
fn test_cost_triple() {
    let model = small_problem(BlockStrategy::Directional);
    let x = solve_point(&model, &field(&model, 0.0)).unwrap();
    let [total, reg, misfit] = model.cost(&x).unwrap();
    assert!(reg > 0.0);
    assert!(misfit > 0.0);
    assert_relative_eq!(total, reg + misfit, max_relative = 1e-14);
}

#[test]
fn test_observe_then_cost_is_zero() {
    let mut model = small_problem(BlockStrategy::Directional);
    let x = solve_point(&model, &field(&model, 1.0)).unwrap();
    model.misfit_mut().synthesize(&x).unwrap();
    model.misfit_mut().set_noise_variance(1.0).unwrap();
    assert_eq!(model.misfit().cost(&x).unwrap(), 0.0);
}

#[test]
fn test_generate_vector_tags() {
    let model = small_problem(BlockStrategy::Directional);
    let n = model.space().dim();

    let m = model.generate_vector_by_tag("parameter").unwrap();
    assert_eq!(m.component(), Component::Parameter);
    assert_eq!(m.into_parameter().unwrap(), vec![0.0; n]);

    let u = model.generate_vector_by_tag("STATE").unwrap();
    let u = u.into_series().unwrap();
    assert_eq!(u.grid(), model.simulation_times());
    assert_eq!(u.dim(), n);

    let all = model.generate_vector(Component::All).into_all().unwrap();
    assert_eq!(all, model.generate_vectors());

    assert!(matches!(
        model.generate_vector_by_tag("velocity"),
        Err(ModelError::UnknownComponent(tag)) if tag == "velocity"
    ));
}

#[test]
fn test_unsupported_block() {
    let mut model = small_problem(BlockStrategy::Directional);
    linearized(&mut model, false);
    let du = series(&model, 0.0);
    let mut out = model.generate_series();

    for (i, j) in [
        (Role::State, Role::Adjoint),
        (Role::Adjoint, Role::State),
        (Role::Adjoint, Role::Adjoint),
    ] {
        let err = model
            .apply_ij(i, j, Field::Series(&du), FieldMut::Series(&mut out))
            .unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedBlock { .. }));
    }
}

#[test]
fn test_state_state_block_is_zero() {
    let mut model = small_problem(BlockStrategy::Directional);
    linearized(&mut model, false);
    let du = series(&model, 0.0);
    let mut out = series(&model, 1.0);
    model
        .apply_ij(Role::State, Role::State, Field::Series(&du), FieldMut::Series(&mut out))
        .unwrap();
    assert_eq!(out.norm_linf(), 0.0);
}

#[test]
fn test_block_layout_mismatch() {
    let mut model = small_problem(BlockStrategy::Directional);
    linearized(&mut model, false);
    let du = series(&model, 0.0);
    let mut out = vec![0.0; model.space().dim()];
    // C takes a parameter direction, not a time series
    let err = model
        .apply_ij(Role::Adjoint, Role::Parameter, Field::Series(&du), FieldMut::Vector(&mut out))
        .unwrap_err();
    assert!(matches!(err, ModelError::LayoutMismatch(Role::Parameter)));
}

#[test]
fn test_mixed_blocks_are_transposes() {
    let mut model = small_problem(BlockStrategy::Directional);
    linearized(&mut model, false);
    let dm1 = field(&model, 0.9);
    let dm2 = field(&model, 2.4);
    let ds = series(&model, 0.6);
    let n = dm1.len();

    for time_role in [Role::State, Role::Adjoint] {
        let mut series_out = model.generate_series();
        model
            .apply_ij(time_role, Role::Parameter, Field::Vector(&dm1), FieldMut::Series(&mut series_out))
            .unwrap();
        assert!(series_out.at(0).iter().all(|&v| v == 0.0));

        let mut vec_out = vec![0.0; n];
        model
            .apply_ij(Role::Parameter, time_role, Field::Series(&ds), FieldMut::Vector(&mut vec_out))
            .unwrap();

        let a = series_out.inner(&ds).unwrap();
        let b = dot(&vec_out, &dm1);
        assert_relative_eq!(a, b, max_relative = 1e-10);
    }

    let mut w1 = vec![0.0; n];
    let mut w2 = vec![0.0; n];
    model.apply_wmm(&dm1, &mut w1).unwrap();
    model.apply_wmm(&dm2, &mut w2).unwrap();
    assert_relative_eq!(dot(&w1, &dm2), dot(&w2, &dm1), max_relative = 1e-10);
}

#[test]
fn test_block_strategies_agree() {
    let mut directional = small_problem(BlockStrategy::Directional);
    let mut assembled = small_problem(BlockStrategy::Assembled);
    linearized(&mut directional, false);
    linearized(&mut assembled, false);
    let dm = field(&directional, 1.4);
    let ds = series(&directional, 0.2);
    let n = dm.len();

    let mut a = directional.generate_series();
    let mut b = assembled.generate_series();
    directional.apply_c(&dm, &mut a).unwrap();
    assembled.apply_c(&dm, &mut b).unwrap();
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        assert_relative_eq!(x, y, epsilon = 1e-12);
    }

    let mut a = directional.generate_series();
    let mut b = assembled.generate_series();
    directional.apply_wum(&dm, &mut a).unwrap();
    assembled.apply_wum(&dm, &mut b).unwrap();
    assert!(a.norm_linf() > 0.0);
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        assert_relative_eq!(x, y, epsilon = 1e-12);
    }

    type VectorBlock = fn(&Model, &[f64], &mut [f64]) -> Result<(), ModelError>;
    let from_vector: [(&str, VectorBlock); 1] = [("Wmm", |m, d, o| m.apply_wmm(d, o))];
    for (name, apply) in from_vector {
        let mut a = vec![0.0; n];
        let mut b = vec![0.0; n];
        apply(&directional, &dm, &mut a).unwrap();
        apply(&assembled, &dm, &mut b).unwrap();
        assert!(a.iter().any(|v| *v != 0.0), "{name} vanished");
        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    type SeriesBlock = fn(&Model, &TimeDependentVector, &mut [f64]) -> Result<(), ModelError>;
    let from_series: [(&str, SeriesBlock); 2] = [
        ("Wmu", |m, d, o| m.apply_wmu(d, o)),
        ("Ct", |m, d, o| m.apply_ct(d, o)),
    ];
    for (name, apply) in from_series {
        let mut a = vec![0.0; n];
        let mut b = vec![0.0; n];
        apply(&directional, &ds, &mut a).unwrap();
        apply(&assembled, &ds, &mut b).unwrap();
        assert!(a.iter().any(|v| *v != 0.0), "{name} vanished");
        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_construction_rejects_bad_input() {
    let mesh = Mesh1D::uniform(0.0, 1.0, 8).unwrap();
    let space = P1Space::new(mesh);
    let wind = WindField::constant(&space.mesh, 1.0);
    let sim = TimeGrid::arange(0.0, 1.0, 0.1).unwrap();
    let ic = vec![0.0; space.dim()];

    // Observation time between stamps
    let obs = TimeGrid::new(vec![0.25]).unwrap();
    let misfit = PointwiseStateObservation::new(&space, vec![0.5], obs).unwrap();
    let result = TimeDependentAD::new(
        space.clone(),
        wind.clone(),
        BiLaplacianPrior::new(&space, 0.1, 1.0).unwrap(),
        misfit,
        sim.clone(),
        ic.clone(),
        ModelConfig::default(),
    );
    assert!(matches!(result, Err(ModelError::Time(_))));

    // Initial condition of the wrong length
    let obs = TimeGrid::new(vec![0.5]).unwrap();
    let misfit = PointwiseStateObservation::new(&space, vec![0.5], obs).unwrap();
    let prior = BiLaplacianPrior::new(&space, 0.1, 1.0).unwrap();
    let result = TimeDependentAD::new(
        space,
        wind,
        prior,
        misfit,
        sim,
        vec![0.0; 3],
        ModelConfig::default(),
    );
    assert!(matches!(result, Err(ModelError::Config(_))));
}

#[test]
fn test_unstabilized_model_still_solves() {
    let model = small_problem_with(ModelConfig::default().with_stabilization(false), 0.4);
    let x = solve_point(&model, &field(&model, 0.0)).unwrap();
    assert!(x.u.as_slice().iter().all(|v| v.is_finite()));
    assert!(x.p.norm_linf() > 0.0);
}

#[test]
fn test_export_state_writes_every_stamp() {
    let model = small_problem(BlockStrategy::Directional);
    let x = solve_point(&model, &field(&model, 0.0)).unwrap();
    let before = x.clone();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.pvd");
    model.export_state(&x, &path, "u").unwrap();

    assert_eq!(x, before);
    let collection = std::fs::read_to_string(&path).unwrap();
    assert_eq!(collection.matches("<DataSet").count(), x.u.n_steps());
    assert!(dir.path().join("state_0000.vtu").exists());
}
