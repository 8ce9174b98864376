//! Property-based checks of the weak form and time-indexed vectors.

use ad_rs::forms::FormPoint;
use ad_rs::linalg::vector::dot;
use ad_rs::{AdvectionDiffusionForm, Mesh1D, P1Space, Role, TimeDependentVector, TimeGrid, VariationalForm, WindField};
use proptest::prelude::*;

const N_ELEMENTS: usize = 8;
const DIM: usize = N_ELEMENTS + 1;

fn form(wind: f64) -> AdvectionDiffusionForm {
    let space = P1Space::new(Mesh1D::uniform(0.0, 1.0, N_ELEMENTS).unwrap());
    let wind = WindField::constant(&space.mesh, wind);
    AdvectionDiffusionForm::new(space, wind).unwrap()
}

fn field() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0f64..1.0, DIM)
}

fn close(a: f64, b: f64, scale: f64) -> bool {
    (a - b).abs() <= 1e-10 * scale.max(1.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// r(u, m, p) = pᵀ N(m) u for any arguments.
    #[test]
    fn residual_is_bilinear(u in field(), m in field(), p in field(), w in -2.0f64..2.0) {
        let form = form(w);
        let point = FormPoint { u: &u, m: &m, p: &p };
        let mut nu = vec![0.0; DIM];
        form.assemble_operator(&m).mul_vec(&u, &mut nu).unwrap();
        let r = form.residual(&point);
        let pnu = dot(&p, &nu);
        prop_assert!(close(r, pnu, pnu.abs()), "r = {}, pᵀNu = {}", r, pnu);
    }

    /// ⟨∂²r/∂i∂j · dj, di⟩ = ⟨∂²r/∂j∂i · di, dj⟩ for every pair of roles.
    #[test]
    fn second_derivatives_are_symmetric(
        u in field(),
        m in field(),
        p in field(),
        d1 in field(),
        d2 in field(),
        w in -2.0f64..2.0,
    ) {
        let form = form(w);
        let point = FormPoint { u: &u, m: &m, p: &p };
        let mut a = vec![0.0; DIM];
        let mut b = vec![0.0; DIM];
        for i in Role::ALL {
            for j in Role::ALL {
                form.second_derivative_action(i, j, &point, &d2, &mut a);
                form.second_derivative_action(j, i, &point, &d1, &mut b);
                let lhs = dot(&a, &d1);
                let rhs = dot(&b, &d2);
                prop_assert!(close(lhs, rhs, lhs.abs()), "({}, {}): {} vs {}", i, j, lhs, rhs);
            }
        }
    }

    /// Time-indexed inner products are bilinear and symmetric.
    #[test]
    fn series_inner_is_bilinear(
        a in prop::collection::vec(-10.0f64..10.0, 3 * DIM),
        b in prop::collection::vec(-10.0f64..10.0, 3 * DIM),
        alpha in -5.0f64..5.0,
    ) {
        let grid = TimeGrid::arange(0.0, 1.0, 0.5).unwrap();
        let mut x = TimeDependentVector::new(grid.clone(), DIM);
        let mut y = TimeDependentVector::new(grid, DIM);
        x.as_mut_slice().copy_from_slice(&a);
        y.as_mut_slice().copy_from_slice(&b);

        let xy = x.inner(&y).unwrap();
        prop_assert_eq!(xy, y.inner(&x).unwrap());

        let xx = x.inner(&x).unwrap();
        let mut z = x.clone();
        z.axpy(alpha, &y).unwrap();
        let expected = xx + alpha * xy;
        let actual = z.inner(&x).unwrap();
        prop_assert!(close(actual, expected, xx.abs() + (alpha * xy).abs()));
    }
}
