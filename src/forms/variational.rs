//! Trait for residual weak forms r(u, m, p) on a P1 space.

use crate::fem::P1Space;
use crate::linalg::{SparseBuilder, SparseMatrix};

use super::Role;

/// Global coefficient vectors at which a form is evaluated.
#[derive(Clone, Copy, Debug)]
pub struct FormPoint<'a> {
    /// State coefficients
    pub u: &'a [f64],
    /// Parameter coefficients
    pub m: &'a [f64],
    /// Adjoint coefficients
    pub p: &'a [f64],
}

/// Coefficients restricted to one element.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalPoint {
    pub u: [f64; 2],
    pub m: [f64; 2],
    pub p: [f64; 2],
}

impl LocalPoint {
    /// Local coefficients of `role`.
    #[inline]
    pub fn get(&self, role: Role) -> [f64; 2] {
        match role {
            Role::State => self.u,
            Role::Parameter => self.m,
            Role::Adjoint => self.p,
        }
    }
}

/// A residual form r(u, m, p) = Σ_k r_k(u|_k, m|_k, p|_k), linear in the
/// adjoint argument.
///
/// Implementors supply element-level derivatives; assembly into global
/// vectors and sparse matrices is provided. Second derivatives are
/// returned as actions
///
/// out = ∂/∂(wrt) [ ∂r/∂(dir) · d ]
///
/// so that the assembled operator and the directional action of the same
/// role pair agree entry for entry.
pub trait VariationalForm: Send + Sync {
    /// The space all three roles are discretized in.
    fn space(&self) -> &P1Space;

    /// Element residual r_k.
    fn local_residual(&self, k: usize, x: &LocalPoint) -> f64;

    /// Element gradient ∂r_k/∂(role).
    fn local_first_derivative(&self, k: usize, role: Role, x: &LocalPoint) -> [f64; 2];

    /// Element second derivative ∂/∂(wrt) [∂r_k/∂(dir) · d].
    fn local_second_derivative(
        &self,
        k: usize,
        wrt: Role,
        dir: Role,
        x: &LocalPoint,
        d: [f64; 2],
    ) -> [f64; 2];

    /// Restrict a global point to element k.
    fn localize(&self, point: &FormPoint<'_>, k: usize) -> LocalPoint {
        let space = self.space();
        LocalPoint {
            u: space.local(point.u, k),
            m: space.local(point.m, k),
            p: space.local(point.p, k),
        }
    }

    /// r(u, m, p) summed over all elements.
    fn residual(&self, point: &FormPoint<'_>) -> f64 {
        (0..self.space().n_elements())
            .map(|k| self.local_residual(k, &self.localize(point, k)))
            .sum()
    }

    /// out = ∂r/∂(role) at `point`.
    fn first_derivative(&self, role: Role, point: &FormPoint<'_>, out: &mut [f64]) {
        self.space().assemble_vector(out, |k| {
            self.local_first_derivative(k, role, &self.localize(point, k))
        });
    }

    /// out = ∂/∂(wrt) [∂r/∂(dir) · direction] at `point`.
    fn second_derivative_action(
        &self,
        wrt: Role,
        dir: Role,
        point: &FormPoint<'_>,
        direction: &[f64],
        out: &mut [f64],
    ) {
        let space = self.space();
        space.assemble_vector(out, |k| {
            let d = space.local(direction, k);
            self.local_second_derivative(k, wrt, dir, &self.localize(point, k), d)
        });
    }

    /// Assembled W with W[i][j] = ∂²r/∂(wrt)_i ∂(dir)_j at `point`.
    ///
    /// Columns of each element block are obtained by acting on the local
    /// unit directions.
    fn assemble_second_derivative(&self, wrt: Role, dir: Role, point: &FormPoint<'_>) -> SparseMatrix {
        let space = self.space();
        let n = space.dim();
        let mut builder = SparseBuilder::new(n, n);
        for k in 0..space.n_elements() {
            let x = self.localize(point, k);
            let col0 = self.local_second_derivative(k, wrt, dir, &x, [1.0, 0.0]);
            let col1 = self.local_second_derivative(k, wrt, dir, &x, [0.0, 1.0]);
            let local = [[col0[0], col1[0]], [col0[1], col1[1]]];
            builder.add_local(space.mesh.element_dofs(k), &local);
        }
        builder.build()
    }

    /// The operator N(m) with N[i][j] = ∂²r/∂p_i ∂u_j.
    ///
    /// Rows pair with the adjoint (test) role, columns with the state
    /// (trial) role.
    fn assemble_operator(&self, m: &[f64]) -> SparseMatrix {
        let zeros = vec![0.0; self.space().dim()];
        let point = FormPoint {
            u: &zeros,
            m,
            p: &zeros,
        };
        self.assemble_second_derivative(Role::Adjoint, Role::State, &point)
    }

    /// Nᵀ(m), assembled with the roles of test and trial swapped.
    fn assemble_transpose_operator(&self, m: &[f64]) -> SparseMatrix {
        let zeros = vec![0.0; self.space().dim()];
        let point = FormPoint {
            u: &zeros,
            m,
            p: &zeros,
        };
        self.assemble_second_derivative(Role::State, Role::Adjoint, &point)
    }
}
