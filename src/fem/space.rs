//! P1 function space and element-wise assembly.

use crate::linalg::{SparseBuilder, SparseMatrix};
use crate::mesh::Mesh1D;
use crate::polynomial::GaussLegendre;

/// Continuous piecewise-linear functions on a [`Mesh1D`].
///
/// Element integrals use a Gauss-Legendre rule mapped to the unit
/// interval: ∫_e f dx = h_e Σ_q w_q f(ξ_q).
#[derive(Clone, Debug)]
pub struct P1Space {
    /// Underlying mesh
    pub mesh: Mesh1D,
    /// Quadrature points on [0, 1]
    quad_points: Vec<f64>,
    /// Quadrature weights on [0, 1], summing to 1
    quad_weights: Vec<f64>,
}

impl P1Space {
    /// Space with the default 2-point rule.
    pub fn new(mesh: Mesh1D) -> Self {
        Self::with_quadrature(mesh, &GaussLegendre::default())
    }

    /// Space with an explicit quadrature rule.
    pub fn with_quadrature(mesh: Mesh1D, rule: &GaussLegendre) -> Self {
        let (quad_points, quad_weights) = rule.unit_interval();
        Self {
            mesh,
            quad_points,
            quad_weights,
        }
    }

    /// Number of degrees of freedom.
    #[inline]
    pub fn dim(&self) -> usize {
        self.mesh.n_dofs()
    }

    /// Number of elements.
    #[inline]
    pub fn n_elements(&self) -> usize {
        self.mesh.n_elements
    }

    /// Size of element k.
    #[inline]
    pub fn h(&self, k: usize) -> f64 {
        self.mesh.element_sizes[k]
    }

    /// Quadrature points and weights on the unit interval.
    pub fn quadrature(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.quad_points
            .iter()
            .copied()
            .zip(self.quad_weights.iter().copied())
    }

    /// Basis values [φ_left(ξ), φ_right(ξ)] at unit coordinate ξ.
    #[inline]
    pub fn basis(xi: f64) -> [f64; 2] {
        [1.0 - xi, xi]
    }

    /// Physical basis gradients on element k.
    #[inline]
    pub fn basis_gradients(&self, k: usize) -> [f64; 2] {
        let h = self.h(k);
        [-1.0 / h, 1.0 / h]
    }

    /// Restrict a global vector to element k.
    #[inline]
    pub fn local(&self, values: &[f64], k: usize) -> [f64; 2] {
        let [a, b] = self.mesh.element_dofs(k);
        [values[a], values[b]]
    }

    /// Evaluate a local P1 field at unit coordinate ξ.
    #[inline]
    pub fn eval(local: [f64; 2], xi: f64) -> f64 {
        let phi = Self::basis(xi);
        local[0] * phi[0] + local[1] * phi[1]
    }

    /// Assemble a global matrix from 2x2 element matrices.
    ///
    /// `local(k)[i][j]` pairs test function i with trial function j.
    pub fn assemble_matrix<F>(&self, local: F) -> SparseMatrix
    where
        F: Fn(usize) -> [[f64; 2]; 2],
    {
        let n = self.dim();
        let mut builder = SparseBuilder::new(n, n);
        for k in 0..self.n_elements() {
            builder.add_local(self.mesh.element_dofs(k), &local(k));
        }
        builder.build()
    }

    /// Assemble a global vector from element contributions into `out`.
    pub fn assemble_vector<F>(&self, out: &mut [f64], local: F)
    where
        F: Fn(usize) -> [f64; 2],
    {
        debug_assert_eq!(out.len(), self.dim());
        out.iter_mut().for_each(|v| *v = 0.0);
        for k in 0..self.n_elements() {
            let contribution = local(k);
            for (&dof, c) in self.mesh.element_dofs(k).iter().zip(contribution) {
                out[dof] += c;
            }
        }
    }

    /// Consistent mass matrix ∫ φ_i φ_j dx.
    pub fn mass_matrix(&self) -> SparseMatrix {
        self.assemble_matrix(|k| {
            let h = self.h(k);
            let mut m = [[0.0; 2]; 2];
            for (xi, w) in self.quadrature() {
                let phi = Self::basis(xi);
                for i in 0..2 {
                    for j in 0..2 {
                        m[i][j] += h * w * phi[i] * phi[j];
                    }
                }
            }
            m
        })
    }

    /// Stiffness matrix ∫ φ_i' φ_j' dx.
    pub fn stiffness_matrix(&self) -> SparseMatrix {
        self.assemble_matrix(|k| {
            let h = self.h(k);
            let g = self.basis_gradients(k);
            [
                [h * g[0] * g[0], h * g[0] * g[1]],
                [h * g[1] * g[0], h * g[1] * g[1]],
            ]
        })
    }

    /// ∫ u dx for a P1 field.
    pub fn integrate(&self, values: &[f64]) -> f64 {
        (0..self.n_elements())
            .map(|k| {
                let u = self.local(values, k);
                0.5 * self.h(k) * (u[0] + u[1])
            })
            .sum()
    }
}
