//! Linear solver backend.

use faer::Col;
use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::Lu;
use faer::sparse::{SparseColMat, Triplet};

use super::{LinAlgError, SparseMatrix};

/// A factorize-once, solve-many linear solver.
pub trait LinearSolver {
    /// Factorize `operator`, replacing any previous factorization.
    fn set_operator(&mut self, operator: &SparseMatrix) -> Result<(), LinAlgError>;

    /// Solve A x = rhs with the current factorization, writing x into `out`.
    fn solve(&self, rhs: &[f64], out: &mut [f64]) -> Result<(), LinAlgError>;

    /// Dimension of the factorized operator, if any.
    fn dim(&self) -> Option<usize>;
}

/// Sparse LU with partial (row) pivoting.
///
/// The CSR operator is converted to faer's column-major sparse format and
/// factorized without densifying.
#[derive(Default)]
pub struct LuSolver {
    lu: Option<Lu<usize, f64>>,
    n: usize,
}

impl LuSolver {
    /// Create an empty solver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a solver and factorize `operator` immediately.
    pub fn factorized(operator: &SparseMatrix) -> Result<Self, LinAlgError> {
        let mut solver = Self::new();
        solver.set_operator(operator)?;
        Ok(solver)
    }
}

/// Copy a CSR matrix into faer's sparse column storage.
fn to_faer(operator: &SparseMatrix) -> Result<SparseColMat<usize, f64>, LinAlgError> {
    let triplets: Vec<Triplet<usize, usize, f64>> = (0..operator.n_rows())
        .flat_map(|i| operator.row(i).map(move |(j, v)| Triplet::new(i, j, v)))
        .collect();
    SparseColMat::try_new_from_triplets(operator.n_rows(), operator.n_cols(), &triplets)
        .map_err(|e| LinAlgError::Factorization(format!("{e:?}")))
}

impl LinearSolver for LuSolver {
    fn set_operator(&mut self, operator: &SparseMatrix) -> Result<(), LinAlgError> {
        if operator.n_rows() != operator.n_cols() {
            return Err(LinAlgError::NotSquare {
                rows: operator.n_rows(),
                cols: operator.n_cols(),
            });
        }

        let matrix = to_faer(operator)?;
        let lu = matrix.sp_lu().map_err(|_| LinAlgError::Singular)?;
        self.lu = Some(lu);
        self.n = operator.n_rows();
        log::trace!("Sparse LU of operator of size {} ({} nnz)", self.n, operator.nnz());
        Ok(())
    }

    fn solve(&self, rhs: &[f64], out: &mut [f64]) -> Result<(), LinAlgError> {
        let lu = self.lu.as_ref().ok_or(LinAlgError::NotFactorized)?;
        if rhs.len() != self.n {
            return Err(LinAlgError::DimensionMismatch {
                expected: self.n,
                actual: rhs.len(),
            });
        }
        if out.len() != self.n {
            return Err(LinAlgError::DimensionMismatch {
                expected: self.n,
                actual: out.len(),
            });
        }

        let mut x = Col::<f64>::from_fn(self.n, |i| rhs[i]);
        lu.solve_in_place(&mut x);
        for (i, o) in out.iter_mut().enumerate() {
            *o = x[i];
        }

        if out.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(LinAlgError::Singular)
        }
    }

    fn dim(&self) -> Option<usize> {
        self.lu.as_ref().map(|_| self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::SparseBuilder;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_tridiagonal() {
        let n = 6;
        let mut b = SparseBuilder::new(n, n);
        for i in 0..n {
            b.add(i, i, 2.0);
            if i + 1 < n {
                b.add(i, i + 1, -0.5);
                b.add(i + 1, i, -0.7);
            }
        }
        let a = b.build();
        let solver = LuSolver::factorized(&a).unwrap();
        assert_eq!(solver.dim(), Some(n));

        let x_true: Vec<f64> = (0..n).map(|i| i as f64 - 2.5).collect();
        let mut rhs = vec![0.0; n];
        a.mul_vec(&x_true, &mut rhs).unwrap();

        let mut x = vec![0.0; n];
        solver.solve(&rhs, &mut x).unwrap();
        for i in 0..n {
            assert_relative_eq!(x[i], x_true[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_errors() {
        let solver = LuSolver::new();
        let mut out = vec![0.0; 2];
        assert_eq!(
            solver.solve(&[1.0, 2.0], &mut out),
            Err(LinAlgError::NotFactorized)
        );

        let rect = SparseBuilder::new(2, 3).build();
        assert!(matches!(
            LuSolver::factorized(&rect),
            Err(LinAlgError::NotSquare { rows: 2, cols: 3 })
        ));
    }

    /// Diagonally dominant tridiagonal system with a known solution.
    fn tridiagonal(n: usize) -> SparseMatrix {
        let mut b = SparseBuilder::new(n, n);
        for i in 0..n {
            b.add(i, i, 4.0);
            if i + 1 < n {
                b.add(i, i + 1, -1.0);
                b.add(i + 1, i, -1.5);
            }
        }
        b.build()
    }

    #[test]
    fn test_solve_larger_systems() {
        for n in [16, 17, 32, 64, 257] {
            let a = tridiagonal(n);
            let solver = LuSolver::factorized(&a).unwrap();

            let x_true: Vec<f64> = (0..n).map(|i| (0.3 * i as f64).sin() + 1.0).collect();
            let mut rhs = vec![0.0; n];
            a.mul_vec(&x_true, &mut rhs).unwrap();

            let mut x = vec![0.0; n];
            solver.solve(&rhs, &mut x).unwrap();
            for i in 0..n {
                assert_relative_eq!(x[i], x_true[i], epsilon = 1e-10);
            }
        }
    }
}
