//! Compressed sparse row matrices.
//!
//! Layout:
//! - `row_ptr`: length n_rows + 1, row i occupies `row_ptr[i]..row_ptr[i+1]`
//! - `col_idx`: column of each stored entry, sorted within a row
//! - `values`: stored entries

use std::collections::BTreeMap;

use faer::Mat;

use super::LinAlgError;

/// Accumulating builder; entries added twice at the same position are summed.
#[derive(Debug, Clone)]
pub struct SparseBuilder {
    n_rows: usize,
    n_cols: usize,
    entries: BTreeMap<(usize, usize), f64>,
}

impl SparseBuilder {
    /// Create an empty builder of the given shape.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            entries: BTreeMap::new(),
        }
    }

    /// Add `value` at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n_rows && col < self.n_cols);
        *self.entries.entry((row, col)).or_insert(0.0) += value;
    }

    /// Scatter a 2x2 element matrix into the global positions `dofs`.
    pub fn add_local(&mut self, dofs: [usize; 2], local: &[[f64; 2]; 2]) {
        for (a, &row) in dofs.iter().enumerate() {
            for (b, &col) in dofs.iter().enumerate() {
                self.add(row, col, local[a][b]);
            }
        }
    }

    /// Freeze into CSR form.
    pub fn build(self) -> SparseMatrix {
        let mut row_ptr = vec![0usize; self.n_rows + 1];
        let mut col_idx = Vec::with_capacity(self.entries.len());
        let mut values = Vec::with_capacity(self.entries.len());

        // BTreeMap iterates in (row, col) order, which is exactly CSR order
        for (&(row, col), &value) in &self.entries {
            row_ptr[row + 1] += 1;
            col_idx.push(col);
            values.push(value);
        }
        for i in 0..self.n_rows {
            row_ptr[i + 1] += row_ptr[i];
        }

        SparseMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }
}

/// CSR matrix of f64 entries.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored entry at (row, col), zero when absent.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_idx[range.clone()].binary_search(&col) {
            Ok(local) => self.values[range.start + local],
            Err(_) => 0.0,
        }
    }

    /// Iterate over (col, value) pairs of a row.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// y = A x
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) -> Result<(), LinAlgError> {
        check_len(self.n_cols, x.len())?;
        check_len(self.n_rows, y.len())?;

        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.row(i).map(|(j, a)| a * x[j]).sum();
        }
        Ok(())
    }

    /// y = Aᵀ x
    pub fn transpose_mul_vec(&self, x: &[f64], y: &mut [f64]) -> Result<(), LinAlgError> {
        check_len(self.n_rows, x.len())?;
        check_len(self.n_cols, y.len())?;

        y.iter_mut().for_each(|v| *v = 0.0);
        for (i, &xi) in x.iter().enumerate() {
            for (j, a) in self.row(i) {
                y[j] += a * xi;
            }
        }
        Ok(())
    }

    /// Explicit transpose.
    pub fn transpose(&self) -> SparseMatrix {
        let mut builder = SparseBuilder::new(self.n_cols, self.n_rows);
        for i in 0..self.n_rows {
            for (j, a) in self.row(i) {
                builder.add(j, i, a);
            }
        }
        builder.build()
    }

    /// self + alpha * other, over the union of both sparsity patterns.
    pub fn add_scaled(&self, alpha: f64, other: &SparseMatrix) -> Result<SparseMatrix, LinAlgError> {
        check_len(self.n_rows, other.n_rows)?;
        check_len(self.n_cols, other.n_cols)?;

        let mut builder = SparseBuilder::new(self.n_rows, self.n_cols);
        for i in 0..self.n_rows {
            for (j, a) in self.row(i) {
                builder.add(i, j, a);
            }
            for (j, b) in other.row(i) {
                builder.add(i, j, alpha * b);
            }
        }
        Ok(builder.build())
    }

    /// Scale all entries in place.
    pub fn scale(&mut self, alpha: f64) {
        self.values.iter_mut().for_each(|v| *v *= alpha);
    }

    /// Dense copy for factorization.
    pub fn to_dense(&self) -> Mat<f64> {
        let mut dense = Mat::zeros(self.n_rows, self.n_cols);
        for i in 0..self.n_rows {
            for (j, a) in self.row(i) {
                dense[(i, j)] = a;
            }
        }
        dense
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), LinAlgError> {
    if expected == actual {
        Ok(())
    } else {
        Err(LinAlgError::DimensionMismatch { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiag(n: usize) -> SparseMatrix {
        let mut b = SparseBuilder::new(n, n);
        for i in 0..n {
            b.add(i, i, 4.0);
            if i + 1 < n {
                b.add(i, i + 1, -1.0);
                b.add(i + 1, i, -2.0);
            }
        }
        b.build()
    }

    #[test]
    fn test_builder_sums_duplicates() {
        let mut b = SparseBuilder::new(2, 2);
        b.add(0, 1, 1.5);
        b.add(0, 1, 2.5);
        b.add(1, 0, -1.0);
        let a = b.build();

        assert_eq!(a.nnz(), 2);
        assert_eq!(a.get(0, 1), 4.0);
        assert_eq!(a.get(1, 0), -1.0);
        assert_eq!(a.get(0, 0), 0.0);
    }

    #[test]
    fn test_add_local() {
        let mut b = SparseBuilder::new(3, 3);
        let local = [[1.0, 2.0], [3.0, 4.0]];
        b.add_local([0, 1], &local);
        b.add_local([1, 2], &local);
        let a = b.build();

        assert_eq!(a.get(1, 1), 5.0);
        assert_eq!(a.get(1, 2), 2.0);
        assert_eq!(a.get(2, 1), 3.0);
    }

    #[test]
    fn test_mul_and_transpose_mul_agree() {
        let a = tridiag(5);
        let at = a.transpose();
        let x: Vec<f64> = (0..5).map(|i| (i as f64 + 1.0).sin()).collect();

        let mut y1 = vec![0.0; 5];
        let mut y2 = vec![0.0; 5];
        a.transpose_mul_vec(&x, &mut y1).unwrap();
        at.mul_vec(&x, &mut y2).unwrap();

        for i in 0..5 {
            assert!((y1[i] - y2[i]).abs() < 1e-14);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = tridiag(3);
        let mut y = vec![0.0; 3];
        assert_eq!(
            a.mul_vec(&[1.0, 2.0], &mut y),
            Err(LinAlgError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_add_scaled_and_dense() {
        let a = tridiag(3);
        let sum = a.add_scaled(-1.0, &a).unwrap();
        let dense = sum.to_dense();
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(dense[(i, j)], 0.0);
            }
        }
    }
}
