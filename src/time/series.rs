//! Time-indexed vectors.

use super::{TimeGrid, TimeGridError};
use crate::linalg::vector;

/// One spatial vector per stamp of a [`TimeGrid`].
///
/// Storage is contiguous: the vector at stamp i occupies
/// `data[i * dim..(i + 1) * dim]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeDependentVector {
    grid: TimeGrid,
    dim: usize,
    data: Vec<f64>,
}

impl TimeDependentVector {
    /// Zero vectors of length `dim` at every stamp of `grid`.
    pub fn new(grid: TimeGrid, dim: usize) -> Self {
        let data = vec![0.0; grid.len() * dim];
        Self { grid, dim, data }
    }

    /// Zero-initialized vector with the same grid and layout as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::new(self.grid.clone(), self.dim)
    }

    /// The time grid.
    #[inline]
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// The time stamps.
    #[inline]
    pub fn times(&self) -> &[f64] {
        self.grid.times()
    }

    /// Spatial dimension of each snapshot.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of snapshots.
    #[inline]
    pub fn n_steps(&self) -> usize {
        self.grid.len()
    }

    /// Snapshot by position.
    #[inline]
    pub fn at(&self, index: usize) -> &[f64] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    /// Mutable snapshot by position.
    #[inline]
    pub fn at_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.data[index * self.dim..(index + 1) * self.dim]
    }

    /// Snapshot at time `t`.
    pub fn view(&self, t: f64) -> Result<&[f64], TimeGridError> {
        let i = self.grid.index_of(t)?;
        Ok(self.at(i))
    }

    /// Mutable snapshot at time `t`.
    pub fn view_mut(&mut self, t: f64) -> Result<&mut [f64], TimeGridError> {
        let i = self.grid.index_of(t)?;
        Ok(self.at_mut(i))
    }

    /// Copy `v` into the snapshot at time `t`.
    pub fn store(&mut self, v: &[f64], t: f64) -> Result<(), TimeGridError> {
        self.check_dim(v.len())?;
        self.view_mut(t)?.copy_from_slice(v);
        Ok(())
    }

    /// Copy the snapshot at time `t` into `buffer`.
    pub fn retrieve(&self, buffer: &mut [f64], t: f64) -> Result<(), TimeGridError> {
        self.check_dim(buffer.len())?;
        buffer.copy_from_slice(self.view(t)?);
        Ok(())
    }

    /// Set every snapshot to zero.
    pub fn zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
    }

    /// self <- self + alpha * other
    pub fn axpy(&mut self, alpha: f64, other: &TimeDependentVector) -> Result<(), TimeGridError> {
        self.check_layout(other)?;
        vector::axpy(alpha, &other.data, &mut self.data);
        Ok(())
    }

    /// self <- alpha * self
    pub fn scale(&mut self, alpha: f64) {
        vector::scale(alpha, &mut self.data);
    }

    /// Sum over all stamps of the snapshot inner products.
    pub fn inner(&self, other: &TimeDependentVector) -> Result<f64, TimeGridError> {
        self.check_layout(other)?;
        Ok(vector::dot(&self.data, &other.data))
    }

    /// Largest absolute entry over all stamps and all positions.
    pub fn norm_linf(&self) -> f64 {
        vector::norm_linf(&self.data)
    }

    /// All entries, stamp-major.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// All entries, stamp-major, mutable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Iterate over (time, snapshot) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &[f64])> + '_ {
        self.grid
            .times()
            .iter()
            .copied()
            .zip(self.data.chunks_exact(self.dim.max(1)))
    }

    fn check_dim(&self, len: usize) -> Result<(), TimeGridError> {
        if len == self.dim {
            Ok(())
        } else {
            Err(TimeGridError::DimensionMismatch {
                expected: self.dim,
                actual: len,
            })
        }
    }

    fn check_layout(&self, other: &TimeDependentVector) -> Result<(), TimeGridError> {
        self.check_dim(other.dim)?;
        if self.grid != other.grid {
            return Err(TimeGridError::GridMismatch);
        }
        Ok(())
    }
}
