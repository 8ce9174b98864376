//! Discrete simulation time grids.

use super::TimeGridError;

/// Tolerance for matching a requested time against a grid stamp.
pub const TIME_TOLERANCE: f64 = 1e-10;

/// Relative tolerance on step variation for a grid to count as uniform.
const UNIFORM_RTOL: f64 = 1e-8;

/// A strictly increasing sequence of time stamps.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// Wrap explicit stamps, rejecting empty or non-increasing input.
    pub fn new(times: Vec<f64>) -> Result<Self, TimeGridError> {
        if times.is_empty() {
            return Err(TimeGridError::Empty);
        }
        if let Some(index) = times.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(TimeGridError::NotIncreasing { index: index + 1 });
        }
        Ok(Self { times })
    }

    /// Stamps t0, t0 + dt, ... up to and including t1 (within half a step).
    pub fn arange(t0: f64, t1: f64, dt: f64) -> Result<Self, TimeGridError> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(TimeGridError::InvalidStep(dt));
        }
        let n = ((t1 - t0) / dt + 0.5).floor();
        if n < 0.0 {
            return Err(TimeGridError::Empty);
        }
        let times = (0..=n as usize).map(|i| t0 + i as f64 * dt).collect();
        Self::new(times)
    }

    /// All stamps.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of stamps.
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false for a constructed grid; present for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// First stamp.
    pub fn first(&self) -> f64 {
        self.times[0]
    }

    /// Last stamp.
    pub fn last(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Index of the stamp matching `t` within [`TIME_TOLERANCE`].
    pub fn index_of(&self, t: f64) -> Result<usize, TimeGridError> {
        let upper = self.times.partition_point(|&s| s < t);
        let candidates = [upper.checked_sub(1), Some(upper)];
        candidates
            .into_iter()
            .flatten()
            .filter(|&i| i < self.times.len())
            .find(|&i| (self.times[i] - t).abs() < TIME_TOLERANCE)
            .ok_or(TimeGridError::TimeNotOnGrid(t))
    }

    /// Whether `t` is one of the stamps.
    pub fn contains(&self, t: f64) -> bool {
        self.index_of(t).is_ok()
    }

    /// The constant step Δt, failing if the grid is not uniform.
    pub fn uniform_step(&self) -> Result<f64, TimeGridError> {
        if self.times.len() < 2 {
            return Err(TimeGridError::TooFewSteps(self.times.len()));
        }
        let dt = self.times[1] - self.times[0];
        for (i, w) in self.times.windows(2).enumerate() {
            let step = w[1] - w[0];
            if (step - dt).abs() > UNIFORM_RTOL * dt.abs() {
                return Err(TimeGridError::NonUniform {
                    index: i + 1,
                    expected: dt,
                    actual: step,
                });
            }
        }
        Ok(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arange_includes_endpoint() {
        let grid = TimeGrid::arange(0.0, 4.0, 0.1).unwrap();
        assert_eq!(grid.len(), 41);
        assert!((grid.last() - 4.0).abs() < 1e-12);
        assert!((grid.uniform_step().unwrap() - 0.1).abs() < 1e-14);
    }

    #[test]
    fn test_index_of() {
        let grid = TimeGrid::arange(0.0, 1.0, 0.25).unwrap();
        assert_eq!(grid.index_of(0.5).unwrap(), 2);
        assert_eq!(grid.index_of(0.5 + 1e-12).unwrap(), 2);
        assert_eq!(grid.index_of(0.5 - 1e-12).unwrap(), 2);
        assert_eq!(grid.index_of(1.0).unwrap(), 4);
        assert_eq!(
            grid.index_of(0.3),
            Err(TimeGridError::TimeNotOnGrid(0.3))
        );
    }

    #[test]
    fn test_rejects_non_uniform() {
        let grid = TimeGrid::new(vec![0.0, 0.1, 0.25]).unwrap();
        assert!(matches!(
            grid.uniform_step(),
            Err(TimeGridError::NonUniform { index: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_stamps() {
        assert_eq!(TimeGrid::new(vec![]), Err(TimeGridError::Empty));
        assert_eq!(
            TimeGrid::new(vec![0.0, 1.0, 1.0]),
            Err(TimeGridError::NotIncreasing { index: 2 })
        );
        assert_eq!(
            TimeGrid::new(vec![0.0]).unwrap().uniform_step(),
            Err(TimeGridError::TooFewSteps(1))
        );
    }
}
