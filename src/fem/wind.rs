//! Advecting velocity field.

use crate::mesh::Mesh1D;

/// Piecewise-constant wind velocity, one value per element.
#[derive(Clone, Debug, PartialEq)]
pub struct WindField {
    values: Vec<f64>,
}

impl WindField {
    /// Uniform velocity over every element.
    pub fn constant(mesh: &Mesh1D, velocity: f64) -> Self {
        Self {
            values: vec![velocity; mesh.n_elements],
        }
    }

    /// Velocity sampled at element midpoints.
    pub fn from_fn<F>(mesh: &Mesh1D, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        let values = (0..mesh.n_elements)
            .map(|k| f(mesh.reference_to_physical(k, 0.0)))
            .collect();
        Self { values }
    }

    /// Explicit per-element values.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Velocity on element k.
    #[inline]
    pub fn on_element(&self, k: usize) -> f64 {
        self.values[k]
    }

    /// Number of elements covered.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no element is covered.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest |w| over the mesh.
    pub fn max_speed(&self) -> f64 {
        self.values.iter().map(|v| v.abs()).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint_sampling() {
        let mesh = Mesh1D::uniform(0.0, 1.0, 2).unwrap();
        let wind = WindField::from_fn(&mesh, |x| -x);
        assert_eq!(wind.len(), 2);
        assert!((wind.on_element(0) + 0.25).abs() < 1e-14);
        assert!((wind.on_element(1) + 0.75).abs() < 1e-14);
        assert!((wind.max_speed() - 0.75).abs() < 1e-14);
    }
}
