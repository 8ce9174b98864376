//! 1D mesh representation.
//!
//! A 1D mesh is a partition of an interval [x_min, x_max] into elements.
//! Continuous P1 fields live on the vertices: element k couples the degrees
//! of freedom k and k + 1.

use thiserror::Error;

/// Error type for mesh construction and point location.
#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    /// Fewer than one element requested.
    #[error("Need at least one element, got {0}")]
    TooFewElements(usize),

    /// Vertex coordinates are not strictly increasing.
    #[error("Vertices must be strictly increasing (violated at vertex {index})")]
    NonMonotone { index: usize },

    /// A point lies outside [x_min, x_max].
    #[error("Point {x} lies outside the domain [{x_min}, {x_max}]")]
    OutsideDomain { x: f64, x_min: f64, x_max: f64 },

    /// A per-element field does not match the element count.
    #[error("Element field has {got} values for {expected} elements")]
    ElementFieldLength { expected: usize, got: usize },
}

/// 1D mesh of an interval.
#[derive(Clone, Debug)]
pub struct Mesh1D {
    /// Left endpoint of domain
    pub x_min: f64,
    /// Right endpoint of domain
    pub x_max: f64,
    /// Number of elements
    pub n_elements: usize,
    /// Element vertices: vertices[k] is left endpoint of element k
    /// vertices has length n_elements + 1
    pub vertices: Vec<f64>,
    /// Element sizes: h[k] = vertices[k+1] - vertices[k]
    pub element_sizes: Vec<f64>,
}

impl Mesh1D {
    /// Create a uniform mesh of [x_min, x_max] with n_elements elements.
    pub fn uniform(x_min: f64, x_max: f64, n_elements: usize) -> Result<Self, MeshError> {
        if n_elements == 0 {
            return Err(MeshError::TooFewElements(0));
        }
        if !(x_max > x_min) {
            return Err(MeshError::NonMonotone { index: 1 });
        }

        let h = (x_max - x_min) / n_elements as f64;
        let mut vertices: Vec<f64> = (0..=n_elements).map(|i| x_min + i as f64 * h).collect();
        // Pin the right endpoint against accumulated rounding
        vertices[n_elements] = x_max;

        Self::from_vertices(vertices)
    }

    /// Create a mesh from an explicit, strictly increasing vertex list.
    pub fn from_vertices(vertices: Vec<f64>) -> Result<Self, MeshError> {
        if vertices.len() < 2 {
            return Err(MeshError::TooFewElements(vertices.len().saturating_sub(1)));
        }
        if let Some(index) = vertices.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(MeshError::NonMonotone { index: index + 1 });
        }

        let element_sizes: Vec<f64> = vertices.windows(2).map(|w| w[1] - w[0]).collect();

        Ok(Self {
            x_min: vertices[0],
            x_max: vertices[vertices.len() - 1],
            n_elements: element_sizes.len(),
            vertices,
            element_sizes,
        })
    }

    /// Number of P1 degrees of freedom (one per vertex).
    pub fn n_dofs(&self) -> usize {
        self.vertices.len()
    }

    /// Global degrees of freedom of element k, left then right.
    #[inline]
    pub fn element_dofs(&self, k: usize) -> [usize; 2] {
        [k, k + 1]
    }

    /// Map reference coordinate r in [-1, 1] to physical coordinate x in element k.
    ///
    /// x = x_k + (1 + r) * h_k / 2
    pub fn reference_to_physical(&self, k: usize, r: f64) -> f64 {
        self.vertices[k] + (1.0 + r) * self.element_sizes[k] / 2.0
    }

    /// Map physical coordinate x to reference coordinate r in element k.
    ///
    /// r = 2 * (x - x_k) / h_k - 1
    pub fn physical_to_reference(&self, k: usize, x: f64) -> f64 {
        2.0 * (x - self.vertices[k]) / self.element_sizes[k] - 1.0
    }

    /// Get the Jacobian dx/dr for element k.
    pub fn jacobian(&self, k: usize) -> f64 {
        self.element_sizes[k] / 2.0
    }

    /// Find the element containing x and the reference coordinate of x in it.
    ///
    /// Points on an interior vertex are assigned to the element on the left.
    pub fn locate(&self, x: f64) -> Result<(usize, f64), MeshError> {
        let tol = 1e-12 * self.length();
        if x < self.x_min - tol || x > self.x_max + tol {
            return Err(MeshError::OutsideDomain {
                x,
                x_min: self.x_min,
                x_max: self.x_max,
            });
        }

        // First vertex strictly right of x, clamped to a valid element
        let upper = self.vertices.partition_point(|&v| v < x);
        let k = upper.saturating_sub(1).min(self.n_elements - 1);
        let r = self.physical_to_reference(k, x).clamp(-1.0, 1.0);
        Ok((k, r))
    }

    /// Get total domain length.
    pub fn length(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Get minimum element size.
    pub fn h_min(&self) -> f64 {
        self.element_sizes
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    /// Interpolate a function at the vertices (nodal P1 interpolant).
    pub fn interpolate<F>(&self, f: F) -> Vec<f64>
    where
        F: Fn(f64) -> f64,
    {
        self.vertices.iter().map(|&x| f(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_mesh() {
        let mesh = Mesh1D::uniform(0.0, 1.0, 4).unwrap();

        assert_eq!(mesh.n_elements, 4);
        assert_eq!(mesh.n_dofs(), 5);
        assert!((mesh.h_min() - 0.25).abs() < 1e-14);
        assert_eq!(mesh.element_dofs(2), [2, 3]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            Mesh1D::uniform(0.0, 1.0, 0).unwrap_err(),
            MeshError::TooFewElements(0)
        );
        assert_eq!(
            Mesh1D::from_vertices(vec![0.0, 0.5, 0.5, 1.0]).unwrap_err(),
            MeshError::NonMonotone { index: 2 }
        );
    }

    #[test]
    fn test_reference_roundtrip() {
        let mesh = Mesh1D::from_vertices(vec![0.0, 0.1, 0.4, 1.0]).unwrap();

        for k in 0..mesh.n_elements {
            for &r in &[-1.0, -0.5, 0.0, 0.5, 1.0] {
                let x = mesh.reference_to_physical(k, r);
                let r_back = mesh.physical_to_reference(k, x);
                assert!((r - r_back).abs() < 1e-14);
            }
        }
        assert!((mesh.jacobian(2) - 0.3).abs() < 1e-14);
    }

    #[test]
    fn test_locate() {
        let mesh = Mesh1D::uniform(0.0, 1.0, 4).unwrap();

        let (k, r) = mesh.locate(0.375).unwrap();
        assert_eq!(k, 1);
        assert!(r.abs() < 1e-14);

        // Endpoints belong to the boundary elements
        assert_eq!(mesh.locate(0.0).unwrap().0, 0);
        assert_eq!(mesh.locate(1.0).unwrap().0, 3);

        // Interior vertex goes left
        let (k, r) = mesh.locate(0.5).unwrap();
        assert_eq!(k, 1);
        assert!((r - 1.0).abs() < 1e-14);

        assert!(matches!(
            mesh.locate(1.5),
            Err(MeshError::OutsideDomain { .. })
        ));
    }

    #[test]
    fn test_interpolate() {
        let mesh = Mesh1D::uniform(0.0, 2.0, 2).unwrap();
        let values = mesh.interpolate(|x| x * x);
        assert_eq!(values, vec![0.0, 1.0, 4.0]);
    }
}
