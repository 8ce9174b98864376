//! Pointwise observation operators.

use crate::linalg::{SparseBuilder, SparseMatrix};
use crate::mesh::MeshError;

use super::P1Space;

/// Build B with (B u)_i = u(targets[i]) for P1 fields u.
///
/// Each row holds the two basis values of the element containing the
/// target. Targets outside the mesh are rejected.
pub fn assemble_pointwise_observation(
    space: &P1Space,
    targets: &[f64],
) -> Result<SparseMatrix, MeshError> {
    let mut builder = SparseBuilder::new(targets.len(), space.dim());
    for (i, &x) in targets.iter().enumerate() {
        let (k, r) = space.mesh.locate(x)?;
        let phi = P1Space::basis(0.5 * (1.0 + r));
        for (&dof, value) in space.mesh.element_dofs(k).iter().zip(phi) {
            builder.add(i, dof, value);
        }
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh1D;
    use approx::assert_relative_eq;

    #[test]
    fn test_observation_reproduces_linear_field() {
        let space = P1Space::new(Mesh1D::uniform(0.0, 1.0, 5).unwrap());
        let targets = [0.0, 0.13, 0.5, 0.77, 1.0];
        let b = assemble_pointwise_observation(&space, &targets).unwrap();
        assert_eq!(b.n_rows(), 5);
        assert_eq!(b.n_cols(), 6);

        let u = space.mesh.interpolate(|x| 3.0 * x - 1.0);
        let mut bu = vec![0.0; 5];
        b.mul_vec(&u, &mut bu).unwrap();
        for (i, &x) in targets.iter().enumerate() {
            assert_relative_eq!(bu[i], 3.0 * x - 1.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_target_outside_domain() {
        let space = P1Space::new(Mesh1D::uniform(0.0, 1.0, 5).unwrap());
        assert!(assemble_pointwise_observation(&space, &[1.2]).is_err());
    }
}
