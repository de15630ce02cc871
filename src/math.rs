//! Linear algebra used by the pipeline.
//!
//! Vector and matrix storage comes from nalgebra. Components are accessed through named fields
//! (`x`, `y`, `z`, `w`), so an out-of-range component index does not compile. What lives here are
//! the operations whose failure modes we want to be explicit about: normalization of a zero
//! vector, inversion of a singular matrix and projection of a point at infinity.

use na::{SVector, Vector2, Vector3, Vector4, Matrix4};
use nalgebra as na;

pub type Vec2 = Vector2<f64>;
pub type Vec3 = Vector3<f64>;
pub type Vec4 = Vector4<f64>;
/// 4x4 matrix, indexed as `m[(row, col)]`.
pub type Mat4 = Matrix4<f64>;

/// Determinant magnitude at or below which a matrix is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-10;

/// Numeric failures of the linear algebra routines.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum MathError {
    #[error("cannot normalize a vector with zero (or non-finite) norm")]
    ZeroNorm,

    #[error("matrix is singular (determinant {determinant:e})")]
    Singular { determinant: f64 },

    #[error("homogeneous point has w == 0")]
    ZeroW,
}

/// Vector divided by its euclidean norm.
pub fn normalized<const D: usize>(v: &SVector<f64, D>) -> Result<SVector<f64, D>, MathError> {
    let norm = v.norm();
    if norm == 0.0 || !norm.is_finite() {
        return Err(MathError::ZeroNorm);
    }
    return Ok(v / norm);
}

/// Transformation of a point to homogeneous coordinates.
pub fn embed_point(v: Vec3) -> Vec4 {
    return Vec4::new(v.x, v.y, v.z, 1.0);
}

/// Transformation of a direction to homogeneous coordinates, translation doesn't affect it.
pub fn embed_vector(v: Vec3) -> Vec4 {
    return Vec4::new(v.x, v.y, v.z, 0.0);
}

/// Transformation of a point from homogeneous coordinates (perspective divide).
pub fn project_point(v: Vec4) -> Result<Vec3, MathError> {
    if v.w == 0.0 {
        return Err(MathError::ZeroW);
    }
    return Ok(Vec3::new(v.x / v.w, v.y / v.w, v.z / v.w));
}

/// Drops the w component without dividing.
pub fn truncate(v: Vec4) -> Vec3 {
    return Vec3::new(v.x, v.y, v.z);
}

/// Determinant of the 3x3 matrix left after removing `skip_row` and `skip_col`.
fn minor(m: &Mat4, skip_row: usize, skip_col: usize) -> f64 {
    let mut rows = [0usize; 3];
    let mut cols = [0usize; 3];
    let (mut ri, mut ci) = (0, 0);
    for i in 0..4 {
        if i != skip_row {
            rows[ri] = i;
            ri += 1;
        }
        if i != skip_col {
            cols[ci] = i;
            ci += 1;
        }
    }
    let a = |r: usize, c: usize| m[(rows[r], cols[c])];
    return a(0, 0) * (a(1, 1) * a(2, 2) - a(1, 2) * a(2, 1))
        - a(0, 1) * (a(1, 0) * a(2, 2) - a(1, 2) * a(2, 0))
        + a(0, 2) * (a(1, 0) * a(2, 1) - a(1, 1) * a(2, 0));
}

/// Signed minor.
pub fn cofactor(m: &Mat4, row: usize, col: usize) -> f64 {
    let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
    return sign * minor(m, row, col);
}

/// Determinant by cofactor expansion along the first row.
pub fn determinant(m: &Mat4) -> f64 {
    return (0..4).map(|col| m[(0, col)] * cofactor(m, 0, col)).sum();
}

/// Transposed cofactor matrix.
pub fn adjugate(m: &Mat4) -> Mat4 {
    return Mat4::from_fn(|row, col| cofactor(m, col, row));
}

/// General inverse, `adj(m) / det(m)`.
pub fn inverse(m: &Mat4) -> Result<Mat4, MathError> {
    let determinant = determinant(m);
    if determinant.abs() <= SINGULAR_EPSILON {
        return Err(MathError::Singular { determinant });
    }
    return Ok(adjugate(m) / determinant);
}

/// Matrix used to carry normals through `m`.
pub fn inverse_transpose(m: &Mat4) -> Result<Mat4, MathError> {
    return Ok(inverse(m)?.transpose());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat_approx_eq(a: &Mat4, b: &Mat4, eps: f64) -> bool {
        return a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < eps);
    }

    fn sample_matrix() -> Mat4 {
        return Mat4::new(
            2.0, 0.5, 0.0, 1.0,
            0.0, 3.0, 1.0, -2.0,
            1.0, 0.0, 4.0, 0.5,
            0.0, 0.0, 0.25, 1.0,
        );
    }

    #[test]
    fn normalized_unit_length() {
        let v = normalized(&Vec3::new(3.0, 0.0, 4.0)).unwrap();
        assert!((v.norm() - 1.0).abs() < 1e-12);
        assert!((v.x - 0.6).abs() < 1e-12);
        assert!((v.z - 0.8).abs() < 1e-12);
    }

    #[test]
    fn normalized_zero_vector_fails() {
        assert_eq!(normalized(&Vec3::zeros()), Err(MathError::ZeroNorm));
        assert_eq!(normalized(&Vec2::zeros()), Err(MathError::ZeroNorm));
    }

    #[test]
    fn determinant_matches_nalgebra() {
        let m = sample_matrix();
        assert!((determinant(&m) - m.determinant()).abs() < 1e-9);
        assert_eq!(determinant(&Mat4::identity()), 1.0);
    }

    #[test]
    fn inverse_is_complete() {
        let m = sample_matrix();
        let inv = inverse(&m).unwrap();
        // Every entry has to be right, not just [0, 0].
        assert!(mat_approx_eq(&(m * inv), &Mat4::identity(), 1e-9));
        assert!(mat_approx_eq(&(inv * m), &Mat4::identity(), 1e-9));
        assert!(mat_approx_eq(&inv, &m.try_inverse().unwrap(), 1e-9));
    }

    #[test]
    fn inverse_of_singular_fails() {
        let mut m = sample_matrix();
        for col in 0..4 {
            m[(3, col)] = 2.0 * m[(1, col)];
        }
        assert!(matches!(inverse(&m), Err(MathError::Singular { .. })));
    }

    #[test]
    fn inverse_transpose_keeps_normals_perpendicular() {
        // Non-uniform scale skews normals when they go through m directly.
        let m = Mat4::new_nonuniform_scaling(&Vec3::new(4.0, 1.0, 1.0));
        let tangent = Vec3::new(1.0, -1.0, 0.0);
        let normal = Vec3::new(1.0, 1.0, 0.0);
        let t = truncate(m * embed_vector(tangent));
        let n = truncate(inverse_transpose(&m).unwrap() * embed_vector(normal));
        assert!(t.dot(&n).abs() < 1e-12);
        assert!(truncate(m * embed_vector(normal)).dot(&t).abs() > 1.0);
    }

    #[test]
    fn project_point_divides_by_w() {
        let p = project_point(Vec4::new(2.0, 4.0, 6.0, 2.0)).unwrap();
        assert_eq!(p, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(project_point(Vec4::new(1.0, 1.0, 1.0, 0.0)), Err(MathError::ZeroW));
    }
}
