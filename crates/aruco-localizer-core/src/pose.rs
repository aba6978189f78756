//! Solver output in the vision convention (x right, y down, z forward).

use nalgebra::{Isometry3, Matrix3, Matrix4, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid pose of the marker map expressed in the camera frame.
///
/// `rvec` is an axis-angle (Rodrigues) vector, `tvec` a translation in map
/// units. A point `p_map` maps to the camera frame as `R(rvec) * p_map + tvec`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose6DoF {
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl Pose6DoF {
    pub fn new(rvec: Vector3<f64>, tvec: Vector3<f64>) -> Self {
        Self { rvec, tvec }
    }

    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), Vector3::zeros())
    }

    /// Build from a rotation matrix; the matrix is assumed orthonormal.
    pub fn from_rotation_matrix(r: &Matrix3<f64>, tvec: Vector3<f64>) -> Self {
        let rot = Rotation3::from_matrix_unchecked(*r);
        Self::new(rot.scaled_axis(), tvec)
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_scaled_axis(self.rvec)
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation().into_inner()
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.tvec),
            UnitQuaternion::from_scaled_axis(self.rvec),
        )
    }

    /// Homogeneous `[R | t]` matrix.
    pub fn rt_matrix(&self) -> Matrix4<f64> {
        self.to_isometry().to_homogeneous()
    }

    pub fn is_finite(&self) -> bool {
        self.rvec.iter().chain(self.tvec.iter()).all(|v| v.is_finite())
    }
}
