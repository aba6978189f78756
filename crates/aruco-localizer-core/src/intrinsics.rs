//! Camera intrinsics: the external calibration message and its normalized form.

use nalgebra::{Matrix3, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Number of distortion coefficients the pose solver accepts (k1, k2, p1, p2).
pub const DISTORTION_LEN: usize = 4;

/// Camera calibration message as published by a camera driver.
///
/// `k` is the 3x3 intrinsic matrix in row-major order. `d` has whatever length
/// the driver's distortion model produces (commonly 4, 5 or 8).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub width: u32,
    pub height: u32,
    pub k: [f64; 9],
    #[serde(default)]
    pub d: Vec<f64>,
    #[serde(default)]
    pub distortion_model: Option<String>,
    #[serde(default)]
    pub frame_id: Option<String>,
}

/// Image size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Recoverable anomalies found while normalizing a [`CameraInfo`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IntrinsicsWarning {
    #[error("distortion has {len} coefficients (expected 4 or 5), assuming zero distortion")]
    UnsupportedDistortionLength { len: usize },
}

/// Intrinsics in the form the pose solver consumes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Intrinsic matrix in pixels.
    pub k: Matrix3<f64>,
    /// Distortion `[k1, k2, p1, p2]`.
    pub distortion: [f64; DISTORTION_LEN],
    pub image_size: ImageSize,
}

/// Result of [`CameraIntrinsics::from_camera_info`].
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedIntrinsics {
    pub intrinsics: CameraIntrinsics,
    pub warnings: Vec<IntrinsicsWarning>,
}

impl CameraIntrinsics {
    /// Normalize a calibration message.
    ///
    /// The matrix is filled with `row = i / 3, col = i % 3`. Distortion of
    /// length 4 is kept, length 5 is truncated to its first 4 values (k3 is
    /// dropped), and any other length becomes all-zero with a warning.
    pub fn from_camera_info(info: &CameraInfo) -> NormalizedIntrinsics {
        let mut k = Matrix3::zeros();
        for (i, &v) in info.k.iter().enumerate() {
            k[(i / 3, i % 3)] = v;
        }

        let mut warnings = Vec::new();
        let mut distortion = [0.0; DISTORTION_LEN];
        match info.d.len() {
            4 | 5 => distortion.copy_from_slice(&info.d[..DISTORTION_LEN]),
            len => warnings.push(IntrinsicsWarning::UnsupportedDistortionLength { len }),
        }

        NormalizedIntrinsics {
            intrinsics: Self {
                k,
                distortion,
                image_size: ImageSize {
                    width: info.width,
                    height: info.height,
                },
            },
            warnings,
        }
    }

    #[inline]
    pub fn fx(&self) -> f64 {
        self.k[(0, 0)]
    }

    #[inline]
    pub fn fy(&self) -> f64 {
        self.k[(1, 1)]
    }

    #[inline]
    pub fn cx(&self) -> f64 {
        self.k[(0, 2)]
    }

    #[inline]
    pub fn cy(&self) -> f64 {
        self.k[(1, 2)]
    }

    #[inline]
    pub fn skew(&self) -> f64 {
        self.k[(0, 1)]
    }

    /// True when the matrix and size are usable by a solver.
    pub fn is_valid(&self) -> bool {
        self.k.iter().all(|v| v.is_finite())
            && self.distortion.iter().all(|v| v.is_finite())
            && self.fx() > 0.0
            && self.fy() > 0.0
            && self.image_size.width > 0
            && self.image_size.height > 0
    }

    fn distort_normalized(&self, p: Vector2<f64>) -> Vector2<f64> {
        let [k1, k2, p1, p2] = self.distortion;
        let (x, y) = (p.x, p.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + k1 * r2 + k2 * r2 * r2;
        Vector2::new(
            x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x),
            y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y,
        )
    }

    /// Map a normalized (undistorted) camera point to pixels.
    pub fn project_normalized(&self, p: Point2<f64>) -> Point2<f64> {
        let d = self.distort_normalized(p.coords);
        Point2::new(
            self.fx() * d.x + self.skew() * d.y + self.cx(),
            self.fy() * d.y + self.cy(),
        )
    }

    /// Map a pixel to normalized undistorted coordinates.
    ///
    /// The distortion model is inverted by fixed-point iteration; `iters = 0`
    /// only removes the pinhole part.
    pub fn undistort_point(&self, px: Point2<f64>, iters: usize) -> Point2<f64> {
        let y = (px.y - self.cy()) / self.fy();
        let x = (px.x - self.cx() - self.skew() * y) / self.fx();
        let distorted = Vector2::new(x, y);

        let mut p = distorted;
        for _ in 0..iters {
            let err = self.distort_normalized(p) - distorted;
            p -= err;
        }
        Point2::from(p)
    }
}
