//! Multi-marker pose solving.
//!
//! The tracker only depends on the [`PoseSolver`] trait. [`PlanarPoseSolver`]
//! is the default implementation: a homography decomposition when the visible
//! corners are coplanar and a linear PnP (DLT) when they span depth.

mod dlt;
mod planar;

pub use planar::{PlanarPoseSolver, PlanarSolverParams};

use aruco_localizer_core::{CameraIntrinsics, Pose6DoF};
use aruco_localizer_map::{InMapObservation, MarkerMap};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Why a frame produced no pose. These are normal per-frame outcomes.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SolveFailure {
    #[error("no map markers visible")]
    NoMarkers,
    #[error("too few correspondences ({got} < {need})")]
    TooFewPoints { got: usize, need: usize },
    #[error("degenerate marker geometry")]
    DegenerateGeometry,
    #[error("reprojection error too large ({rms:.2} px)")]
    ReprojectionError { rms: f64 },
    #[error("numerical failure in pose solve")]
    Numerical,
}

/// A solved camera pose with its fit quality.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseSolution {
    /// Map pose in the camera frame (vision convention).
    pub pose: Pose6DoF,
    /// Root-mean-square corner reprojection error in pixels.
    pub reprojection_rms: f64,
    pub num_points: usize,
}

/// Solves one rigid camera pose from all visible map markers.
pub trait PoseSolver: Send + Sync {
    fn solve(
        &self,
        intrinsics: &CameraIntrinsics,
        map: &MarkerMap,
        observations: &[InMapObservation<'_>],
    ) -> Result<PoseSolution, SolveFailure>;
}

/// Flattened 3D-2D corner correspondences.
pub(crate) struct Correspondences {
    pub object: Vec<Point3<f64>>,
    pub pixels: Vec<Point2<f64>>,
}

impl Correspondences {
    /// Corners of observations whose id is missing from `map` are skipped.
    pub fn from_observations(map: &MarkerMap, observations: &[InMapObservation<'_>]) -> Self {
        let n = observations.len() * 4;
        let mut object = Vec::with_capacity(n);
        let mut pixels = Vec::with_capacity(n);
        for obs in observations {
            let Some(corners) = map.object_points(obs.detection.id) else {
                continue;
            };
            for (p3, p2) in corners.iter().zip(obs.detection.corners.iter()) {
                object.push(*p3);
                pixels.push(Point2::new(p2.x as f64, p2.y as f64));
            }
        }
        Self { object, pixels }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.object.len()
    }
}

/// RMS pixel error of `pose` over the correspondences, or `None` if any point
/// falls behind the camera.
pub(crate) fn reprojection_rms(
    intrinsics: &CameraIntrinsics,
    pose: &Pose6DoF,
    corr: &Correspondences,
) -> Option<f64> {
    let iso = pose.to_isometry();
    let mut sum = 0.0;
    for (pw, px) in corr.object.iter().zip(corr.pixels.iter()) {
        let pc = iso.transform_point(pw);
        if pc.z <= 0.0 {
            return None;
        }
        let proj = intrinsics.project_normalized(Point2::new(pc.x / pc.z, pc.y / pc.z));
        sum += (proj - px).norm_squared();
    }
    Some((sum / corr.len().max(1) as f64).sqrt())
}
