use aruco_localizer_core::{estimate_homography, CameraIntrinsics, Pose6DoF};
use aruco_localizer_map::{InMapObservation, MarkerMap};
use nalgebra::{Matrix3, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{dlt, reprojection_rms, Correspondences, PoseSolution, PoseSolver, SolveFailure};

/// Settings for [`PlanarPoseSolver`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanarSolverParams {
    /// Minimum number of corner correspondences (one marker gives four).
    pub min_points: usize,
    /// Out-of-plane tolerance, relative to the extent of the visible corners.
    pub planarity_tolerance: f64,
    /// Fixed-point iterations used to invert lens distortion.
    pub undistort_iterations: usize,
    /// Reject solutions whose corner RMS reprojection error exceeds this (pixels).
    pub max_reprojection_rms: f64,
}

impl Default for PlanarSolverParams {
    fn default() -> Self {
        Self {
            min_points: 4,
            planarity_tolerance: 1e-6,
            undistort_iterations: 8,
            max_reprojection_rms: 8.0,
        }
    }
}

/// Default [`PoseSolver`].
///
/// When the visible corners are coplanar the pose comes from decomposing the
/// plane-to-image homography, whatever the shape of the rest of the map.
/// Visible corners spanning depth go through a linear DLT, which needs six or
/// more points.
#[derive(Clone, Debug, Default)]
pub struct PlanarPoseSolver {
    params: PlanarSolverParams,
}

impl PlanarPoseSolver {
    pub fn new(params: PlanarSolverParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &PlanarSolverParams {
        &self.params
    }
}

impl PoseSolver for PlanarPoseSolver {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(markers = observations.len()))
    )]
    fn solve(
        &self,
        intrinsics: &CameraIntrinsics,
        map: &MarkerMap,
        observations: &[InMapObservation<'_>],
    ) -> Result<PoseSolution, SolveFailure> {
        if observations.is_empty() {
            return Err(SolveFailure::NoMarkers);
        }
        let corr = Correspondences::from_observations(map, observations);
        let need = self.params.min_points.max(4);
        if corr.len() < need {
            return Err(SolveFailure::TooFewPoints {
                got: corr.len(),
                need,
            });
        }

        let normalized: Vec<Point2<f64>> = corr
            .pixels
            .iter()
            .map(|&p| intrinsics.undistort_point(p, self.params.undistort_iterations))
            .collect();

        let layout = Layout::of(&corr.object, self.params.planarity_tolerance)
            .ok_or(SolveFailure::DegenerateGeometry)?;
        let pose = match layout {
            Layout::Planar(plane) => solve_homography(&plane, &corr.object, &normalized)?,
            Layout::Spatial => {
                if corr.len() < dlt::MIN_POINTS {
                    return Err(SolveFailure::TooFewPoints {
                        got: corr.len(),
                        need: dlt::MIN_POINTS,
                    });
                }
                dlt::solve(&corr.object, &normalized)?
            }
        };

        if !pose.is_finite() {
            return Err(SolveFailure::Numerical);
        }
        let rms =
            reprojection_rms(intrinsics, &pose, &corr).ok_or(SolveFailure::DegenerateGeometry)?;
        if rms > self.params.max_reprojection_rms {
            return Err(SolveFailure::ReprojectionError { rms });
        }

        Ok(PoseSolution {
            pose,
            reprojection_rms: rms,
            num_points: corr.len(),
        })
    }
}

/// Shape of the corners seen in one frame.
enum Layout {
    Planar(MapPlane),
    Spatial,
}

impl Layout {
    /// `None` when the points are coincident or collinear.
    fn of(points: &[Point3<f64>], tol: f64) -> Option<Self> {
        let origin = *points.first()?;
        let (far, extent) = points
            .iter()
            .map(|p| (p - origin, (p - origin).norm()))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        if extent <= f64::EPSILON {
            return None;
        }
        let ex = far / extent;
        let (side, offset) = points
            .iter()
            .map(|p| {
                let c = ex.cross(&(p - origin));
                let n = c.norm();
                (c, n)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        if offset <= tol.max(f64::EPSILON) * extent {
            return None;
        }
        let ez = side / offset;
        let coplanar = points
            .iter()
            .all(|p| (p - origin).dot(&ez).abs() <= tol * extent);
        if !coplanar {
            return Some(Layout::Spatial);
        }
        let ey = ez.cross(&ex);
        Some(Layout::Planar(MapPlane {
            origin,
            axes: Matrix3::from_columns(&[ex, ey, ez]),
        }))
    }
}

/// Orthonormal frame attached to the plane of the visible corners.
///
/// `axes` columns are the in-plane x, in-plane y and the plane normal, all in
/// map coordinates; `origin` is the first visible corner.
struct MapPlane {
    origin: Point3<f64>,
    axes: Matrix3<f64>,
}

impl MapPlane {
    fn to_plane(&self, p: &Point3<f64>) -> Point2<f64> {
        let local = self.axes.transpose() * (p - self.origin);
        Point2::new(local.x, local.y)
    }
}

/// `H ~ [r1 r2 t]` between plane coordinates and normalized image points.
fn solve_homography(
    plane: &MapPlane,
    object: &[Point3<f64>],
    normalized: &[Point2<f64>],
) -> Result<Pose6DoF, SolveFailure> {
    let src: Vec<Point2<f64>> = object.iter().map(|p| plane.to_plane(p)).collect();
    let h = estimate_homography(&src, normalized)
        .ok_or(SolveFailure::DegenerateGeometry)?
        .h;

    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let norm = (h1.norm() + h2.norm()) * 0.5;
    if norm <= f64::EPSILON {
        return Err(SolveFailure::DegenerateGeometry);
    }
    // The plane origin must end up in front of the camera.
    let scale = if h3.z < 0.0 { -1.0 / norm } else { 1.0 / norm };

    let r1 = h1 * scale;
    let r2 = h2 * scale;
    let t_plane: Vector3<f64> = h3 * scale;
    let r_approx = Matrix3::from_columns(&[r1, r2, r1.cross(&r2)]);
    let r_plane = project_to_so3(&r_approx).ok_or(SolveFailure::Numerical)?;

    // p_cam = R_plane * A^T * (p_map - o) + t_plane
    let rotation = r_plane * plane.axes.transpose();
    let translation = t_plane - rotation * plane.origin.coords;
    Ok(Pose6DoF::from_rotation_matrix(&rotation, translation))
}

/// Closest rotation matrix in the Frobenius sense.
pub(super) fn project_to_so3(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let svd = m.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u_fix = u;
        u_fix.column_mut(2).neg_mut();
        r = u_fix * v_t;
    }
    Some(r)
}
