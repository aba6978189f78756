//! Linear PnP for maps whose markers do not share a plane.

use aruco_localizer_core::Pose6DoF;
use nalgebra::{DMatrix, Matrix3, Matrix3x4, Matrix4, Point2, Point3, Vector3};

use super::planar::project_to_so3;
use super::SolveFailure;

pub(super) const MIN_POINTS: usize = 6;

/// Solve `[R | t]` from map points and normalized image points.
///
/// Map points are centred and scaled before building the `2n x 12` system;
/// the rotation block is projected onto SO(3) afterwards.
pub(super) fn solve(
    object: &[Point3<f64>],
    normalized: &[Point2<f64>],
) -> Result<Pose6DoF, SolveFailure> {
    let n = object.len();
    if n < MIN_POINTS || normalized.len() != n {
        return Err(SolveFailure::TooFewPoints {
            got: n,
            need: MIN_POINTS,
        });
    }

    let centroid = object.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n as f64;
    let mean_dist = object
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .sum::<f64>()
        / n as f64;
    if mean_dist <= f64::EPSILON {
        return Err(SolveFailure::DegenerateGeometry);
    }
    let scale = 3.0_f64.sqrt() / mean_dist;

    let mut t_world = Matrix4::identity() * scale;
    t_world[(3, 3)] = 1.0;
    t_world
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&(-scale * centroid));

    let mut a = DMatrix::<f64>::zeros(2 * n, 12);
    for (i, (pw, pn)) in object.iter().zip(normalized).enumerate() {
        let q = (pw.coords - centroid) * scale;
        let (u, v) = (pn.x, pn.y);
        let r0 = 2 * i;
        let r1 = r0 + 1;
        for k in 0..3 {
            a[(r0, k)] = q[k];
            a[(r0, 8 + k)] = -u * q[k];
            a[(r1, 4 + k)] = q[k];
            a[(r1, 8 + k)] = -v * q[k];
        }
        a[(r0, 3)] = 1.0;
        a[(r0, 11)] = -u;
        a[(r1, 7)] = 1.0;
        a[(r1, 11)] = -v;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(SolveFailure::Numerical)?;
    let row = v_t.row(v_t.nrows() - 1);
    let p_norm = Matrix3x4::from_fn(|r, c| row[4 * r + c]);
    let p = p_norm * t_world;

    let m: Matrix3<f64> = p.fixed_view::<3, 3>(0, 0).into_owned();
    let mut s = (m.row(0).norm() + m.row(1).norm() + m.row(2).norm()) / 3.0;
    if s <= f64::EPSILON {
        return Err(SolveFailure::DegenerateGeometry);
    }
    if m.determinant() < 0.0 {
        s = -s;
    }

    let rotation = project_to_so3(&(m / s)).ok_or(SolveFailure::Numerical)?;
    let translation = p.column(3).into_owned() / s;
    Ok(Pose6DoF::from_rotation_matrix(&rotation, translation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};

    #[test]
    fn recovers_pose_from_two_layers() {
        let gt = Isometry3::from_parts(
            Translation3::new(0.1, -0.05, 1.0),
            UnitQuaternion::from_euler_angles(0.1, -0.05, 0.2),
        );
        let mut object = Vec::new();
        let mut image = Vec::new();
        for z in 0..2 {
            for y in 0..3 {
                for x in 0..4 {
                    let pw = Point3::new(x as f64 * 0.1, y as f64 * 0.1, 0.5 + z as f64 * 0.1);
                    let pc = gt.transform_point(&pw);
                    object.push(pw);
                    image.push(Point2::new(pc.x / pc.z, pc.y / pc.z));
                }
            }
        }

        let est = solve(&object, &image).expect("dlt").to_isometry();
        assert!((est.translation.vector - gt.translation.vector).norm() < 1e-6);
        assert!(est.rotation.angle_to(&gt.rotation) < 1e-6);
    }

    #[test]
    fn needs_six_points() {
        let pts = vec![Point3::origin(); 5];
        let img = vec![Point2::origin(); 5];
        assert_eq!(
            solve(&pts, &img).unwrap_err(),
            SolveFailure::TooFewPoints { got: 5, need: 6 }
        );
    }
}
