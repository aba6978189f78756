//! Debug overlay: in-map marker outlines and the map axes.

use aruco_localizer_core::{CameraIntrinsics, Pose6DoF};
use aruco_localizer_map::InMapObservation;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use nalgebra::{Point2, Point3};

const OUTLINE: Rgb<u8> = Rgb([255, 0, 0]);
const FIRST_CORNER: Rgb<u8> = Rgb([255, 255, 0]);
const AXIS_X: Rgb<u8> = Rgb([255, 0, 0]);
const AXIS_Y: Rgb<u8> = Rgb([0, 255, 0]);
const AXIS_Z: Rgb<u8> = Rgb([0, 0, 255]);

/// Outline every in-map marker and mark its first corner.
pub fn draw_markers(image: &mut RgbImage, observations: &[InMapObservation<'_>]) {
    for obs in observations {
        let c = &obs.detection.corners;
        for i in 0..4 {
            let a = c[i];
            let b = c[(i + 1) % 4];
            draw_line_segment_mut(image, (a.x, a.y), (b.x, b.y), OUTLINE);
        }
        draw_filled_circle_mut(
            image,
            (c[0].x.round() as i32, c[0].y.round() as i32),
            2,
            FIRST_CORNER,
        );
    }
}

/// Draw the map origin axes (`x` red, `y` green, `z` blue) of length `length`.
///
/// Nothing is drawn when the origin or an axis tip is behind the camera.
pub fn draw_axes(
    image: &mut RgbImage,
    intrinsics: &CameraIntrinsics,
    pose: &Pose6DoF,
    length: f64,
) {
    let iso = pose.to_isometry();
    let project = |p: Point3<f64>| -> Option<(f32, f32)> {
        let pc = iso.transform_point(&p);
        if pc.z <= f64::EPSILON {
            return None;
        }
        let px = intrinsics.project_normalized(Point2::new(pc.x / pc.z, pc.y / pc.z));
        Some((px.x as f32, px.y as f32))
    };

    let Some(origin) = project(Point3::origin()) else {
        return;
    };
    let tips = [
        (Point3::new(length, 0.0, 0.0), AXIS_X),
        (Point3::new(0.0, length, 0.0), AXIS_Y),
        (Point3::new(0.0, 0.0, length), AXIS_Z),
    ];
    for (tip, color) in tips {
        if let Some(end) = project(tip) {
            draw_line_segment_mut(image, origin, end, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aruco_localizer_core::CameraInfo;
    use aruco_localizer_map::{select_in_map, MapUnits, MarkerDetection, MarkerInfo, MarkerMap};
    use nalgebra::Vector3;

    #[test]
    fn outlines_detected_marker() {
        let map = MarkerMap::new(
            "ARUCO",
            MapUnits::Meters,
            vec![MarkerInfo {
                id: 2,
                corners: [
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(1.0, -1.0, 0.0),
                    Point3::new(0.0, -1.0, 0.0),
                ],
            }],
        )
        .expect("map");
        let dets = vec![MarkerDetection::new(
            2,
            [
                Point2::new(10.0, 10.0),
                Point2::new(30.0, 10.0),
                Point2::new(30.0, 30.0),
                Point2::new(10.0, 30.0),
            ],
        )];
        let mut img = RgbImage::new(40, 40);
        draw_markers(&mut img, &select_in_map(&map, &dets));

        assert_eq!(*img.get_pixel(20, 10), OUTLINE);
        assert_eq!(*img.get_pixel(10, 10), FIRST_CORNER);
        assert_eq!(*img.get_pixel(20, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn axes_start_at_projected_origin() {
        let intrinsics = CameraIntrinsics::from_camera_info(&CameraInfo {
            width: 64,
            height: 48,
            k: [50.0, 0.0, 32.0, 0.0, 50.0, 24.0, 0.0, 0.0, 1.0],
            d: vec![0.0; 4],
            distortion_model: None,
            frame_id: None,
        })
        .intrinsics;
        let pose = Pose6DoF::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let mut img = RgbImage::new(64, 48);
        draw_axes(&mut img, &intrinsics, &pose, 0.2);

        assert_eq!(*img.get_pixel(40, 24), AXIS_X);
        assert_eq!(*img.get_pixel(32, 32), AXIS_Y);

        let behind = Pose6DoF::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -1.0));
        let mut blank = RgbImage::new(64, 48);
        draw_axes(&mut blank, &intrinsics, &behind, 0.2);
        assert!(blank.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
