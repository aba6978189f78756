#![allow(dead_code)]

use aruco_localizer::core::CameraInfo;
use aruco_localizer::map::{MapUnits, MarkerDetection, MarkerInfo, MarkerMap};
use nalgebra::{Isometry3, Point2, Point3, Translation3, UnitQuaternion};

pub const FX: f64 = 600.0;

pub fn camera_info(fx: f64) -> CameraInfo {
    CameraInfo {
        width: 640,
        height: 480,
        k: [fx, 0.0, 320.0, 0.0, fx, 240.0, 0.0, 0.0, 1.0],
        d: vec![0.0; 5],
        distortion_model: Some("plumb_bob".to_string()),
        frame_id: Some("camera".to_string()),
    }
}

pub fn square(id: i32, x0: f64, y0: f64, side: f64) -> MarkerInfo {
    MarkerInfo {
        id,
        corners: [
            Point3::new(x0, y0, 0.0),
            Point3::new(x0 + side, y0, 0.0),
            Point3::new(x0 + side, y0 - side, 0.0),
            Point3::new(x0, y0 - side, 0.0),
        ],
    }
}

/// Two 10 cm markers side by side, in meters.
pub fn metric_map() -> MarkerMap {
    MarkerMap::new(
        "ARUCO_MIP_36h12",
        MapUnits::Meters,
        vec![square(10, -0.1, 0.05, 0.1), square(20, 0.05, 0.05, 0.1)],
    )
    .expect("map")
}

/// Same layout as [`metric_map`] drawn at 1000 px per meter.
pub fn pixel_map_json() -> String {
    r#"{
        "dictionary": "ARUCO_MIP_36h12",
        "units": "pixels",
        "markers": [
            { "id": 10, "corners": [[-100,50,0],[0,50,0],[0,-50,0],[-100,-50,0]] },
            { "id": 20, "corners": [[50,50,0],[150,50,0],[150,-50,0],[50,-50,0]] }
        ]
    }"#
    .to_string()
}

pub fn ground_truth() -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(0.02, -0.03, 0.7),
        UnitQuaternion::from_euler_angles(0.2, -0.1, 0.05),
    )
}

/// Pinhole projection of a map marker (no distortion).
pub fn project(marker: &MarkerInfo, pose: &Isometry3<f64>, fx: f64) -> MarkerDetection {
    let corners = marker.corners.map(|p| {
        let pc = pose.transform_point(&p);
        Point2::new(
            (fx * pc.x / pc.z + 320.0) as f32,
            (fx * pc.y / pc.z + 240.0) as f32,
        )
    });
    MarkerDetection::new(marker.id, corners)
}

pub fn project_map(map: &MarkerMap, pose: &Isometry3<f64>) -> Vec<MarkerDetection> {
    map.markers().iter().map(|m| project(m, pose, FX)).collect()
}

pub fn foreign_marker(id: i32) -> MarkerDetection {
    MarkerDetection::new(
        id,
        [
            Point2::new(10.0, 10.0),
            Point2::new(40.0, 10.0),
            Point2::new(40.0, 40.0),
            Point2::new(10.0, 40.0),
        ],
    )
}
