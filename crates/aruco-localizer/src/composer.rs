//! Converts solver poses into the navigation frame tree.
//!
//! Tree: `world -> aruco -> camera -> body`. The two outer links are fixed
//! mounting transforms; `aruco -> camera` comes from the solver.

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use aruco_localizer_core::{FrameTransform, Pose6DoF, Stamp};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::sink::FrameSink;

/// Rows of the fixed axis permutation from the vision convention
/// (x right, y down, z forward) to the navigation convention.
pub const VISION_TO_NAV: [[f64; 3]; 3] = [[-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]];

/// Roll, pitch, yaw of the body frame relative to the camera.
pub const CAMERA_TO_BODY_RPY: [f64; 3] = [0.0, -FRAC_PI_2, 0.0];

/// Height of the marker map below the world origin, in meters.
pub const DEFAULT_MAP_MOUNT_OFFSET: f64 = -0.4064;

pub fn vision_to_nav() -> Matrix3<f64> {
    let r = VISION_TO_NAV;
    Matrix3::new(
        r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
    )
}

/// Names of the four frames of the tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameNames {
    pub world: String,
    pub map: String,
    pub camera: String,
    pub body: String,
}

impl Default for FrameNames {
    fn default() -> Self {
        Self {
            world: "world".to_string(),
            map: "aruco".to_string(),
            camera: "camera".to_string(),
            body: "body".to_string(),
        }
    }
}

/// Odometry-style record of the camera pose in the map frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    pub stamp: Stamp,
    pub frame_id: String,
    pub child_frame_id: String,
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl From<&FrameTransform> for PoseEstimate {
    fn from(tf: &FrameTransform) -> Self {
        Self {
            stamp: tf.stamp,
            frame_id: tf.parent.clone(),
            child_frame_id: tf.child.clone(),
            position: tf.translation,
            orientation: tf.rotation,
        }
    }
}

/// Transforms produced for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ComposedFrame {
    /// `world -> map`, then `map -> camera` when a pose exists, then `camera -> body`.
    pub transforms: Vec<FrameTransform>,
    pub estimate: Option<PoseEstimate>,
}

pub struct FrameComposer {
    names: FrameNames,
    map_mount_offset: f64,
    sink: Arc<dyn FrameSink>,
}

impl FrameComposer {
    pub fn new(names: FrameNames, map_mount_offset: f64, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            names,
            map_mount_offset,
            sink,
        }
    }

    #[inline]
    pub fn names(&self) -> &FrameNames {
        &self.names
    }

    /// `[world -> map, camera -> body]`.
    pub fn static_transforms(&self, stamp: Stamp) -> [FrameTransform; 2] {
        let [roll, pitch, yaw] = CAMERA_TO_BODY_RPY;
        [
            FrameTransform::new(
                &self.names.world,
                &self.names.map,
                UnitQuaternion::identity(),
                Vector3::new(0.0, 0.0, self.map_mount_offset),
                stamp,
            ),
            FrameTransform::new(
                &self.names.camera,
                &self.names.body,
                UnitQuaternion::from_euler_angles(roll, pitch, yaw),
                Vector3::zeros(),
                stamp,
            ),
        ]
    }

    /// `map -> camera` from a solver pose: rotation `R * VISION_TO_NAV^T`,
    /// translation `tvec`.
    pub fn dynamic_transform(&self, pose: &Pose6DoF, stamp: Stamp) -> FrameTransform {
        let nav = pose.rotation_matrix() * vision_to_nav().transpose();
        let rotation =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(nav));
        FrameTransform::new(
            &self.names.map,
            &self.names.camera,
            rotation,
            pose.tvec,
            stamp,
        )
    }

    /// Build the frame's transforms and hand them to the sink.
    ///
    /// Static links are produced for every frame; the dynamic link and the
    /// estimate only when `pose` is present.
    pub fn compose(&self, pose: Option<&Pose6DoF>, stamp: Stamp) -> ComposedFrame {
        let [world_map, camera_body] = self.static_transforms(stamp);
        let dynamic = pose.map(|p| self.dynamic_transform(p, stamp));
        let estimate = dynamic.as_ref().map(PoseEstimate::from);

        let mut transforms = Vec::with_capacity(3);
        transforms.push(world_map);
        transforms.extend(dynamic);
        transforms.push(camera_body);

        self.sink.send_transforms(&transforms);
        if let Some(est) = &estimate {
            self.sink.send_estimate(est);
        }

        ComposedFrame {
            transforms,
            estimate,
        }
    }
}

impl std::fmt::Debug for FrameComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameComposer")
            .field("names", &self.names)
            .field("map_mount_offset", &self.map_mount_offset)
            .finish_non_exhaustive()
    }
}
