//! Core types for marker-map localization.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete marker detector, pose solver or transport.
//!
//! - [`CameraInfo`] / [`CameraIntrinsics`]: external calibration message and
//!   its normalized form.
//! - [`Pose6DoF`]: solver output in the vision convention.
//! - [`FrameTransform`]: a named, stamped rigid transform.

mod homography;
mod intrinsics;
mod logger;
mod pose;
mod transform;

pub use homography::{estimate_homography, Homography};
pub use intrinsics::{
    CameraInfo, CameraIntrinsics, ImageSize, IntrinsicsWarning, NormalizedIntrinsics,
    DISTORTION_LEN,
};
pub use pose::Pose6DoF;
pub use transform::{FrameTransform, Stamp};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
