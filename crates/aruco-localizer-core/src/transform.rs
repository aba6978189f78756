//! Named, stamped rigid transforms between coordinate frames.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Wall-clock stamp split into seconds and nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stamp {
    pub sec: u64,
    pub nsec: u32,
}

impl Stamp {
    pub fn new(sec: u64, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nsec as f64 * 1e-9
    }
}

/// Transform of `child` expressed in `parent`: `p_parent = R * p_child + t`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameTransform {
    pub parent: String,
    pub child: String,
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
    pub stamp: Stamp,
}

impl FrameTransform {
    pub fn new(
        parent: impl Into<String>,
        child: impl Into<String>,
        rotation: UnitQuaternion<f64>,
        translation: Vector3<f64>,
        stamp: Stamp,
    ) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            rotation,
            translation,
            stamp,
        }
    }

    pub fn connects(&self, parent: &str, child: &str) -> bool {
        self.parent == parent && self.child == child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_orders_by_seconds_then_nanos() {
        assert!(Stamp::new(1, 999) < Stamp::new(2, 0));
        assert!(Stamp::new(2, 1) > Stamp::new(2, 0));
        assert!((Stamp::new(3, 500_000_000).as_secs_f64() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn transform_serializes_with_frame_names() {
        let tf = FrameTransform::new(
            "world",
            "aruco",
            UnitQuaternion::identity(),
            Vector3::new(0.0, 0.0, -0.4),
            Stamp::new(10, 0),
        );
        let json = serde_json::to_string(&tf).expect("serialize");
        let back: FrameTransform = serde_json::from_str(&json).expect("deserialize");
        assert!(back.connects("world", "aruco"));
        assert_eq!(back, tf);
    }
}
