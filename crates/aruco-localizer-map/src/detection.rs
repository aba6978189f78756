use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One marker reported by the external detector for a single frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: i32,
    /// Image corners in pixels, in the same order as the map corners.
    pub corners: [Point2<f32>; 4],
    /// Bit errors corrected while decoding, when the detector reports them.
    #[serde(default)]
    pub hamming: Option<u8>,
}

impl MarkerDetection {
    pub fn new(id: i32, corners: [Point2<f32>; 4]) -> Self {
        Self {
            id,
            corners,
            hamming: None,
        }
    }
}
