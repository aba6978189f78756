//! Seam to the external marker detector.

use aruco_localizer_map::MarkerDetection;

use crate::pipeline::FrameInput;

/// Finds markers in a frame.
///
/// Decoding, thresholding and corner refinement are the implementation's
/// business; the pipeline only consumes ids and corner pixels.
pub trait MarkerDetector: Send + Sync {
    fn detect(&self, frame: &FrameInput) -> Vec<MarkerDetection>;
}
