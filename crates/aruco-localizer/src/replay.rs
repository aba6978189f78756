//! Recorded sessions: camera info, optional image and detector output per frame.

use std::{
    fs,
    path::{Path, PathBuf},
};

use aruco_localizer_core::{CameraInfo, Stamp};
use aruco_localizer_map::MarkerDetection;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::detector::MarkerDetector;
use crate::pipeline::{FrameInput, FramePipeline};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub stamp: Stamp,
    pub camera_info: CameraInfo,
    /// Image file, relative to the session file's directory.
    #[serde(default)]
    pub image_path: Option<PathBuf>,
    #[serde(default)]
    pub detections: Vec<MarkerDetection>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub frames: Vec<RecordedFrame>,
}

impl Session {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Detector that replays this session's recorded detections.
    pub fn detector(&self) -> RecordedDetector {
        RecordedDetector {
            frames: self.frames.iter().map(|f| f.detections.clone()).collect(),
        }
    }
}

/// Returns the detections recorded for frame `seq`.
#[derive(Clone, Debug, Default)]
pub struct RecordedDetector {
    frames: Vec<Vec<MarkerDetection>>,
}

impl RecordedDetector {
    pub fn new(frames: Vec<Vec<MarkerDetection>>) -> Self {
        Self { frames }
    }
}

impl MarkerDetector for RecordedDetector {
    fn detect(&self, frame: &FrameInput) -> Vec<MarkerDetection> {
        usize::try_from(frame.seq)
            .ok()
            .and_then(|i| self.frames.get(i))
            .cloned()
            .unwrap_or_default()
    }
}

/// Counters for one replay run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub frames: usize,
    pub processed: usize,
    /// Frames dropped because their image could not be decoded.
    pub skipped: usize,
    pub tracked: usize,
}

/// Feed every recorded frame through `pipeline`.
///
/// A frame whose image cannot be read is logged and skipped before it reaches
/// the pipeline.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all, fields(frames = session.frames.len())))]
pub fn replay_session(
    pipeline: &FramePipeline,
    session: &Session,
    base_dir: impl AsRef<Path>,
) -> ReplaySummary {
    let base_dir = base_dir.as_ref();
    let mut summary = ReplaySummary {
        frames: session.frames.len(),
        ..ReplaySummary::default()
    };

    for (seq, rec) in session.frames.iter().enumerate() {
        let image = match &rec.image_path {
            Some(rel) => {
                let path = base_dir.join(rel);
                match image::open(&path) {
                    Ok(img) => Some(img.to_rgb8()),
                    Err(err) => {
                        log::error!("frame {seq}: cannot decode {}: {err}", path.display());
                        summary.skipped += 1;
                        continue;
                    }
                }
            }
            None => None,
        };

        let outcome = pipeline.process(FrameInput {
            seq: seq as u64,
            stamp: rec.stamp,
            camera_info: rec.camera_info.clone(),
            image,
        });
        summary.processed += 1;
        if outcome.is_tracked() {
            summary.tracked += 1;
        }
    }

    log::info!(
        "replayed {} frames: {} processed, {} skipped, {} tracked",
        summary.frames,
        summary.processed,
        summary.skipped,
        summary.tracked
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn info() -> CameraInfo {
        CameraInfo {
            width: 640,
            height: 480,
            k: [500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0],
            d: vec![0.0; 5],
            distortion_model: Some("plumb_bob".into()),
            frame_id: Some("camera".into()),
        }
    }

    #[test]
    fn session_file_round_trip() {
        let session = Session {
            frames: vec![RecordedFrame {
                stamp: Stamp::new(12, 5),
                camera_info: info(),
                image_path: Some(PathBuf::from("img/0.png")),
                detections: vec![MarkerDetection::new(3, [Point2::new(1.0, 2.0); 4])],
            }],
        };
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("session.json");
        session.write_json(&path).expect("write");
        assert_eq!(Session::load_json(&path).expect("load"), session);
    }

    #[test]
    fn minimal_frame_uses_defaults() {
        let json = r#"{ "frames": [ { "stamp": { "sec": 1, "nsec": 0 },
            "camera_info": { "width": 2, "height": 2, "k": [1,0,0,0,1,0,0,0,1] } } ] }"#;
        let session: Session = serde_json::from_str(json).expect("parse");
        assert!(session.frames[0].detections.is_empty());
        assert!(session.frames[0].image_path.is_none());
        assert!(session.frames[0].camera_info.d.is_empty());
    }

    #[test]
    fn recorded_detector_indexes_by_seq() {
        let det = RecordedDetector::new(vec![
            vec![MarkerDetection::new(1, [Point2::origin(); 4])],
            vec![],
        ]);
        let frame = |seq| FrameInput {
            seq,
            stamp: Stamp::default(),
            camera_info: info(),
            image: None,
        };
        assert_eq!(det.detect(&frame(0)).len(), 1);
        assert!(det.detect(&frame(1)).is_empty());
        assert!(det.detect(&frame(9)).is_empty());
    }
}
