//! Per-frame orchestration: intrinsics, detection, filtering, pose, frames.

use std::sync::Arc;

use aruco_localizer_core::{CameraInfo, CameraIntrinsics, FrameTransform, Stamp};
use aruco_localizer_map::{select_in_map, MarkerMap};
use image::RgbImage;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::annotate::{draw_axes, draw_markers};
use crate::composer::{FrameComposer, PoseEstimate};
use crate::config::LocalizerConfig;
use crate::detector::MarkerDetector;
use crate::error::LocalizerError;
use crate::sink::FrameSink;
use crate::solver::{PlanarPoseSolver, PoseSolution, PoseSolver, SolveFailure};
use crate::tracker::{InitOutcome, PoseOutcome, PoseTracker, TrackerState};

/// One camera frame as delivered by the transport.
#[derive(Clone, Debug)]
pub struct FrameInput {
    pub seq: u64,
    pub stamp: Stamp,
    pub camera_info: CameraInfo,
    /// Decoded frame. Republished through [`FrameSink::send_image`], annotated
    /// first when `annotate` is set.
    pub image: Option<RgbImage>,
}

/// How far a frame got.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TrackingStatus {
    /// No usable intrinsics have been seen yet.
    NotReady,
    /// No detection in this frame belongs to the map.
    NoMapMarkers,
    SolveFailed(SolveFailure),
    Tracked,
}

/// Everything produced for one frame.
#[derive(Clone, Debug)]
pub struct FrameOutcome {
    pub seq: u64,
    pub stamp: Stamp,
    /// Indices into the detector output of the markers that belong to the map.
    pub in_map: Vec<usize>,
    pub num_detections: usize,
    pub solution: Option<PoseSolution>,
    pub transforms: Vec<FrameTransform>,
    pub estimate: Option<PoseEstimate>,
    pub annotated: Option<RgbImage>,
    pub status: TrackingStatus,
}

impl FrameOutcome {
    #[inline]
    pub fn is_tracked(&self) -> bool {
        self.status == TrackingStatus::Tracked
    }
}

/// Owns the map, tracker and composer, and drives them frame by frame.
///
/// `process` takes `&self`; the pipeline can be shared across threads.
pub struct FramePipeline {
    map: Arc<MarkerMap>,
    config: LocalizerConfig,
    tracker: PoseTracker,
    detector: Arc<dyn MarkerDetector>,
    composer: FrameComposer,
    sink: Arc<dyn FrameSink>,
}

impl FramePipeline {
    /// Build a pipeline with the default [`PlanarPoseSolver`].
    pub fn new(
        map: MarkerMap,
        config: LocalizerConfig,
        detector: Arc<dyn MarkerDetector>,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Self, LocalizerError> {
        let solver = Arc::new(PlanarPoseSolver::new(config.solver.clone()));
        Self::with_solver(map, config, detector, solver, sink)
    }

    /// Build a pipeline around a custom solver.
    ///
    /// A pixel-unit map is converted to meters here, once, using
    /// `config.marker_size`.
    pub fn with_solver(
        map: MarkerMap,
        config: LocalizerConfig,
        detector: Arc<dyn MarkerDetector>,
        solver: Arc<dyn PoseSolver>,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Self, LocalizerError> {
        config.validate()?;
        let map = Arc::new(map.ensure_meters(config.marker_size)?);
        if !map.is_planar(config.solver.planarity_tolerance) {
            log::info!(
                "marker map spans several planes ({} markers); frames seeing more than one plane use DLT",
                map.len()
            );
        }
        let composer = FrameComposer::new(
            config.frames.clone(),
            config.map_mount_offset,
            Arc::clone(&sink),
        );
        Ok(Self {
            map,
            config,
            tracker: PoseTracker::new(solver),
            detector,
            composer,
            sink,
        })
    }

    #[inline]
    pub fn map(&self) -> &MarkerMap {
        &self.map
    }

    #[inline]
    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    #[inline]
    pub fn tracker(&self) -> &PoseTracker {
        &self.tracker
    }

    #[inline]
    pub fn composer(&self) -> &FrameComposer {
        &self.composer
    }

    pub fn tracker_state(&self) -> TrackerState {
        self.tracker.state()
    }

    /// Run one frame through the pipeline. Never fails; problems are logged
    /// and reported through [`FrameOutcome::status`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(seq = frame.seq))
    )]
    pub fn process(&self, frame: FrameInput) -> FrameOutcome {
        if !self.tracker.is_ready() {
            self.initialize_from(&frame);
        }

        let detections = self.detector.detect(&frame);
        let observations = select_in_map(&self.map, &detections);
        let in_map: Vec<usize> = observations.iter().map(|o| o.index).collect();

        let (status, solution) = match self.tracker.estimate_pose(&observations) {
            PoseOutcome::NotReady => (TrackingStatus::NotReady, None),
            PoseOutcome::Failed(SolveFailure::NoMarkers) => (TrackingStatus::NoMapMarkers, None),
            PoseOutcome::Failed(failure) => {
                log::debug!("frame {}: no pose ({failure})", frame.seq);
                (TrackingStatus::SolveFailed(failure), None)
            }
            PoseOutcome::Solved(solution) => {
                log::debug!(
                    "frame {}: pose from {} markers, rms {:.3} px",
                    frame.seq,
                    observations.len(),
                    solution.reprojection_rms
                );
                (TrackingStatus::Tracked, Some(solution))
            }
        };

        let composed = self
            .composer
            .compose(solution.as_ref().map(|s| &s.pose), frame.stamp);

        let annotated = match frame.image {
            Some(mut image) if self.config.annotate => {
                draw_markers(&mut image, &observations);
                if let (Some(sol), Some(params)) = (&solution, self.tracker.params()) {
                    let length = self.map.marker_size() * 2.0;
                    draw_axes(&mut image, &params.intrinsics, &sol.pose, length);
                }
                self.sink.send_image(frame.seq, frame.stamp, &image);
                Some(image)
            }
            Some(image) => {
                self.sink.send_image(frame.seq, frame.stamp, &image);
                None
            }
            None => None,
        };

        FrameOutcome {
            seq: frame.seq,
            stamp: frame.stamp,
            in_map,
            num_detections: detections.len(),
            solution,
            transforms: composed.transforms,
            estimate: composed.estimate,
            annotated,
            status,
        }
    }

    fn initialize_from(&self, frame: &FrameInput) {
        let normalized = CameraIntrinsics::from_camera_info(&frame.camera_info);
        for warning in &normalized.warnings {
            log::warn!("frame {}: {warning}", frame.seq);
        }
        match self.tracker.try_initialize(normalized.intrinsics, &self.map) {
            InitOutcome::Initialized => {
                log::info!("frame {}: tracker initialized", frame.seq);
            }
            InitOutcome::AlreadyReady => {}
            InitOutcome::InvalidIntrinsics => {
                log::warn!(
                    "frame {}: camera intrinsics unusable, tracker stays uninitialized",
                    frame.seq
                );
            }
            InitOutcome::MapNotMetric => {
                log::error!("frame {}: marker map is not metric", frame.seq);
            }
        }
    }
}

impl std::fmt::Debug for FramePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("markers", &self.map.len())
            .field("tracker", &self.tracker)
            .field("composer", &self.composer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use aruco_localizer_map::{MapUnits, MarkerDetection, MarkerInfo};
    use nalgebra::Point3;

    struct Nothing;

    impl MarkerDetector for Nothing {
        fn detect(&self, _frame: &FrameInput) -> Vec<MarkerDetection> {
            Vec::new()
        }
    }

    fn pixel_map() -> MarkerMap {
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(200.0, 0.0, 0.0),
            Point3::new(200.0, -200.0, 0.0),
            Point3::new(0.0, -200.0, 0.0),
        ];
        MarkerMap::new("ARUCO", MapUnits::Pixels, vec![MarkerInfo { id: 5, corners }])
            .expect("map")
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn pipeline_is_shareable() {
        assert_send_sync::<FramePipeline>();
    }

    #[test]
    fn pixel_map_is_scaled_once_at_construction() {
        let p = FramePipeline::new(
            pixel_map(),
            LocalizerConfig::default(),
            Arc::new(Nothing),
            Arc::new(NullSink),
        )
        .expect("pipeline");
        assert!(p.map().is_expressed_in_meters());
        assert!((p.map().marker_size() - 0.0298).abs() < 1e-12);
        assert_eq!(p.tracker_state(), TrackerState::Uninitialized);
    }

    #[test]
    fn invalid_marker_size_is_rejected() {
        let config = LocalizerConfig {
            marker_size: 0.0,
            ..LocalizerConfig::default()
        };
        let err = FramePipeline::new(pixel_map(), config, Arc::new(Nothing), Arc::new(NullSink))
            .unwrap_err();
        assert!(matches!(err, LocalizerError::Config(_)));
    }
}
