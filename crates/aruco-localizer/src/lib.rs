//! Camera localization against a fixed fiducial marker map.
//!
//! Each camera frame goes through the same steps:
//! 1. the first usable calibration message configures the [`PoseTracker`]
//!    (once; later messages are ignored),
//! 2. detections from an external [`MarkerDetector`] are filtered down to
//!    markers that belong to the map,
//! 3. one camera pose is solved from every visible map marker,
//! 4. the pose is published as the frame chain `world -> aruco -> camera -> body`
//!    to a [`FrameSink`], optionally with an annotated image.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use aruco_localizer::{replay_session, FramePipeline, JsonLinesSink, LocalizerConfig, Session};
//! use aruco_localizer::map::MarkerMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let map = MarkerMap::load_json("map.json")?;
//! let session = Session::load_json("session.json")?;
//! let sink = Arc::new(JsonLinesSink::new(std::io::stdout()));
//! let pipeline = FramePipeline::new(
//!     map,
//!     LocalizerConfig::default(),
//!     Arc::new(session.detector()),
//!     sink,
//! )?;
//! let summary = replay_session(&pipeline, &session, ".");
//! println!("tracked {} of {} frames", summary.tracked, summary.frames);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `aruco_localizer::core`: intrinsics, poses, frame transforms, logger.
//! - `aruco_localizer::map`: marker maps, detections, in-map filtering.
//! - [`solver`]: the [`PoseSolver`] seam and the default [`PlanarPoseSolver`].
//! - [`FramePipeline`]: per-frame orchestration.

pub use aruco_localizer_core as core;
pub use aruco_localizer_map as map;

pub mod annotate;
mod composer;
mod config;
mod detector;
mod error;
mod pipeline;
mod replay;
mod sink;
pub mod solver;
mod tracker;

pub use composer::{
    vision_to_nav, ComposedFrame, FrameComposer, FrameNames, PoseEstimate, CAMERA_TO_BODY_RPY,
    DEFAULT_MAP_MOUNT_OFFSET, VISION_TO_NAV,
};
pub use config::{ConfigError, LocalizerConfig, DEFAULT_MARKER_SIZE};
pub use detector::MarkerDetector;
pub use error::LocalizerError;
pub use pipeline::{FrameInput, FrameOutcome, FramePipeline, TrackingStatus};
pub use replay::{
    replay_session, RecordedDetector, RecordedFrame, ReplaySummary, Session, SessionError,
};
pub use sink::{CapturingSink, FanoutSink, FrameSink, ImageDirSink, JsonLinesSink, NullSink};
pub use solver::{PlanarPoseSolver, PlanarSolverParams, PoseSolution, PoseSolver, SolveFailure};
pub use tracker::{InitOutcome, PoseOutcome, PoseTracker, TrackerParams, TrackerState};
