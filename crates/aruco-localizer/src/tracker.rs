//! One-shot tracker initialization and per-frame pose estimation.

use std::sync::{Arc, OnceLock};

use aruco_localizer_core::CameraIntrinsics;
use aruco_localizer_map::{InMapObservation, MarkerMap};
use serde::Serialize;

use crate::solver::{PoseSolution, PoseSolver, SolveFailure};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Everything a ready tracker needs. Frozen after initialization.
#[derive(Clone, Debug)]
pub struct TrackerParams {
    pub intrinsics: CameraIntrinsics,
    pub map: Arc<MarkerMap>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TrackerState {
    Uninitialized,
    Ready,
}

/// Result of [`PoseTracker::try_initialize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum InitOutcome {
    /// This call performed the transition to `Ready`.
    Initialized,
    /// Another call got there first; the new intrinsics were ignored.
    AlreadyReady,
    /// The map is still in pixel units.
    MapNotMetric,
    /// The intrinsics are unusable (non-finite, non-positive focal or size).
    InvalidIntrinsics,
}

/// Per-frame output of [`PoseTracker::estimate_pose`].
#[derive(Clone, Debug, PartialEq)]
pub enum PoseOutcome {
    NotReady,
    Failed(SolveFailure),
    Solved(PoseSolution),
}

/// Wraps a [`PoseSolver`] and holds the parameters it was configured with.
///
/// The transition `Uninitialized -> Ready` happens at most once, even under
/// concurrent calls; there is no way back.
pub struct PoseTracker {
    params: OnceLock<TrackerParams>,
    solver: Arc<dyn PoseSolver>,
}

impl PoseTracker {
    pub fn new(solver: Arc<dyn PoseSolver>) -> Self {
        Self {
            params: OnceLock::new(),
            solver,
        }
    }

    /// Configure the tracker from the first usable intrinsics.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn try_initialize(
        &self,
        intrinsics: CameraIntrinsics,
        map: &Arc<MarkerMap>,
    ) -> InitOutcome {
        if self.params.get().is_some() {
            return InitOutcome::AlreadyReady;
        }
        if !map.is_expressed_in_meters() {
            return InitOutcome::MapNotMetric;
        }
        if !intrinsics.is_valid() {
            return InitOutcome::InvalidIntrinsics;
        }

        let params = TrackerParams {
            intrinsics,
            map: Arc::clone(map),
        };
        match self.params.set(params) {
            Ok(()) => {
                let p = &intrinsics;
                log::info!(
                    "tracker ready: {}x{} fx={:.2} fy={:.2} cx={:.2} cy={:.2}, {} map markers",
                    p.image_size.width,
                    p.image_size.height,
                    p.fx(),
                    p.fy(),
                    p.cx(),
                    p.cy(),
                    map.len()
                );
                InitOutcome::Initialized
            }
            Err(_) => InitOutcome::AlreadyReady,
        }
    }

    pub fn state(&self) -> TrackerState {
        if self.params.get().is_some() {
            TrackerState::Ready
        } else {
            TrackerState::Uninitialized
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state() == TrackerState::Ready
    }

    pub fn params(&self) -> Option<&TrackerParams> {
        self.params.get()
    }

    /// Solve one camera pose from the in-map detections of a frame.
    pub fn estimate_pose(&self, observations: &[InMapObservation<'_>]) -> PoseOutcome {
        let Some(params) = self.params.get() else {
            return PoseOutcome::NotReady;
        };
        match self
            .solver
            .solve(&params.intrinsics, &params.map, observations)
        {
            Ok(solution) => PoseOutcome::Solved(solution),
            Err(failure) => PoseOutcome::Failed(failure),
        }
    }
}

impl std::fmt::Debug for PoseTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseTracker")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
