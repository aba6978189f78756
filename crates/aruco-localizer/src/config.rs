//! JSON configuration for the localizer.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::composer::{FrameNames, DEFAULT_MAP_MOUNT_OFFSET};
use crate::solver::PlanarSolverParams;

/// Printed edge length of the map's first marker, in meters.
pub const DEFAULT_MARKER_SIZE: f64 = 0.0298;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("marker size must be finite and > 0 (got {0})")]
    InvalidMarkerSize(f64),
}

fn default_marker_size() -> f64 {
    DEFAULT_MARKER_SIZE
}

fn default_map_mount_offset() -> f64 {
    DEFAULT_MAP_MOUNT_OFFSET
}

/// Localizer settings. Every field has a default, so `{}` is a valid file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalizerConfig {
    /// Used to scale a pixel-unit map to meters.
    #[serde(default = "default_marker_size")]
    pub marker_size: f64,
    /// Produce annotated frames.
    #[serde(default)]
    pub annotate: bool,
    #[serde(default)]
    pub frames: FrameNames,
    /// Vertical offset of the map frame below the world frame, in meters.
    #[serde(default = "default_map_mount_offset")]
    pub map_mount_offset: f64,
    #[serde(default)]
    pub solver: PlanarSolverParams,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            marker_size: DEFAULT_MARKER_SIZE,
            annotate: false,
            frames: FrameNames::default(),
            map_mount_offset: DEFAULT_MAP_MOUNT_OFFSET,
            solver: PlanarSolverParams::default(),
        }
    }
}

impl LocalizerConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.marker_size.is_finite() || self.marker_size <= 0.0 {
            return Err(ConfigError::InvalidMarkerSize(self.marker_size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg: LocalizerConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(cfg, LocalizerConfig::default());
        assert_eq!(cfg.marker_size, 0.0298);
        assert_eq!(cfg.map_mount_offset, -0.4064);
        assert_eq!(cfg.frames.map, "aruco");
        assert_eq!(cfg.solver.min_points, 4);
        assert!(!cfg.annotate);
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let cfg: LocalizerConfig = serde_json::from_str(
            r#"{ "annotate": true, "frames": { "body": "base_link" }, "solver": { "undistort_iterations": 3 } }"#,
        )
        .expect("parse");
        assert!(cfg.annotate);
        assert_eq!(cfg.frames.body, "base_link");
        assert_eq!(cfg.frames.world, "world");
        assert_eq!(cfg.solver.undistort_iterations, 3);
        assert_eq!(cfg.solver.min_points, 4);
    }

    #[test]
    fn file_round_trip_and_validation() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("localizer.json");
        let cfg = LocalizerConfig {
            marker_size: 0.05,
            ..LocalizerConfig::default()
        };
        cfg.write_json(&path).expect("write");
        assert_eq!(LocalizerConfig::load_json(&path).expect("load"), cfg);

        fs::write(&path, r#"{ "marker_size": -1.0 }"#).expect("write");
        assert!(matches!(
            LocalizerConfig::load_json(&path),
            Err(ConfigError::InvalidMarkerSize(_))
        ));
    }
}
