//! JSON description of a marker map.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{MapUnits, MarkerInfo, MarkerMap, MarkerMapError};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum MapIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Map(#[from] MarkerMapError),
}

/// On-disk marker map.
///
/// ```json
/// {
///   "dictionary": "ARUCO_MIP_36h12",
///   "units": "pixels",
///   "markers": [
///     { "id": 1, "corners": [[0,0,0], [100,0,0], [100,-100,0], [0,-100,0]] }
///   ]
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarkerMapConfig {
    pub dictionary: String,
    pub units: MapUnits,
    pub markers: Vec<MarkerInfo>,
}

impl MarkerMapConfig {
    /// Load a JSON description from disk (no validation).
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, MapIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this description to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), MapIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Build a validated map.
    pub fn build(self) -> Result<MarkerMap, MarkerMapError> {
        MarkerMap::new(&self.dictionary, self.units, self.markers)
    }
}

impl From<&MarkerMap> for MarkerMapConfig {
    fn from(map: &MarkerMap) -> Self {
        Self {
            dictionary: map.dictionary().name.clone(),
            units: map.units(),
            markers: map.markers().to_vec(),
        }
    }
}

impl MarkerMap {
    /// Load and validate a map from a JSON file.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, MapIoError> {
        let path = path.as_ref();
        let map = MarkerMapConfig::load_json(path)?.build()?;
        log::info!(
            "loaded marker map {} ({} markers, dictionary {}, {:?})",
            path.display(),
            map.len(),
            map.dictionary().name,
            map.units()
        );
        Ok(map)
    }
}
