//! Fiducial marker maps.
//!
//! This crate focuses on:
//! - the immutable marker layout ([`MarkerMap`]) and its pixel-to-meter
//!   conversion,
//! - loading map descriptions from JSON,
//! - selecting the per-frame detections that belong to the map.
//!
//! It does **not** detect or decode markers. Detections come from an
//! external detector as [`MarkerDetection`] values.

mod detection;
mod dictionary;
mod filter;
mod io;
mod map;

pub use detection::MarkerDetection;
pub use dictionary::Dictionary;
pub use filter::{in_map_indices, select_in_map, InMapObservation};
pub use io::{MapIoError, MarkerMapConfig};
pub use map::{MapUnits, MarkerInfo, MarkerMap, MarkerMapError};
