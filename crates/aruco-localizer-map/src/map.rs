//! Marker map model and unit conversion.

use std::collections::HashSet;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::Dictionary;

/// Unit system of the marker corner coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapUnits {
    /// Geometry was laid out in printed pixels; needs a real marker size.
    Pixels,
    Meters,
}

/// One marker of the map: its id and the 3D positions of its corners.
///
/// Corners follow the detector order (TL, TR, BR, BL as seen on the print).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerInfo {
    pub id: i32,
    pub corners: [Point3<f64>; 4],
}

impl MarkerInfo {
    /// Edge length, measured between the first two corners.
    #[inline]
    pub fn edge_length(&self) -> f64 {
        (self.corners[1] - self.corners[0]).norm()
    }
}

/// Map validation and conversion errors.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MarkerMapError {
    #[error("marker map has no markers")]
    Empty,
    #[error("unknown marker dictionary `{0}`")]
    UnknownDictionary(String),
    #[error("marker id {0} appears more than once")]
    DuplicateId(i32),
    #[error("marker id {id} is out of range for dictionary {dictionary}")]
    IdOutOfRange { id: i32, dictionary: String },
    #[error("marker {0} has non-finite corner coordinates")]
    NonFiniteCorner(i32),
    #[error("marker {0} has a zero-length edge")]
    DegenerateMarker(i32),
    #[error("map is already expressed in meters")]
    AlreadyMetric,
    #[error("marker size must be finite and > 0 (got {0})")]
    InvalidMarkerSize(f64),
}

/// Immutable fiducial layout.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerMap {
    dictionary: Dictionary,
    units: MapUnits,
    markers: Vec<MarkerInfo>,
}

impl MarkerMap {
    /// Validate and create a map.
    pub fn new(
        dictionary: &str,
        units: MapUnits,
        markers: Vec<MarkerInfo>,
    ) -> Result<Self, MarkerMapError> {
        let dictionary = Dictionary::from_name(dictionary)
            .ok_or_else(|| MarkerMapError::UnknownDictionary(dictionary.to_string()))?;
        if markers.is_empty() {
            return Err(MarkerMapError::Empty);
        }

        let mut seen = HashSet::with_capacity(markers.len());
        for m in &markers {
            if !seen.insert(m.id) {
                return Err(MarkerMapError::DuplicateId(m.id));
            }
            if !dictionary.contains_id(m.id) {
                return Err(MarkerMapError::IdOutOfRange {
                    id: m.id,
                    dictionary: dictionary.name.clone(),
                });
            }
            if !m.corners.iter().all(|c| c.iter().all(|v| v.is_finite())) {
                return Err(MarkerMapError::NonFiniteCorner(m.id));
            }
            if m.edge_length() <= f64::EPSILON {
                return Err(MarkerMapError::DegenerateMarker(m.id));
            }
        }

        Ok(Self {
            dictionary,
            units,
            markers,
        })
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    #[inline]
    pub fn units(&self) -> MapUnits {
        self.units
    }

    #[inline]
    pub fn is_expressed_in_meters(&self) -> bool {
        self.units == MapUnits::Meters
    }

    #[inline]
    pub fn is_expressed_in_pixels(&self) -> bool {
        self.units == MapUnits::Pixels
    }

    #[inline]
    pub fn markers(&self) -> &[MarkerInfo] {
        &self.markers
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.markers.iter().map(|m| m.id)
    }

    pub fn marker(&self, id: i32) -> Option<&MarkerInfo> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.marker(id).is_some()
    }

    /// Corner positions of marker `id`, in detector corner order.
    pub fn object_points(&self, id: i32) -> Option<&[Point3<f64>; 4]> {
        self.marker(id).map(|m| &m.corners)
    }

    /// Edge length of the first marker, in map units.
    pub fn marker_size(&self) -> f64 {
        self.markers[0].edge_length()
    }

    /// True when every corner lies within `tol` (relative to the map extent)
    /// of the plane through the first marker.
    pub fn is_planar(&self, tol: f64) -> bool {
        let c = &self.markers[0].corners;
        let normal = (c[1] - c[0]).cross(&(c[3] - c[0]));
        let Some(normal) = normal.try_normalize(f64::EPSILON) else {
            return false;
        };
        let extent = self.extent().max(f64::EPSILON);
        self.markers
            .iter()
            .flat_map(|m| m.corners.iter())
            .all(|p| (p - c[0]).dot(&normal).abs() <= tol * extent)
    }

    fn extent(&self) -> f64 {
        let origin = self.markers[0].corners[0];
        self.markers
            .iter()
            .flat_map(|m| m.corners.iter())
            .map(|p| (p - origin).norm())
            .fold(0.0, f64::max)
    }

    /// Convert a pixel-unit map to meters.
    ///
    /// The first marker's edge is the calibration anchor: every coordinate is
    /// scaled by `marker_size / markers[0].edge_length()`. Consumes the map so
    /// the pixel version cannot be converted twice.
    pub fn into_meters(self, marker_size: f64) -> Result<Self, MarkerMapError> {
        if self.is_expressed_in_meters() {
            return Err(MarkerMapError::AlreadyMetric);
        }
        if !marker_size.is_finite() || marker_size <= 0.0 {
            return Err(MarkerMapError::InvalidMarkerSize(marker_size));
        }

        let scale = marker_size / self.marker_size();
        let markers = self
            .markers
            .into_iter()
            .map(|m| MarkerInfo {
                id: m.id,
                corners: m.corners.map(|c| Point3::from(c.coords * scale)),
            })
            .collect();

        Ok(Self {
            dictionary: self.dictionary,
            units: MapUnits::Meters,
            markers,
        })
    }

    /// Return a metric map, converting only when the map is in pixels.
    pub fn ensure_meters(self, marker_size: f64) -> Result<Self, MarkerMapError> {
        if self.is_expressed_in_pixels() {
            log::info!(
                "converting marker map from pixels to meters (marker size {marker_size} m)"
            );
            self.into_meters(marker_size)
        } else {
            Ok(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(id: i32, x0: f64, y0: f64, side: f64) -> MarkerInfo {
        MarkerInfo {
            id,
            corners: [
                Point3::new(x0, y0, 0.0),
                Point3::new(x0 + side, y0, 0.0),
                Point3::new(x0 + side, y0 - side, 0.0),
                Point3::new(x0, y0 - side, 0.0),
            ],
        }
    }

    fn pixel_map() -> MarkerMap {
        MarkerMap::new(
            "ARUCO_MIP_36h12",
            MapUnits::Pixels,
            vec![square(1, 0.0, 0.0, 100.0), square(2, 200.0, 0.0, 100.0)],
        )
        .expect("valid map")
    }

    #[test]
    fn converts_pixels_to_meters_using_first_marker() {
        let map = pixel_map().into_meters(0.05).expect("convert");
        assert!(map.is_expressed_in_meters());
        assert_relative_eq!(map.marker_size(), 0.05, epsilon = 1e-12);
        let m2 = map.marker(2).expect("marker 2");
        assert_relative_eq!(m2.corners[0].x, 0.1, epsilon = 1e-12);
        assert_relative_eq!(m2.edge_length(), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn metric_map_is_never_rescaled() {
        let map = pixel_map().into_meters(0.05).expect("convert");
        assert_eq!(
            map.clone().into_meters(0.1).unwrap_err(),
            MarkerMapError::AlreadyMetric
        );
        let same = map.clone().ensure_meters(0.1).expect("no-op");
        assert_eq!(same, map);
    }

    #[test]
    fn rejects_bad_marker_size() {
        for size in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                pixel_map().into_meters(size),
                Err(MarkerMapError::InvalidMarkerSize(_))
            ));
        }
    }

    #[test]
    fn validation_catches_malformed_layouts() {
        assert_eq!(
            MarkerMap::new("ARUCO", MapUnits::Meters, vec![]).unwrap_err(),
            MarkerMapError::Empty
        );
        assert_eq!(
            MarkerMap::new(
                "ARUCO",
                MapUnits::Meters,
                vec![square(3, 0.0, 0.0, 1.0), square(3, 2.0, 0.0, 1.0)]
            )
            .unwrap_err(),
            MarkerMapError::DuplicateId(3)
        );
        assert_eq!(
            MarkerMap::new("ARUCO", MapUnits::Meters, vec![square(4, 0.0, 0.0, 0.0)]).unwrap_err(),
            MarkerMapError::DegenerateMarker(4)
        );
        assert!(matches!(
            MarkerMap::new("TAG16h5", MapUnits::Meters, vec![square(40, 0.0, 0.0, 1.0)]),
            Err(MarkerMapError::IdOutOfRange { id: 40, .. })
        ));
        assert!(matches!(
            MarkerMap::new("BOGUS", MapUnits::Meters, vec![square(1, 0.0, 0.0, 1.0)]),
            Err(MarkerMapError::UnknownDictionary(_))
        ));
    }

    #[test]
    fn object_points_follow_corner_order() {
        let map = pixel_map();
        let pts = map.object_points(2).expect("marker 2");
        assert_eq!(pts[0], Point3::new(200.0, 0.0, 0.0));
        assert_eq!(pts[2], Point3::new(300.0, -100.0, 0.0));
        assert!(map.object_points(7).is_none());

        let metric = map.into_meters(0.05).expect("convert");
        let pts = metric.object_points(2).expect("marker 2");
        assert_relative_eq!(pts[1].x, 0.15, epsilon = 1e-12);
    }

    #[test]
    fn planarity_check() {
        let map = pixel_map();
        assert!(map.is_planar(1e-9));

        let mut lifted = square(5, 0.0, 300.0, 100.0);
        for c in &mut lifted.corners {
            c.z = 50.0;
        }
        let map = MarkerMap::new(
            "ARUCO",
            MapUnits::Pixels,
            vec![square(1, 0.0, 0.0, 100.0), lifted],
        )
        .expect("valid");
        assert!(!map.is_planar(1e-3));
    }
}
