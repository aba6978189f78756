//! Association of per-frame detections with the known map.

use crate::{MarkerDetection, MarkerInfo, MarkerMap};

/// A detection whose id belongs to the map, paired with the map marker.
#[derive(Clone, Copy, Debug)]
pub struct InMapObservation<'a> {
    /// Index into the detector's output for this frame.
    pub index: usize,
    pub detection: &'a MarkerDetection,
    pub marker: &'a MarkerInfo,
}

/// Indices of detections whose id is in the map, in detector order.
///
/// An empty result is a normal outcome.
pub fn in_map_indices(map: &MarkerMap, detections: &[MarkerDetection]) -> Vec<usize> {
    detections
        .iter()
        .enumerate()
        .filter(|(_, d)| map.contains(d.id))
        .map(|(i, _)| i)
        .collect()
}

/// Detections that belong to the map, each paired with its map marker.
pub fn select_in_map<'a>(
    map: &'a MarkerMap,
    detections: &'a [MarkerDetection],
) -> Vec<InMapObservation<'a>> {
    detections
        .iter()
        .enumerate()
        .filter_map(|(index, detection)| {
            map.marker(detection.id).map(|marker| InMapObservation {
                index,
                detection,
                marker,
            })
        })
        .collect()
}
