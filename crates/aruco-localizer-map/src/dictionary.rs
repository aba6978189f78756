//! Marker dictionary metadata.
//!
//! Decoding happens in the external detector; the map only needs to know
//! which family its ids come from and how many ids that family has.

use serde::{Deserialize, Serialize};

/// A named ArUco/AprilTag-style dictionary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    /// Canonical name, e.g. `ARUCO_MIP_36h12` or `DICT_4X4_50`.
    pub name: String,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// Number of distinct marker ids.
    pub len: usize,
}

const NAMED: &[(&str, usize, usize)] = &[
    ("ARUCO", 5, 1024),
    ("ARUCO_MIP_16h3", 4, 250),
    ("ARUCO_MIP_25h7", 5, 100),
    ("ARUCO_MIP_36h12", 6, 250),
    ("ARTAG", 6, 1024),
    ("ARTOOLKITPLUS", 6, 512),
    ("ARTOOLKITPLUSBCH", 6, 4096),
    ("TAG16h5", 4, 30),
    ("TAG25h9", 5, 35),
    ("TAG36h10", 6, 2320),
    ("TAG36h11", 6, 587),
];

impl Dictionary {
    /// Look up a dictionary by name.
    ///
    /// Accepts the named families above and the OpenCV `DICT_<N>X<N>_<LEN>`
    /// pattern (`N` in 4..=7, `LEN` in {50, 100, 250, 1000}). Names are
    /// matched case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if let Some(&(canonical, marker_size, len)) = NAMED
            .iter()
            .find(|(n, _, _)| n.eq_ignore_ascii_case(trimmed))
        {
            return Some(Self {
                name: canonical.to_string(),
                marker_size,
                len,
            });
        }
        parse_opencv_name(trimmed)
    }

    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    #[inline]
    pub fn contains_id(&self, id: i32) -> bool {
        usize::try_from(id).is_ok_and(|id| id < self.len)
    }
}

fn parse_opencv_name(name: &str) -> Option<Dictionary> {
    let upper = name.to_ascii_uppercase();
    let rest = upper.strip_prefix("DICT_")?;
    let (size, len) = rest.split_once('_')?;
    let (a, b) = size.split_once('X')?;
    let marker_size: usize = a.parse().ok()?;
    if a != b || !(4..=7).contains(&marker_size) {
        return None;
    }
    let len: usize = len.parse().ok()?;
    if ![50, 100, 250, 1000].contains(&len) {
        return None;
    }
    Some(Dictionary {
        name: upper,
        marker_size,
        len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_family_is_found_case_insensitively() {
        let dict = Dictionary::from_name("aruco_mip_36H12").expect("known");
        assert_eq!(dict.name, "ARUCO_MIP_36h12");
        assert_eq!(dict.bit_count(), 36);
        assert!(dict.contains_id(249));
        assert!(!dict.contains_id(250));
        assert!(!dict.contains_id(-1));
    }

    #[test]
    fn artoolkitplus_bch_variant_is_larger() {
        let plain = Dictionary::from_name("ARTOOLKITPLUS").expect("known");
        assert!(plain.contains_id(511));
        assert!(!plain.contains_id(512));
        let bch = Dictionary::from_name("ARTOOLKITPLUSBCH").expect("known");
        assert!(bch.contains_id(4095));
        assert!(!bch.contains_id(4096));
    }

    #[test]
    fn opencv_pattern_is_parsed() {
        let dict = Dictionary::from_name("DICT_5X5_100").expect("known");
        assert_eq!(dict.marker_size, 5);
        assert_eq!(dict.len, 100);
        assert!(Dictionary::from_name("DICT_5X4_100").is_none());
        assert!(Dictionary::from_name("DICT_4X4_64").is_none());
        assert!(Dictionary::from_name("NOT_A_DICT").is_none());
    }
}
