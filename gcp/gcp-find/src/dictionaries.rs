//! Marker dictionaries known to the detector.
//!
//! Ids follow the OpenCV `PredefinedDictionaryType` numbering, plus one
//! custom dictionary.

/// Custom dictionary of 32 markers with 3x3 bits.
pub const DICT_3X3_32_CUSTOM: i32 = 99;

/// `DICT_4X4_100`
pub const DEFAULT_DICTIONARY: i32 = 1;

pub const DICTIONARIES: &[(i32, &str)] = &[
    (0, "DICT_4X4_50"),
    (1, "DICT_4X4_100"),
    (2, "DICT_4X4_250"),
    (3, "DICT_4X4_1000"),
    (4, "DICT_5X5_50"),
    (5, "DICT_5X5_100"),
    (6, "DICT_5X5_250"),
    (7, "DICT_5X5_1000"),
    (8, "DICT_6X6_50"),
    (9, "DICT_6X6_100"),
    (10, "DICT_6X6_250"),
    (11, "DICT_6X6_1000"),
    (12, "DICT_7X7_50"),
    (13, "DICT_7X7_100"),
    (14, "DICT_7X7_250"),
    (15, "DICT_7X7_1000"),
    (16, "DICT_ARUCO_ORIGINAL"),
    (17, "DICT_APRILTAG_16h5"),
    (18, "DICT_APRILTAG_25h9"),
    (19, "DICT_APRILTAG_36h10"),
    (20, "DICT_APRILTAG_36h11"),
    (21, "DICT_ARUCO_MIP_36h12"),
    (DICT_3X3_32_CUSTOM, "DICT_3X3_32 custom"),
];

pub fn dictionary_name(id: i32) -> Option<&'static str> {
    DICTIONARIES
        .iter()
        .find(|(dict_id, _)| *dict_id == id)
        .map(|(_, name)| *name)
}

/// Number of markers in dictionary `id`.
pub fn dictionary_size(id: i32) -> Option<u32> {
    let size = match id {
        0 | 4 | 8 | 12 => 50,
        1 | 5 | 9 | 13 => 100,
        2 | 6 | 10 | 14 | 21 => 250,
        3 | 7 | 11 | 15 => 1000,
        16 => 1024,
        17 => 30,
        18 => 35,
        19 => 2320,
        20 => 587,
        DICT_3X3_32_CUSTOM => 32,
        _ => return None,
    };
    Some(size)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup() {
        assert_eq!(dictionary_name(DEFAULT_DICTIONARY), Some("DICT_4X4_100"));
        assert_eq!(dictionary_name(99), Some("DICT_3X3_32 custom"));
        assert_eq!(dictionary_name(22), None);
    }

    #[test]
    fn every_dictionary_has_a_size() {
        for (id, _) in DICTIONARIES {
            assert!(dictionary_size(*id).is_some(), "{id}");
        }
        assert_eq!(dictionary_size(DEFAULT_DICTIONARY), Some(100));
        assert_eq!(dictionary_size(DICT_3X3_32_CUSTOM), Some(32));
        assert_eq!(dictionary_size(22), None);
    }

    #[test]
    fn ids_are_sorted_and_unique() {
        for pair in DICTIONARIES.windows(2) {
            assert!(pair[0].0 < pair[1].0);
        }
    }
}
