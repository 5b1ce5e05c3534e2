use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    coords::AxisOrder,
    dictionaries::{DEFAULT_DICTIONARY, dictionary_name},
    error::{Error, Result},
};

/// The default value for [RunConfig::limit].
pub const DEFAULT_LIMIT: usize = 999;

/// The default value for [RunConfig::separator].
pub const DEFAULT_SEPARATOR: &str = " ";

/// The program which will read the GCP list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum OutputTarget {
    /// OpenDroneMap: `east north elev x y image id`
    #[value(name = "ODM")]
    #[serde(rename = "ODM")]
    Odm,
    /// VisualSfM: `image x y east north elev id`
    #[value(name = "VisualSfM")]
    #[serde(rename = "VisualSfM")]
    VisualSfm,
    /// Meshroom: `x y image id size`
    #[value(name = "Meshroom")]
    #[serde(rename = "Meshroom")]
    Meshroom,
}

/// How images are named in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageNaming {
    #[default]
    Basename,
    AbsolutePath,
}

/// Tuning parameters of the ArUco marker detector.
///
/// Field names and defaults follow the OpenCV `DetectorParameters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DetectorParams {
    pub adaptive_thresh_win_size_min: i32,
    pub adaptive_thresh_win_size_max: i32,
    pub adaptive_thresh_win_size_step: i32,
    pub adaptive_thresh_constant: f64,
    pub min_marker_perimeter_rate: f64,
    pub max_marker_perimeter_rate: f64,
    pub polygonal_approx_accuracy_rate: f64,
    pub min_corner_distance_rate: f64,
    pub min_marker_distance_rate: f64,
    pub min_distance_to_border: i32,
    pub marker_border_bits: i32,
    pub min_otsu_std_dev: f64,
    pub perspective_remove_pixel_per_cell: i32,
    pub perspective_remove_ignored_margin_per_cell: f64,
    pub max_erroneous_bits_in_border_rate: f64,
    pub error_correction_rate: f64,
    /// 0: none, 1: subpixel, 2: contour, 3: AprilTag
    pub corner_refinement_method: i32,
    pub corner_refinement_win_size: i32,
    pub corner_refinement_max_iterations: i32,
    pub corner_refinement_min_accuracy: f64,
    pub detect_inverted_marker: bool,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            adaptive_thresh_win_size_min: 3,
            adaptive_thresh_win_size_max: 23,
            adaptive_thresh_win_size_step: 10,
            adaptive_thresh_constant: 7.0,
            min_marker_perimeter_rate: 0.03,
            max_marker_perimeter_rate: 4.0,
            polygonal_approx_accuracy_rate: 0.03,
            min_corner_distance_rate: 0.05,
            min_marker_distance_rate: 0.125,
            min_distance_to_border: 3,
            marker_border_bits: 1,
            min_otsu_std_dev: 5.0,
            perspective_remove_pixel_per_cell: 4,
            perspective_remove_ignored_margin_per_cell: 0.13,
            max_erroneous_bits_in_border_rate: 0.35,
            error_correction_rate: 0.6,
            corner_refinement_method: 0,
            corner_refinement_win_size: 5,
            corner_refinement_max_iterations: 30,
            corner_refinement_min_accuracy: 0.1,
            detect_inverted_marker: false,
        }
    }
}

impl DetectorParams {
    /// Load parameters from a YAML or JSON file (chosen by extension).
    ///
    /// Keys missing from the file take their default value, unknown keys are
    /// an error.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let buf = std::fs::read_to_string(path).map_err(|source| Error::ParamFileIo {
            path: path.into(),
            source,
        })?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let params: DetectorParams = if is_json {
            serde_json::from_str(&buf).map_err(|source| Error::ParamFileJson {
                path: path.into(),
                source,
            })?
        } else {
            serde_yaml::from_str(&buf).map_err(|source| Error::ParamFileYaml {
                path: path.into(),
                source,
            })?
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidParams(msg));
        if self.adaptive_thresh_win_size_min < 3 {
            return invalid(format!(
                "adaptive_thresh_win_size_min must be at least 3, got {}",
                self.adaptive_thresh_win_size_min
            ));
        }
        if self.adaptive_thresh_win_size_max < self.adaptive_thresh_win_size_min {
            return invalid(format!(
                "adaptive_thresh_win_size_max ({}) is smaller than adaptive_thresh_win_size_min ({})",
                self.adaptive_thresh_win_size_max, self.adaptive_thresh_win_size_min
            ));
        }
        if self.adaptive_thresh_win_size_step <= 0 {
            return invalid(format!(
                "adaptive_thresh_win_size_step must be positive, got {}",
                self.adaptive_thresh_win_size_step
            ));
        }
        if self.min_marker_perimeter_rate <= 0.0
            || self.max_marker_perimeter_rate < self.min_marker_perimeter_rate
        {
            return invalid(format!(
                "marker perimeter rate range [{}, {}] is empty",
                self.min_marker_perimeter_rate, self.max_marker_perimeter_rate
            ));
        }
        if !(0..=3).contains(&self.corner_refinement_method) {
            return invalid(format!(
                "corner_refinement_method must be 0, 1, 2 or 3, got {}",
                self.corner_refinement_method
            ));
        }
        if self.marker_border_bits < 1 {
            return invalid(format!(
                "marker_border_bits must be at least 1, got {}",
                self.marker_border_bits
            ));
        }
        Ok(())
    }

    /// `(name, value)` pairs in alphabetical order, for listing.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map
                .into_iter()
                .map(|(k, v)| (k, v.to_string()))
                .collect(),
            _ => Vec::new(),
        };
        entries.sort();
        entries
    }
}

/// Everything one run of the GCP finder needs to know.
///
/// Built once, before any image is read, and only borrowed afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Marker dictionary id, see [crate::dictionaries].
    pub dictionary: i32,
    pub detector: DetectorParams,
    /// File with GCP world coordinates. Without it, only the default output
    /// layout produces lines.
    pub coords_path: Option<PathBuf>,
    pub separator: String,
    pub axis_order: AxisOrder,
    /// `None` selects the default layout.
    pub target: Option<OutputTarget>,
    /// Written as a header line for [OutputTarget::Odm].
    pub epsg: Option<u32>,
    /// Maximum number of detections of one marker ID before all of its
    /// detections are dropped.
    pub limit: usize,
    pub image_naming: ImageNaming,
    /// Apply the built-in intensity lookup table before detection.
    pub adjust_contrast: bool,
    /// Detect markers on several images at once.
    pub parallel: bool,
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dictionary: DEFAULT_DICTIONARY,
            detector: DetectorParams::default(),
            coords_path: None,
            separator: DEFAULT_SEPARATOR.to_string(),
            axis_order: AxisOrder::default(),
            target: None,
            epsg: None,
            limit: DEFAULT_LIMIT,
            image_naming: ImageNaming::default(),
            adjust_contrast: false,
            parallel: false,
            verbose: false,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if dictionary_name(self.dictionary).is_none() {
            return Err(Error::UnknownDictionary(self.dictionary));
        }
        if self.separator.is_empty() {
            return Err(Error::InvalidParams("separator must not be empty".into()));
        }
        self.detector.validate()
    }
}
