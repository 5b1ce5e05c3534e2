use image::GrayImage;
use opencv::{
    core::{Mat, Point2f, Vector},
    objdetect::{self, ArucoDetectorTraitConst, DetectorParametersTrait},
};

use super::{Corners, DetectorError, MarkerDetection, MarkerDetector};
use crate::{config::DetectorParams, dictionaries::DICT_3X3_32_CUSTOM};

/// The OpenCV dictionary with id `dictionary`, see [crate::dictionaries].
pub fn aruco_dictionary(dictionary: i32) -> opencv::Result<objdetect::Dictionary> {
    if dictionary == DICT_3X3_32_CUSTOM {
        objdetect::extend_dictionary_def(32, 3)
    } else {
        objdetect::get_predefined_dictionary_i32(dictionary)
    }
}

impl From<opencv::Error> for DetectorError {
    fn from(orig: opencv::Error) -> DetectorError {
        DetectorError::new(format!("opencv::Error: {}", orig))
    }
}

/// Detector using the ArUco module of OpenCV.
///
/// The OpenCV objects are built per call so that one instance can be used
/// from several threads.
pub struct ArucoDetector {
    dictionary: i32,
    params: DetectorParams,
}

impl ArucoDetector {
    pub fn new(dictionary: i32, params: DetectorParams) -> crate::Result<Self> {
        params.validate()?;
        if crate::dictionaries::dictionary_name(dictionary).is_none() {
            return Err(crate::Error::UnknownDictionary(dictionary));
        }
        Ok(Self { dictionary, params })
    }

    fn detector_parameters(&self) -> opencv::Result<objdetect::DetectorParameters> {
        let p = &self.params;
        let mut params = objdetect::DetectorParameters::default()?;
        params.set_adaptive_thresh_win_size_min(p.adaptive_thresh_win_size_min);
        params.set_adaptive_thresh_win_size_max(p.adaptive_thresh_win_size_max);
        params.set_adaptive_thresh_win_size_step(p.adaptive_thresh_win_size_step);
        params.set_adaptive_thresh_constant(p.adaptive_thresh_constant);
        params.set_min_marker_perimeter_rate(p.min_marker_perimeter_rate);
        params.set_max_marker_perimeter_rate(p.max_marker_perimeter_rate);
        params.set_polygonal_approx_accuracy_rate(p.polygonal_approx_accuracy_rate);
        params.set_min_corner_distance_rate(p.min_corner_distance_rate);
        params.set_min_marker_distance_rate(p.min_marker_distance_rate);
        params.set_min_distance_to_border(p.min_distance_to_border);
        params.set_marker_border_bits(p.marker_border_bits);
        params.set_min_otsu_std_dev(p.min_otsu_std_dev);
        params.set_perspective_remove_pixel_per_cell(p.perspective_remove_pixel_per_cell);
        params.set_perspective_remove_ignored_margin_per_cell(
            p.perspective_remove_ignored_margin_per_cell,
        );
        params.set_max_erroneous_bits_in_border_rate(p.max_erroneous_bits_in_border_rate);
        params.set_error_correction_rate(p.error_correction_rate);
        params.set_corner_refinement_method(p.corner_refinement_method);
        params.set_corner_refinement_win_size(p.corner_refinement_win_size);
        params.set_corner_refinement_max_iterations(p.corner_refinement_max_iterations);
        params.set_corner_refinement_min_accuracy(p.corner_refinement_min_accuracy);
        params.set_detect_inverted_marker(p.detect_inverted_marker);
        Ok(params)
    }
}

impl MarkerDetector for ArucoDetector {
    fn detect(&self, image: &GrayImage) -> Result<Vec<MarkerDetection>, DetectorError> {
        let (width, height) = image.dimensions();
        let rows: usize = height
            .try_into()
            .map_err(|_| DetectorError::new("image too tall"))?;
        let cols: usize = width
            .try_into()
            .map_err(|_| DetectorError::new("image too wide"))?;
        let mat = Mat::from_slice_rows_cols(image.as_raw(), rows, cols)?;

        let dictionary = aruco_dictionary(self.dictionary)?;
        let params = self.detector_parameters()?;
        let refine = objdetect::RefineParameters::new(10.0, 3.0, true)?;
        let detector = objdetect::ArucoDetector::new(&dictionary, &params, refine)?;

        let mut corners = Vector::<Vector<Point2f>>::new();
        let mut ids = Vector::<i32>::new();
        let mut rejected = Vector::<Vector<Point2f>>::new();
        detector.detect_markers(&mat, &mut corners, &mut ids, &mut rejected)?;

        let mut markers = Vec::with_capacity(ids.len());
        for (id, quad) in ids.iter().zip(corners.iter()) {
            if quad.len() != 4 {
                return Err(DetectorError::new(format!(
                    "marker {id} has {} corners",
                    quad.len()
                )));
            }
            let mut pts: Corners = [[0.0; 2]; 4];
            for (i, pt) in pts.iter_mut().enumerate() {
                let p = quad.get(i)?;
                *pt = [p.x, p.y];
            }
            markers.push(MarkerDetection { id, corners: pts });
        }
        Ok(markers)
    }
}
