//! Boundary to the marker detector.
//!
//! Decoding the marker bit patterns is left to a vision library. This module
//! defines what the rest of the crate expects from it ([MarkerDetector]) and
//! prepares the grayscale image it works on.

use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage};

use crate::config::RunConfig;

#[cfg(feature = "opencv")]
mod opencv;
#[cfg(feature = "opencv")]
pub use self::opencv::{ArucoDetector, aruco_dictionary};

/// Four corner points of a marker in pixel coordinates, in the order given
/// by the detector.
pub type Corners = [[f32; 2]; 4];

/// One marker found on one image.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDetection {
    pub id: i32,
    pub corners: Corners,
}

#[derive(thiserror::Error, Debug)]
#[error("{msg}")]
pub struct DetectorError {
    pub msg: String,
}

impl DetectorError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self { msg: msg.into() }
    }
}

/// Finds markers on a grayscale image.
///
/// Implementations are shared between worker threads when images are
/// processed in parallel.
pub trait MarkerDetector: Sync {
    /// Return all markers found on `image`, possibly none.
    fn detect(&self, image: &GrayImage) -> Result<Vec<MarkerDetection>, DetectorError>;
}

impl<T: MarkerDetector + ?Sized> MarkerDetector for &T {
    fn detect(&self, image: &GrayImage) -> Result<Vec<MarkerDetection>, DetectorError> {
        (**self).detect(image)
    }
}

impl<T: MarkerDetector + ?Sized + Send> MarkerDetector for Box<T> {
    fn detect(&self, image: &GrayImage) -> Result<Vec<MarkerDetection>, DetectorError> {
        (**self).detect(image)
    }
}

/// The detector of this build, configured from `cfg`.
#[cfg(feature = "opencv")]
pub fn default_detector(cfg: &RunConfig) -> crate::Result<Box<dyn MarkerDetector + Send>> {
    Ok(Box::new(ArucoDetector::new(cfg.dictionary, cfg.detector.clone())?))
}

/// The detector of this build, configured from `cfg`.
#[cfg(not(feature = "opencv"))]
pub fn default_detector(_cfg: &RunConfig) -> crate::Result<Box<dyn MarkerDetector + Send>> {
    Err(crate::Error::DetectorUnavailable)
}

const LUT_IN: [f64; 4] = [0.0, 158.0, 216.0, 255.0];
const LUT_OUT: [f64; 4] = [0.0, 22.0, 80.0, 176.0];

/// Piecewise linear intensity remapping which darkens mid tones. Helps when
/// the white parts of markers are overexposed.
#[derive(Debug, Clone)]
pub struct IntensityLut {
    table: [u8; 256],
}

impl IntensityLut {
    /// The built-in mapping through (0, 0), (158, 22), (216, 80) and
    /// (255, 176).
    pub fn contrast() -> Self {
        let mut table = [0u8; 256];
        for (i, out) in table.iter_mut().enumerate() {
            *out = interp(i as f64, &LUT_IN, &LUT_OUT) as u8;
        }
        Self { table }
    }

    pub fn map(&self, value: u8) -> u8 {
        self.table[value as usize]
    }

    /// Remap every channel of every pixel.
    pub fn apply(&self, image: &mut RgbImage) {
        for pixel in image.pixels_mut() {
            for channel in pixel.0.iter_mut() {
                *channel = self.map(*channel);
            }
        }
    }
}

/// Linear interpolation of `x` between the control points `(xs, ys)`, `xs`
/// ascending. Values outside are clamped to the end points.
fn interp(x: f64, xs: &[f64; 4], ys: &[f64; 4]) -> f64 {
    if x <= xs[0] {
        return ys[0];
    }
    for i in 1..xs.len() {
        if x <= xs[i] {
            let t = (x - xs[i - 1]) / (xs[i] - xs[i - 1]);
            return ys[i - 1] + t * (ys[i] - ys[i - 1]);
        }
    }
    ys[ys.len() - 1]
}

/// Read the image at `path` and convert it to grayscale, applying `lut` to
/// the color channels first if given.
pub fn load_gray<P: AsRef<Path>>(
    path: P,
    lut: Option<&IntensityLut>,
) -> Result<GrayImage, image::ImageError> {
    let img = image::open(path)?;
    Ok(to_gray(img, lut))
}

pub fn to_gray(img: DynamicImage, lut: Option<&IntensityLut>) -> GrayImage {
    match lut {
        Some(lut) => {
            let mut rgb = img.to_rgb8();
            lut.apply(&mut rgb);
            DynamicImage::ImageRgb8(rgb).to_luma8()
        }
        None => img.to_luma8(),
    }
}

/// Marker IDs occurring more than once in `markers`, ascending.
pub fn duplicate_ids(markers: &[MarkerDetection]) -> Vec<i32> {
    let mut counts = std::collections::BTreeMap::new();
    for m in markers {
        *counts.entry(m.id).or_insert(0usize) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, _)| id)
        .collect()
}
