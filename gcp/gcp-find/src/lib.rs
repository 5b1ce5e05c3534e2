//! Find ArUco ground control point (GCP) markers in aerial images and write
//! GCP lists for photogrammetry software.
//!
//! A run loads an optional coordinate table, detects markers on every image,
//! collects the detections and finally renders them in the layout of the
//! selected downstream program. See [GcpFinder].

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

pub mod aggregate;
mod cli;
pub mod config;
pub mod coords;
pub mod detect;
pub mod diagnostics;
pub mod dictionaries;
mod error;
pub mod format;

pub use crate::{
    aggregate::{Aggregation, DetectionRecord},
    cli::{Cli, DetectorArgs, expand_image_args, run_cli},
    config::{DetectorParams, ImageNaming, OutputTarget, RunConfig},
    coords::{AxisOrder, CoordinateTable, GcpCoords},
    detect::{MarkerDetection, MarkerDetector},
    diagnostics::{Diagnostic, Diagnostics},
    error::{Error, Result},
    format::{GcpFormatter, GcpList},
};

use crate::detect::IntensityLut;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub aggregation: Aggregation,
    pub gcps: GcpList,
    /// Diagnostics of the coordinate load, the images (in input order) and
    /// the formatting, in that order.
    pub diagnostics: Diagnostics,
}

/// Markers found on one image, or the reason there are none.
#[derive(Debug)]
struct ImageOutcome {
    label: String,
    markers: Vec<MarkerDetection>,
    diags: Diagnostics,
}

/// How `path` is named in the output.
pub fn image_label(path: &Path, naming: ImageNaming) -> String {
    match naming {
        ImageNaming::Basename => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        ImageNaming::AbsolutePath => std::path::absolute(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string(),
    }
}

/// One configured run of the GCP finder.
pub struct GcpFinder<D: MarkerDetector> {
    cfg: RunConfig,
    detector: D,
    coords: CoordinateTable,
    load_diags: Diagnostics,
    lut: Option<IntensityLut>,
}

impl<D: MarkerDetector> GcpFinder<D> {
    /// Validate `cfg` and load the coordinate table, if one is configured.
    pub fn new(cfg: RunConfig, detector: D) -> Result<Self> {
        cfg.validate()?;
        let mut load_diags = Diagnostics::new();
        let coords = match &cfg.coords_path {
            Some(path) => {
                CoordinateTable::load(path, &cfg.separator, cfg.axis_order, &mut load_diags)?
            }
            None => CoordinateTable::new(),
        };
        let lut = cfg.adjust_contrast.then(IntensityLut::contrast);
        Ok(Self {
            cfg,
            detector,
            coords,
            load_diags,
            lut,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    pub fn coordinates(&self) -> &CoordinateTable {
        &self.coords
    }

    /// Detect markers on one image. Problems with the image are reported in
    /// the outcome and never stop the run.
    fn process_image(&self, path: &Path) -> ImageOutcome {
        let label = image_label(path, self.cfg.image_naming);
        let mut diags = Diagnostics::new();
        if self.cfg.verbose {
            debug!("processing {label}");
        }

        let gray = match detect::load_gray(path, self.lut.as_ref()) {
            Ok(gray) => gray,
            Err(e) => {
                diags.report(Diagnostic::ImageReadFailure {
                    image: path.display().to_string(),
                    reason: e.to_string(),
                });
                return ImageOutcome {
                    label,
                    markers: Vec::new(),
                    diags,
                };
            }
        };

        let markers = match self.detector.detect(&gray) {
            Ok(markers) => markers,
            Err(e) => {
                diags.report(Diagnostic::DetectionFailure {
                    image: label.clone(),
                    reason: e.to_string(),
                });
                return ImageOutcome {
                    label,
                    markers: Vec::new(),
                    diags,
                };
            }
        };

        if markers.is_empty() {
            diags.report(Diagnostic::NoMarkersFound {
                image: label.clone(),
            });
        } else {
            if self.cfg.verbose {
                debug!("{} GCP markers found", markers.len());
            }
            let ids = detect::duplicate_ids(&markers);
            if !ids.is_empty() {
                diags.report(Diagnostic::DuplicateMarkerId {
                    image: label.clone(),
                    ids,
                });
            }
        }

        ImageOutcome {
            label,
            markers,
            diags,
        }
    }

    /// Detect markers on all `images`, collecting the results in input order
    /// regardless of the processing mode.
    fn detect_images(&self, images: &[PathBuf]) -> Vec<ImageOutcome> {
        if self.cfg.parallel {
            images
                .par_iter()
                .map(|path| self.process_image(path))
                .collect()
        } else {
            images.iter().map(|path| self.process_image(path)).collect()
        }
    }

    /// Render `agg` with the configured target and coordinate table.
    pub fn format(&self, agg: &Aggregation, diags: &mut Diagnostics) -> GcpList {
        GcpFormatter::new(&self.coords, &self.cfg).format(agg, diags)
    }

    /// Process `images` and build the GCP list.
    pub fn run(&self, images: &[PathBuf]) -> Result<RunReport> {
        if images.is_empty() {
            return Err(Error::NoImages);
        }
        info!("Searching markers on {} image(s).", images.len());

        let mut diagnostics = self.load_diags.clone();
        let mut aggregation = Aggregation::new();
        for mut outcome in self.detect_images(images) {
            aggregation.add_image(&outcome.label, &outcome.markers);
            diagnostics.append(&mut outcome.diags);
        }
        if self.cfg.verbose {
            aggregation.log_summary();
        }

        let gcps = self.format(&aggregation, &mut diagnostics);
        Ok(RunReport {
            aggregation,
            gcps,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels() {
        let path = Path::new("some/dir/DJI_0042.JPG");
        assert_eq!(image_label(path, ImageNaming::Basename), "DJI_0042.JPG");
        let full = image_label(path, ImageNaming::AbsolutePath);
        assert!(Path::new(&full).is_absolute());
        assert!(full.ends_with("DJI_0042.JPG"));
    }
}
