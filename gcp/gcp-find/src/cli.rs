use std::path::PathBuf;

use camino::Utf8PathBuf;
use clap::Parser;
use eyre::{self as anyhow, Context, Result};
use tracing::{info, warn};

use crate::{
    GcpFinder,
    config::{DEFAULT_LIMIT, DetectorParams, ImageNaming, OutputTarget, RunConfig},
    coords::AxisOrder,
    detect,
    dictionaries::{DEFAULT_DICTIONARY, DICTIONARIES},
};

/// Find ArUco GCP markers in images and write a GCP list.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Image files to process. Glob patterns are expanded.
    #[arg(value_name = "IMAGES")]
    pub names: Vec<String>,

    /// Marker dictionary id (see --list)
    #[arg(short, long = "dict", default_value_t = DEFAULT_DICTIONARY)]
    pub dictionary: i32,

    /// Name of the output GCP list file [default: stdout]
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,

    /// Target program of the GCP list
    #[arg(short = 't', long = "type", value_enum)]
    pub target: Option<OutputTarget>,

    /// File with GCP coordinates, one `id east north elev` per line
    #[arg(short, long)]
    pub input: Option<Utf8PathBuf>,

    /// Field separator of the coordinate file
    #[arg(short, long, default_value = " ")]
    pub separator: String,

    /// Log progress of each image and a per-marker summary
    #[arg(short, long)]
    pub verbose: bool,

    /// Process images in parallel
    #[arg(long)]
    pub multi: bool,

    /// List dictionary names and ids and the detector parameters, then exit
    #[arg(short, long)]
    pub list: bool,

    /// EPSG code of the GCP coordinates, written as header for ODM
    #[arg(long)]
    pub epsg: Option<u32>,

    /// Adjust image intensities with the built-in lookup table
    #[arg(short, long)]
    pub adjust: bool,

    /// Maximum number of detections of one marker, all are dropped above
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Coordinate file order is `id north east elev` (GCPEditorPro)
    #[arg(long)]
    pub nez: bool,

    /// Write absolute image paths instead of file names
    #[arg(long)]
    pub full_path: bool,

    /// YAML or JSON file with detector parameters, replaces all detector
    /// flags
    #[arg(long)]
    pub params: Option<Utf8PathBuf>,

    /// Also write log messages to this file
    #[arg(long)]
    pub log_file: Option<Utf8PathBuf>,

    #[command(flatten)]
    pub detector: DetectorArgs,
}

/// ArUco detector tuning flags.
#[derive(clap::Args, Debug, Clone)]
pub struct DetectorArgs {
    /// Detect inverted markers
    #[arg(short = 'r', long)]
    pub inverted: bool,
    /// Adaptive thresholding window min size
    #[arg(long, default_value_t = 3)]
    pub winmin: i32,
    /// Adaptive thresholding window max size
    #[arg(long, default_value_t = 23)]
    pub winmax: i32,
    /// Adaptive thresholding window size step
    #[arg(long, default_value_t = 10)]
    pub winstep: i32,
    /// Adaptive threshold constant
    #[arg(long, default_value_t = 7.0)]
    pub thres: f64,
    /// Min marker perimeter rate
    #[arg(long, default_value_t = 0.03)]
    pub minrate: f64,
    /// Max marker perimeter rate
    #[arg(long, default_value_t = 4.0)]
    pub maxrate: f64,
    /// Polygonal approx accuracy rate
    #[arg(long, default_value_t = 0.03)]
    pub poly: f64,
    /// Minimum distance of any pair of corners in the same marker
    #[arg(long, default_value_t = 0.05)]
    pub corner: f64,
    /// Minimum distance of any pair of corners from different markers
    #[arg(long, default_value_t = 0.125)]
    pub markerdist: f64,
    /// Minimum distance of any marker corner to the image border
    #[arg(long, default_value_t = 3)]
    pub borderdist: i32,
    /// Width of the marker border
    #[arg(long, default_value_t = 1)]
    pub borderbits: i32,
    /// Minimum stddev of pixel values
    #[arg(long, default_value_t = 5.0)]
    pub otsu: f64,
    /// Number of pixels per cell
    #[arg(long, default_value_t = 4)]
    pub persp: i32,
    /// Ignored pixels at cell borders
    #[arg(long, default_value_t = 0.13)]
    pub ignore: f64,
    /// Border bits error rate
    #[arg(long, default_value_t = 0.35)]
    pub error: f64,
    /// Bit correction rate
    #[arg(long, default_value_t = 0.6)]
    pub correct: f64,
    /// Subpixel refinement method (0: none, 1: subpixel, 2: contour, 3: AprilTag)
    #[arg(long, default_value_t = 0)]
    pub refinement: i32,
    /// Window size for subpixel refinement
    #[arg(long, default_value_t = 5)]
    pub refwin: i32,
    /// Stop criteria for subpixel refinement
    #[arg(long, default_value_t = 30)]
    pub maxiter: i32,
    /// Stop criteria for subpixel refinement
    #[arg(long, default_value_t = 0.1)]
    pub minacc: f64,
}

impl From<&DetectorArgs> for DetectorParams {
    fn from(args: &DetectorArgs) -> Self {
        DetectorParams {
            adaptive_thresh_win_size_min: args.winmin,
            adaptive_thresh_win_size_max: args.winmax,
            adaptive_thresh_win_size_step: args.winstep,
            adaptive_thresh_constant: args.thres,
            min_marker_perimeter_rate: args.minrate,
            max_marker_perimeter_rate: args.maxrate,
            polygonal_approx_accuracy_rate: args.poly,
            min_corner_distance_rate: args.corner,
            min_marker_distance_rate: args.markerdist,
            min_distance_to_border: args.borderdist,
            marker_border_bits: args.borderbits,
            min_otsu_std_dev: args.otsu,
            perspective_remove_pixel_per_cell: args.persp,
            perspective_remove_ignored_margin_per_cell: args.ignore,
            max_erroneous_bits_in_border_rate: args.error,
            error_correction_rate: args.correct,
            corner_refinement_method: args.refinement,
            corner_refinement_win_size: args.refwin,
            corner_refinement_max_iterations: args.maxiter,
            corner_refinement_min_accuracy: args.minacc,
            detect_inverted_marker: args.inverted,
        }
    }
}

impl Cli {
    /// Build the run configuration. A parameter file replaces the detector
    /// flags completely.
    pub fn to_config(&self) -> Result<RunConfig> {
        let detector = match &self.params {
            Some(path) => DetectorParams::from_path(path)
                .with_context(|| format!("loading detector parameters from \"{path}\""))?,
            None => DetectorParams::from(&self.detector),
        };
        let cfg = RunConfig {
            dictionary: self.dictionary,
            detector,
            coords_path: self.input.as_ref().map(|p| p.as_std_path().to_path_buf()),
            separator: self.separator.clone(),
            axis_order: if self.nez {
                AxisOrder::NorthEast
            } else {
                AxisOrder::EastNorth
            },
            target: self.target,
            epsg: self.epsg,
            limit: self.limit,
            image_naming: if self.full_path {
                ImageNaming::AbsolutePath
            } else {
                ImageNaming::Basename
            },
            adjust_contrast: self.adjust,
            parallel: self.multi,
            verbose: self.verbose,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn is_pattern(name: &str) -> bool {
    name.contains(['*', '?', '['])
}

/// Expand glob patterns in `names`. Plain names are kept as given, even if
/// the file does not exist, so that the failure is reported per image.
pub fn expand_image_args(names: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for name in names {
        if !is_pattern(name) {
            paths.push(PathBuf::from(name));
            continue;
        }
        let mut matched: Vec<PathBuf> = glob::glob(name)
            .with_context(|| format!("invalid glob pattern \"{name}\""))?
            .collect::<std::result::Result<_, _>>()?;
        if matched.is_empty() {
            warn!("No files match \"{name}\".");
        }
        matched.sort();
        paths.extend(matched);
    }
    Ok(paths)
}

/// Dictionary ids and names, then the detector parameters in effect.
fn print_list<W: std::io::Write>(cfg: &RunConfig, mut out: W) -> std::io::Result<()> {
    for (id, name) in DICTIONARIES.iter() {
        writeln!(out, "{id} : {name}")?;
    }
    for (name, value) in cfg.detector.entries() {
        writeln!(out, "{name} : {value}")?;
    }
    Ok(())
}

pub fn run_cli(cli: Cli) -> Result<()> {
    let start = std::time::Instant::now();
    let cfg = cli.to_config()?;
    if cli.list {
        print_list(&cfg, std::io::stderr().lock())?;
        return Ok(());
    }

    let images = expand_image_args(&cli.names)?;
    if images.is_empty() {
        anyhow::bail!(crate::Error::NoImages);
    }
    let detector = detect::default_detector(&cfg)?;
    let finder = GcpFinder::new(cfg, detector)?;
    let report = finder.run(&images)?;

    let output = cli.output.as_ref().map(|p| p.as_std_path());
    report.gcps.write_output(output)?;

    let warnings = report.diagnostics.iter().filter(|d| d.is_warning()).count();
    if warnings > 0 {
        info!("{warnings} warning(s) during the run.");
    }
    info!(
        "Finished in {:.2} seconds",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detector_flag_defaults_match_params() {
        let cli = Cli::try_parse_from(["gcp-find", "a.jpg"]).unwrap();
        assert_eq!(DetectorParams::from(&cli.detector), DetectorParams::default());
        assert_eq!(cli.separator, " ");
        assert_eq!(cli.limit, 999);
        assert_eq!(cli.dictionary, 1);
        assert!(cli.target.is_none());
    }

    #[test]
    fn flags_to_config() {
        let cli = Cli::try_parse_from([
            "gcp-find",
            "-t",
            "VisualSfM",
            "-i",
            "gcps.txt",
            "-s",
            ";",
            "--nez",
            "--full-path",
            "--multi",
            "--limit",
            "4",
            "--epsg",
            "23700",
            "-r",
            "--winmax",
            "53",
            "x.jpg",
            "y.jpg",
        ])
        .unwrap();
        let cfg = cli.to_config().unwrap();
        assert_eq!(cfg.target, Some(OutputTarget::VisualSfm));
        assert_eq!(cfg.coords_path, Some(PathBuf::from("gcps.txt")));
        assert_eq!(cfg.separator, ";");
        assert_eq!(cfg.axis_order, AxisOrder::NorthEast);
        assert_eq!(cfg.image_naming, ImageNaming::AbsolutePath);
        assert!(cfg.parallel);
        assert_eq!(cfg.limit, 4);
        assert_eq!(cfg.epsg, Some(23700));
        assert!(cfg.detector.detect_inverted_marker);
        assert_eq!(cfg.detector.adaptive_thresh_win_size_max, 53);
        assert_eq!(cli.names, vec!["x.jpg", "y.jpg"]);
    }

    #[test]
    fn params_file_replaces_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        std::fs::write(&path, "adaptive_thresh_win_size_step: 4\n").unwrap();
        let cli = Cli::try_parse_from([
            "gcp-find",
            "--winmax",
            "53",
            "--params",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let cfg = cli.to_config().unwrap();
        assert_eq!(cfg.detector.adaptive_thresh_win_size_step, 4);
        // flag ignored in favor of the file (which uses the default)
        assert_eq!(cfg.detector.adaptive_thresh_win_size_max, 23);
    }

    #[test]
    fn listing() {
        let cli = Cli::try_parse_from(["gcp-find", "--list", "--winmax", "53"]).unwrap();
        let mut out = Vec::new();
        print_list(&cli.to_config().unwrap(), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), DICTIONARIES.len() + 21);
        assert_eq!(lines[0], "0 : DICT_4X4_50");
        assert_eq!(lines[1], "1 : DICT_4X4_100");
        assert_eq!(lines[DICTIONARIES.len() - 1], "99 : DICT_3X3_32 custom");

        let params = &lines[DICTIONARIES.len()..];
        assert_eq!(params[0], "adaptive_thresh_constant : 7.0");
        assert!(params.contains(&"adaptive_thresh_win_size_max : 53"));
        assert!(params.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn unknown_target_is_rejected() {
        assert!(Cli::try_parse_from(["gcp-find", "-t", "odm", "a.jpg"]).is_err());
    }

    #[test]
    fn glob_expansion() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.jpg", "c.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let pattern = format!("{}/*.jpg", dir.path().display());
        let names = vec![pattern, "missing.jpg".to_string()];
        let paths = expand_image_args(&names).unwrap();
        assert_eq!(
            paths,
            vec![
                dir.path().join("a.jpg"),
                dir.path().join("b.jpg"),
                PathBuf::from("missing.jpg")
            ]
        );
    }
}
