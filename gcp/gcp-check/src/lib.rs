//! Visual check of GCP lists.
//!
//! Reads a GCP list as written by `gcp-find` (layout
//! `east north elev x y image id`, optionally preceded by an `EPSG:` line)
//! and draws every point onto its image. For each image an SVG overlay and
//! a PNG rasterization of it are written.

use std::{
    collections::BTreeSet,
    io::BufRead,
    path::{Path, PathBuf},
};

use camino::Utf8PathBuf;
use clap::Parser;
use eyre::{self as anyhow, Context, Result};
use tracing::{info, warn};

mod overlay;

pub use overlay::{OverlayFiles, OverlayStyle, draw_overlay, overlay_svg, rasterize};

/// One row of a GCP list.
#[derive(Debug, Clone, PartialEq)]
pub struct GcpRow {
    pub east: String,
    pub north: String,
    pub elev: String,
    pub x: f64,
    pub y: f64,
    pub image: String,
    pub id: i32,
}

fn parse_row(line: &str, separator: &str) -> Option<GcpRow> {
    let fields: Vec<&str> = line.split(separator).map(str::trim).collect();
    let [east, north, elev, x, y, image, id] = fields.as_slice() else {
        return None;
    };
    Some(GcpRow {
        east: east.to_string(),
        north: north.to_string(),
        elev: elev.to_string(),
        x: x.parse().ok()?,
        y: y.parse().ok()?,
        image: image.to_string(),
        id: id.parse().ok()?,
    })
}

/// Parse a GCP list. Rows which cannot be parsed are logged and skipped.
pub fn parse_gcp_list<R: BufRead>(rdr: R, separator: &str) -> Result<Vec<GcpRow>> {
    let mut rows = Vec::new();
    for (idx, line) in rdr.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || (idx == 0 && trimmed.starts_with("EPSG:")) {
            continue;
        }
        match parse_row(trimmed, separator) {
            Some(row) => rows.push(row),
            None => warn!("Skipping unreadable line {}: {}", idx + 1, trimmed),
        }
    }
    Ok(rows)
}

/// Distinct image names of `rows`, sorted.
pub fn image_names(rows: &[GcpRow]) -> Vec<&str> {
    rows.iter()
        .map(|row| row.image.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Find the image file called `name`: as written, then in `image_dir`, then
/// next to the GCP list.
pub fn locate_image(name: &str, image_dir: Option<&Path>, gcp_file: &Path) -> Option<PathBuf> {
    let direct = PathBuf::from(name);
    let in_image_dir = image_dir.map(|dir| dir.join(name));
    let beside_list = gcp_file.parent().map(|dir| dir.join(name));
    std::iter::once(direct)
        .chain(in_image_dir)
        .chain(beside_list)
        .find(|p| p.is_file())
}

/// Draw the points of a GCP list onto their images.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// GCP list to check
    pub gcp_file: Utf8PathBuf,

    /// Directory with the images, if not next to the GCP list
    #[arg(long)]
    pub path: Option<Utf8PathBuf>,

    /// Field separator of the GCP list
    #[arg(short, long, default_value = " ")]
    pub separator: String,

    /// Only draw images on which this GCP id was found
    #[arg(long)]
    pub id: Option<i32>,

    /// Directory for the overlay images
    #[arg(short, long, default_value = ".")]
    pub output_dir: Utf8PathBuf,

    /// Marker circle diameter in pixels
    #[arg(long, default_value_t = 200.0)]
    pub markersize: f64,

    /// Marker edge color
    #[arg(long, default_value = "red")]
    pub edgecolor: String,

    /// Marker edge width in pixels
    #[arg(long, default_value_t = 20.0)]
    pub edgewidth: f64,

    /// Label font size in pixels
    #[arg(long, default_value_t = 200.0)]
    pub fontsize: f64,

    /// Label color
    #[arg(long, default_value = "red")]
    pub fontcolor: String,
}

impl Cli {
    fn style(&self) -> OverlayStyle {
        OverlayStyle {
            marker_size: self.markersize,
            edge_color: self.edgecolor.clone(),
            edge_width: self.edgewidth,
            font_size: self.fontsize,
            font_color: self.fontcolor.clone(),
        }
    }
}

pub fn run_cli(cli: Cli) -> Result<()> {
    let fd = std::fs::File::open(&cli.gcp_file)
        .with_context(|| format!("opening GCP list \"{}\"", cli.gcp_file))?;
    let rows = parse_gcp_list(std::io::BufReader::new(fd), &cli.separator)?;
    if rows.is_empty() {
        anyhow::bail!("no GCP rows in \"{}\"", cli.gcp_file);
    }
    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating output directory \"{}\"", cli.output_dir))?;

    let style = cli.style();
    let image_dir = cli.path.as_ref().map(|p| p.as_std_path());
    let mut n_written = 0;
    for name in image_names(&rows) {
        let points: Vec<&GcpRow> = rows.iter().filter(|r| r.image == name).collect();
        if let Some(id) = cli.id {
            if !points.iter().any(|r| r.id == id) {
                continue;
            }
        }
        let Some(img_path) = locate_image(name, image_dir, cli.gcp_file.as_std_path()) else {
            warn!("Image not found: {name}");
            continue;
        };
        let files = draw_overlay(&img_path, &points, &style, cli.output_dir.as_std_path())
            .with_context(|| format!("drawing GCPs on \"{}\"", img_path.display()))?;
        info!(
            "{}: {} GCP(s), wrote {}",
            name,
            points.len(),
            files.png.display()
        );
        n_written += 1;
    }
    info!("Checked {n_written} image(s).");
    Ok(())
}
