//! Render ArUco markers of one dictionary as PNG images, ready to print.

use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use clap::Parser;
use image::GrayImage;

use gcp_find::dictionaries::{DEFAULT_DICTIONARY, dictionary_name, dictionary_size};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown marker dictionary id {0} (see gcp-find --list)")]
    UnknownDictionary(i32),
    #[error("marker id {id} not in {name}, valid ids are 0 to {last}")]
    IdOutOfRange {
        id: i32,
        name: &'static str,
        last: u32,
    },
    #[error("invalid marker image size {0}")]
    InvalidSize(u32),
    #[error("no marker renderer available: built without the \"opencv\" feature")]
    RendererUnavailable,
    #[error("rendering marker {id}: {msg}")]
    Render { id: i32, msg: String },
    #[error("saving {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Markers `start..=end` of one dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerRange {
    pub dictionary: i32,
    pub start: i32,
    pub end: i32,
}

impl MarkerRange {
    /// Without `end`, or with `end` before `start`, only `start` is
    /// rendered. Both ends must be ids of the dictionary.
    pub fn new(dictionary: i32, start: i32, end: Option<i32>) -> Result<Self> {
        let name = dictionary_name(dictionary).ok_or(Error::UnknownDictionary(dictionary))?;
        let size = dictionary_size(dictionary).ok_or(Error::UnknownDictionary(dictionary))?;
        let last = size - 1;
        let end = end.unwrap_or(start).max(start);
        for id in [start, end] {
            let valid = u32::try_from(id).is_ok_and(|id| id <= last);
            if !valid {
                return Err(Error::IdOutOfRange { id, name, last });
            }
        }
        Ok(Self {
            dictionary,
            start,
            end,
        })
    }

    pub fn ids(&self) -> std::ops::RangeInclusive<i32> {
        self.start..=self.end
    }
}

pub fn marker_file_name(id: i32) -> String {
    format!("marker{id}.png")
}

/// Draws the bit pattern of one marker, including its black border, as a
/// square image.
pub trait MarkerRenderer {
    fn render(&self, dictionary: i32, id: i32, size: u32) -> Result<GrayImage>;
}

#[cfg(feature = "opencv")]
pub struct OpencvRenderer;

#[cfg(feature = "opencv")]
impl MarkerRenderer for OpencvRenderer {
    fn render(&self, dictionary: i32, id: i32, size: u32) -> Result<GrayImage> {
        use opencv::{core::Mat, objdetect, prelude::MatTraitConstManual};

        let to_err = |e: opencv::Error| Error::Render {
            id,
            msg: e.to_string(),
        };
        let side = i32::try_from(size).map_err(|_| Error::InvalidSize(size))?;
        let dict = gcp_find::detect::aruco_dictionary(dictionary).map_err(to_err)?;
        let mut mat = Mat::default();
        objdetect::generate_image_marker(&dict, id, side, &mut mat, 1).map_err(to_err)?;
        let buf = mat.data_bytes().map_err(to_err)?.to_vec();
        GrayImage::from_raw(size, size, buf).ok_or_else(|| Error::Render {
            id,
            msg: format!("expected {size}x{size} 8-bit image"),
        })
    }
}

/// The renderer of this build.
#[cfg(feature = "opencv")]
pub fn default_renderer() -> Result<Box<dyn MarkerRenderer>> {
    Ok(Box::new(OpencvRenderer))
}

/// The renderer of this build.
#[cfg(not(feature = "opencv"))]
pub fn default_renderer() -> Result<Box<dyn MarkerRenderer>> {
    Err(Error::RendererUnavailable)
}

/// Render every marker of `range` at `size` x `size` pixels and save it as
/// `marker<id>.png` in `out_dir`.
pub fn write_markers<R: MarkerRenderer + ?Sized>(
    renderer: &R,
    range: &MarkerRange,
    size: u32,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    if size == 0 {
        return Err(Error::InvalidSize(size));
    }
    let mut written = Vec::new();
    for id in range.ids() {
        let img = renderer.render(range.dictionary, id, size)?;
        let path = out_dir.join(marker_file_name(id));
        img.save(&path).map_err(|source| Error::Save {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Saved marker {id} to {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Render ArUco markers as PNG images.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Marker dictionary id (see gcp-find --list)
    #[arg(short, long = "dict", default_value_t = DEFAULT_DICTIONARY)]
    pub dictionary: i32,

    /// First marker to render
    #[arg(short, long, default_value_t = 0)]
    pub start: i32,

    /// Last marker to render [default: the first one]
    #[arg(short, long)]
    pub end: Option<i32>,

    /// Side length of the marker images [pixel]
    #[arg(long, default_value_t = 1000)]
    pub size: u32,

    /// Directory to write the marker images to
    #[arg(short, long, default_value = ".")]
    pub output_dir: Utf8PathBuf,
}

pub fn run_cli(cli: &Cli) -> eyre::Result<()> {
    let range = MarkerRange::new(cli.dictionary, cli.start, cli.end)?;
    let renderer = default_renderer()?;
    let written = write_markers(
        renderer.as_ref(),
        &range,
        cli.size,
        cli.output_dir.as_std_path(),
    )?;
    tracing::info!("{} marker(s) written to {}", written.len(), cli.output_dir);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    /// Fills the image with the marker id.
    struct IdFill;

    impl MarkerRenderer for IdFill {
        fn render(&self, _dictionary: i32, id: i32, size: u32) -> Result<GrayImage> {
            Ok(GrayImage::from_pixel(size, size, image::Luma([id as u8])))
        }
    }

    #[test]
    fn ranges() {
        let r = MarkerRange::new(1, 3, Some(6)).unwrap();
        assert_eq!(r.ids().collect::<Vec<_>>(), vec![3, 4, 5, 6]);
        assert_eq!(MarkerRange::new(1, 7, None).unwrap().ids().count(), 1);
        // end before start renders the first marker only
        assert_eq!(MarkerRange::new(1, 7, Some(2)).unwrap().end, 7);
        assert_eq!(MarkerRange::new(99, 0, Some(31)).unwrap().ids().count(), 32);
    }

    #[test]
    fn ids_outside_dictionary() {
        assert!(matches!(
            MarkerRange::new(99, 0, Some(32)),
            Err(Error::IdOutOfRange {
                id: 32,
                last: 31,
                ..
            })
        ));
        assert!(matches!(
            MarkerRange::new(1, -1, None),
            Err(Error::IdOutOfRange { id: -1, .. })
        ));
        assert!(matches!(
            MarkerRange::new(42, 0, None),
            Err(Error::UnknownDictionary(42))
        ));
    }

    #[test]
    fn files_are_written_per_marker() {
        let dir = tempfile::tempdir().unwrap();
        let range = MarkerRange::new(1, 8, Some(10)).unwrap();
        let written = write_markers(&IdFill, &range, 16, dir.path()).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["marker8.png", "marker9.png", "marker10.png"]);
        let img = image::open(&written[1]).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (16, 16));
        assert_eq!(img.get_pixel(3, 3).0[0], 9);
    }

    #[test]
    fn zero_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let range = MarkerRange::new(1, 0, None).unwrap();
        assert!(matches!(
            write_markers(&IdFill, &range, 0, dir.path()),
            Err(Error::InvalidSize(0))
        ));
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["aruco-make"]).unwrap();
        assert_eq!(cli.dictionary, 1);
        assert_eq!(cli.start, 0);
        assert_eq!(cli.end, None);
        assert_eq!(cli.size, 1000);
        assert_eq!(cli.output_dir, Utf8PathBuf::from("."));
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn no_renderer_without_feature() {
        assert!(matches!(default_renderer(), Err(Error::RendererUnavailable)));
    }
}
