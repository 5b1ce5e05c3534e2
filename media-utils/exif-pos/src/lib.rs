//! GPS position and capture time from the EXIF data of images.

use std::path::Path;

use camino::Utf8PathBuf;
use clap::Parser;
use exif::{Exif, In, Rational, Tag, Value};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Exif(#[from] exif::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Camera position in WGS84 decimal degrees and metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPosition {
    pub lon: f64,
    pub lat: f64,
    pub alt: f64,
}

/// What could be read from one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageInfo {
    pub position: Option<GpsPosition>,
    /// `DateTime` as stored, e.g. `2021:06:01 10:22:05`.
    pub datetime: Option<String>,
}

/// Decimal degrees from degrees, minutes and seconds. Southern and western
/// references give negative values. Any reference other than `N`, `S`, `E`
/// or `W`, including an empty one, gives `None`.
pub fn dms_to_degrees(reference: &str, dms: &[Rational]) -> Option<f64> {
    let [deg, min, sec] = dms else {
        return None;
    };
    let sign = match reference.trim() {
        "N" | "E" => 1.0,
        "S" | "W" => -1.0,
        _ => return None,
    };
    Some(sign * (deg.to_f64() + min.to_f64() / 60.0 + sec.to_f64() / 3600.0))
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string()),
        _ => None,
    }
}

fn rationals(exif: &Exif, tag: Tag) -> Option<&[Rational]> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) => Some(values.as_slice()),
        _ => None,
    }
}

fn coordinate(exif: &Exif, ref_tag: Tag, tag: Tag) -> Option<f64> {
    let dms = rationals(exif, tag)?;
    let reference = ascii(exif, ref_tag).unwrap_or_default();
    let value = dms_to_degrees(&reference, dms);
    if value.is_none() {
        tracing::warn!("ignoring {tag} with reference \"{reference}\"");
    }
    value
}

fn position(exif: &Exif) -> Option<GpsPosition> {
    let lat = coordinate(exif, Tag::GPSLatitudeRef, Tag::GPSLatitude)?;
    let lon = coordinate(exif, Tag::GPSLongitudeRef, Tag::GPSLongitude)?;
    let mut alt = rationals(exif, Tag::GPSAltitude)?.first()?.to_f64();
    let below_sea_level = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        == Some(1);
    if below_sea_level {
        alt = -alt;
    }
    Some(GpsPosition { lon, lat, alt })
}

impl ImageInfo {
    pub fn from_exif(exif: &Exif) -> Self {
        Self {
            position: position(exif),
            datetime: ascii(exif, Tag::DateTime),
        }
    }
}

/// Read the EXIF data of the image at `path`. An image without EXIF data
/// gives an empty [ImageInfo].
pub fn read_image_info<P: AsRef<Path>>(path: P) -> Result<ImageInfo> {
    let file = std::fs::File::open(path)?;
    let mut rdr = std::io::BufReader::new(file);
    match exif::Reader::new().read_from_container(&mut rdr) {
        Ok(exif) => Ok(ImageInfo::from_exif(&exif)),
        Err(exif::Error::NotFound(_)) => Ok(ImageInfo::default()),
        Err(e) => Err(e.into()),
    }
}

/// One output row: `name,lon,lat,alt[,datetime]`, `name,,,,datetime` or
/// `name,,,,,No EXIF`.
pub fn format_line(name: &str, info: &ImageInfo) -> String {
    match (&info.position, &info.datetime) {
        (Some(p), Some(dt)) => format!("{name},{:.6},{:.6},{:.2},{dt}", p.lon, p.lat, p.alt),
        (Some(p), None) => format!("{name},{:.6},{:.6},{:.2}", p.lon, p.lat, p.alt),
        (None, Some(dt)) => format!("{name},,,,{dt}"),
        (None, None) => format!("{name},,,,,No EXIF"),
    }
}

/// Print GPS position and capture time of images, one CSV line per image.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Image files
    #[arg(required = true)]
    pub images: Vec<Utf8PathBuf>,

    /// Print file names without directory
    #[arg(long)]
    pub basename: bool,
}

pub fn run_cli<W: std::io::Write>(cli: &Cli, mut out: W) -> eyre::Result<()> {
    for path in cli.images.iter() {
        let name = if cli.basename {
            path.file_name().unwrap_or(path.as_str())
        } else {
            path.as_str()
        };
        let info = read_image_info(path).unwrap_or_else(|e| {
            tracing::warn!("reading EXIF of {path}: {e}");
            ImageInfo::default()
        });
        writeln!(out, "{}", format_line(name, &info))?;
    }
    Ok(())
}
