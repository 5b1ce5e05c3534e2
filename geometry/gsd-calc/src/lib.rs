//! Ground sample distance (GSD) of a nadir flight and the GCP marker size
//! which keeps markers detectable at that GSD.

use std::{collections::BTreeMap, path::Path};

use camino::Utf8PathBuf;
use clap::Parser;
use serde::{Deserialize, Serialize};

/// Pixels per marker bit needed for reliable detection.
const PIXELS_PER_BIT: f64 = 6.0;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("reading sensor database {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing sensor database {path}: {source}")]
    Yaml {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("parsing sensor database {path}: {source}")]
    Json {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("sensor \"{0}\" not in sensor database")]
    UnknownSensor(String),
    #[error("missing value for {0}")]
    Missing(&'static str),
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Camera geometry. Lengths in mm, image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sensor {
    pub swidth: f64,
    pub focal: f64,
    pub iwidth: f64,
    pub iheight: f64,
}

/// Sensors by name, as stored in a YAML or JSON file.
pub type SensorDb = BTreeMap<String, Sensor>;

pub fn load_sensor_db<P: AsRef<Path>>(path: P) -> Result<SensorDb> {
    let path = path.as_ref();
    let utf8 = || Utf8PathBuf::from(path.to_string_lossy().into_owned());
    let buf = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: utf8(),
        source,
    })?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        serde_json::from_str(&buf).map_err(|source| Error::Json {
            path: utf8(),
            source,
        })
    } else {
        serde_yaml::from_str(&buf).map_err(|source| Error::Yaml {
            path: utf8(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GsdResult {
    /// cm per pixel
    pub gsd: f64,
    /// m
    pub ground_width: f64,
    /// m
    pub ground_height: f64,
    /// cm
    pub marker_size: f64,
}

impl std::fmt::Display for GsdResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "GSD: {:.1} cm/pixel", self.gsd)?;
        writeln!(f, "Ground width: {:.1} m", self.ground_width)?;
        writeln!(f, "Ground height: {:.1} m", self.ground_height)?;
        writeln!(f, "Marker size: {:.0} cm", self.marker_size)
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(Error::NotPositive { name, value })
    }
}

/// Compute the GSD for `sensor` flown at `height` metres, and the marker size
/// for a dictionary with `bits` x `bits` data bits.
pub fn compute(sensor: &Sensor, height: f64, bits: u32) -> Result<GsdResult> {
    let swidth = positive("sensor width", sensor.swidth)?;
    let focal = positive("focal length", sensor.focal)?;
    let iwidth = positive("image width", sensor.iwidth)?;
    let iheight = positive("image height", sensor.iheight)?;
    let height = positive("flight height", height)?;

    let gsd = swidth * height * 100.0 / (focal * iwidth);
    Ok(GsdResult {
        gsd,
        ground_width: gsd * iwidth / 100.0,
        ground_height: gsd * iheight / 100.0,
        marker_size: gsd * f64::from(bits) * PIXELS_PER_BIT,
    })
}

/// Accept both `.` and `,` as decimal separator.
fn parse_decimal(s: &str) -> std::result::Result<f64, String> {
    s.replace(',', ".")
        .parse()
        .map_err(|e| format!("invalid number \"{s}\": {e}"))
}

/// Ground sample distance calculator.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Flight height above ground [m]
    #[arg(long, value_parser = parse_decimal)]
    pub height: f64,

    /// Sensor width [mm]
    #[arg(long, value_parser = parse_decimal)]
    pub swidth: Option<f64>,

    /// Focal length [mm]
    #[arg(long, value_parser = parse_decimal)]
    pub focal: Option<f64>,

    /// Image width [pixel]
    #[arg(long, value_parser = parse_decimal)]
    pub iwidth: Option<f64>,

    /// Image height [pixel]
    #[arg(long, value_parser = parse_decimal)]
    pub iheight: Option<f64>,

    /// Marker dictionary size in bits, e.g. 4 for the 4x4 dictionaries
    #[arg(long, default_value_t = 4)]
    pub bits: u32,

    /// YAML or JSON file with sensor data by name
    #[arg(long, requires = "sensor")]
    pub sensor_db: Option<Utf8PathBuf>,

    /// Sensor to take values from, flags given explicitly take precedence
    #[arg(long, requires = "sensor_db")]
    pub sensor: Option<String>,
}

impl Cli {
    /// The sensor from the database, overridden by explicit flags.
    pub fn sensor(&self) -> Result<Sensor> {
        let base = match (&self.sensor_db, &self.sensor) {
            (Some(path), Some(name)) => {
                let db = load_sensor_db(path)?;
                let sensor = *db
                    .get(name)
                    .ok_or_else(|| Error::UnknownSensor(name.clone()))?;
                tracing::debug!("sensor {name}: {sensor:?}");
                Some(sensor)
            }
            _ => None,
        };
        let pick = |flag: Option<f64>, from_db: Option<f64>, name| {
            flag.or(from_db).ok_or(Error::Missing(name))
        };
        Ok(Sensor {
            swidth: pick(self.swidth, base.map(|s| s.swidth), "--swidth")?,
            focal: pick(self.focal, base.map(|s| s.focal), "--focal")?,
            iwidth: pick(self.iwidth, base.map(|s| s.iwidth), "--iwidth")?,
            iheight: pick(self.iheight, base.map(|s| s.iheight), "--iheight")?,
        })
    }
}

pub fn run_cli(cli: &Cli) -> eyre::Result<GsdResult> {
    let sensor = cli.sensor()?;
    Ok(compute(&sensor, cli.height, cli.bits)?)
}
