//! Rendering of detections into the GCP list layouts of the downstream
//! photogrammetry programs.
//!
//! Formatting runs after all images are processed: whether a marker ID is
//! over the occurrence limit depends on the detections of the whole run.

use std::{fmt, io::Write, path::Path};

use crate::{
    aggregate::{Aggregation, DetectionRecord},
    config::{OutputTarget, RunConfig},
    coords::CoordinateTable,
    detect::Corners,
    diagnostics::{Diagnostic, Diagnostics},
    error::{Error, Result},
};

/// Half of the larger of the marker side lengths and its diagonals scaled by
/// `1/sqrt(2)`. Used as the marker size hint for Meshroom.
pub fn marker_size(corners: &Corners) -> f64 {
    let dist = |a: usize, b: usize| {
        let dx = corners[a][0] as f64 - corners[b][0] as f64;
        let dy = corners[a][1] as f64 - corners[b][1] as f64;
        dx.hypot(dy)
    };
    let sides = [dist(0, 1), dist(1, 2), dist(2, 3), dist(3, 0)];
    let diagonals = [
        dist(0, 2) / std::f64::consts::SQRT_2,
        dist(1, 3) / std::f64::consts::SQRT_2,
    ];
    let max = sides
        .iter()
        .chain(diagonals.iter())
        .fold(0.0f64, |accum, d| accum.max(*d));
    max / 2.0
}

/// A rendered GCP list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcpList {
    header: Option<String>,
    lines: Vec<String>,
}

impl GcpList {
    /// The `EPSG:<code>` line, if any.
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    /// One line per accepted detection, without line endings.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn write_to<W: Write>(&self, mut wtr: W) -> std::io::Result<()> {
        if let Some(header) = &self.header {
            writeln!(wtr, "{header}")?;
        }
        for line in self.lines.iter() {
            writeln!(wtr, "{line}")?;
        }
        wtr.flush()
    }

    /// Write to the file at `path`, replacing its contents, or to stdout if
    /// `path` is `None`.
    pub fn write_output(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                let fd = std::fs::File::create(path).map_err(|source| Error::OutputUnavailable {
                    path: path.into(),
                    source,
                })?;
                self.write_to(std::io::BufWriter::new(fd))?;
                tracing::info!("Saved {} GCP record(s) to: {}", self.lines.len(), path.display());
            }
            None => {
                let stdout = std::io::stdout();
                self.write_to(stdout.lock())?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for GcpList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(header) = &self.header {
            writeln!(f, "{header}")?;
        }
        for line in self.lines.iter() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

pub struct GcpFormatter<'a> {
    table: &'a CoordinateTable,
    target: Option<OutputTarget>,
    limit: usize,
    epsg: Option<u32>,
}

impl<'a> GcpFormatter<'a> {
    pub fn new(table: &'a CoordinateTable, cfg: &RunConfig) -> Self {
        Self {
            table,
            target: cfg.target,
            limit: cfg.limit,
            epsg: cfg.epsg,
        }
    }

    /// Render every record of `agg` in detection order.
    ///
    /// Withheld records are reported to `diags`. The result only depends on
    /// the arguments.
    pub fn format(&self, agg: &Aggregation, diags: &mut Diagnostics) -> GcpList {
        let header = match (self.target, self.epsg) {
            (Some(OutputTarget::Odm), Some(code)) => Some(format!("EPSG:{code}")),
            _ => None,
        };
        let lines = agg
            .records
            .iter()
            .filter_map(|rec| self.format_record(rec, agg.occurrences.count(rec.id), diags))
            .collect();
        GcpList { header, lines }
    }

    fn format_record(
        &self,
        rec: &DetectionRecord,
        occurrences: usize,
        diags: &mut Diagnostics,
    ) -> Option<String> {
        let over_limit = occurrences > self.limit;
        match (self.table.get(rec.id), self.target) {
            (Some(_), _) | (None, None) if over_limit => {
                diags.report(Diagnostic::OverLimitDrop {
                    id: rec.id,
                    image: rec.image.clone(),
                });
                None
            }
            (Some(c), None | Some(OutputTarget::Odm)) => Some(format!(
                "{} {} {} {} {} {} {}",
                c.east, c.north, c.elev, rec.x, rec.y, rec.image, rec.id
            )),
            (Some(c), Some(OutputTarget::VisualSfm)) => Some(format!(
                "{} {} {} {} {} {} {}",
                rec.image, rec.x, rec.y, c.east, c.north, c.elev, rec.id
            )),
            (Some(_), Some(OutputTarget::Meshroom)) => Some(format!(
                "{} {} {} {} {:.2}",
                rec.x,
                rec.y,
                rec.image,
                rec.id,
                marker_size(&rec.corners)
            )),
            (None, None) => Some(format!("{} {} {} {}", rec.x, rec.y, rec.image, rec.id)),
            (None, Some(_)) => {
                diags.report(Diagnostic::MissingCoordinates { id: rec.id });
                None
            }
        }
    }
}
