//! Ground control point coordinate table.
//!
//! The input file has one GCP per line: `id east north elev`, or
//! `id north east elev` when [AxisOrder::NorthEast] is used. Coordinates are
//! kept as the text found in the file so that no precision is lost before
//! they are written out again.

use std::{
    collections::BTreeMap,
    io::BufRead,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    diagnostics::{Diagnostic, Diagnostics},
    error::{Error, Result},
};

/// Order of the two horizontal coordinates in the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxisOrder {
    /// `id east north elev`
    #[default]
    EastNorth,
    /// `id north east elev`, as written by GCPEditorPro.
    NorthEast,
}

/// World coordinates of one GCP, as written in the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcpCoords {
    pub east: String,
    pub north: String,
    pub elev: String,
}

#[derive(Debug, Default, Clone)]
pub struct CoordinateTable {
    coords: BTreeMap<i32, GcpCoords>,
}

impl CoordinateTable {
    /// An empty table, used when no coordinate file is given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table from the file at `path`.
    ///
    /// Failing to open the file is fatal. Problems with individual lines are
    /// reported to `diags` and do not stop the load.
    pub fn load<P: AsRef<Path>>(
        path: P,
        separator: &str,
        axis_order: AxisOrder,
        diags: &mut Diagnostics,
    ) -> Result<Self> {
        let path = path.as_ref();
        let coord_file_error = |source| Error::CoordinateFile {
            path: PathBuf::from(path),
            source,
        };
        let fd = std::fs::File::open(path).map_err(coord_file_error)?;
        let rdr = std::io::BufReader::new(fd);
        let table = Self::from_reader(rdr, separator, axis_order, diags)
            .map_err(|e| match e {
                Error::Io { source } => coord_file_error(source),
                other => other,
            })?;
        tracing::info!(
            "In coordinate file {}, got {} GCP(s).",
            path.display(),
            table.len()
        );
        Ok(table)
    }

    /// Parse the table from `rdr`. A line which is not valid UTF-8 is
    /// reported as malformed and skipped.
    pub fn from_reader<R: BufRead>(
        rdr: R,
        separator: &str,
        axis_order: AxisOrder,
        diags: &mut Diagnostics,
    ) -> Result<Self> {
        let mut coords = BTreeMap::new();
        for (idx, buf) in rdr.split(b'\n').enumerate() {
            let buf = buf?;
            let line_num = idx + 1;
            let line = match String::from_utf8(buf) {
                Ok(line) => line,
                Err(e) => {
                    diags.report(Diagnostic::MalformedRecord {
                        line_num,
                        line: String::from_utf8_lossy(e.as_bytes()).trim().to_string(),
                    });
                    continue;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let fields: Vec<&str> = trimmed.split(separator).map(str::trim).collect();
            if fields.len() < 4 {
                diags.report(Diagnostic::MalformedRecord {
                    line_num,
                    line: trimmed.to_string(),
                });
                continue;
            }
            let Ok(id) = fields[0].parse::<i32>() else {
                diags.report(Diagnostic::MalformedRecord {
                    line_num,
                    line: trimmed.to_string(),
                });
                continue;
            };

            for value in &fields[1..4] {
                if value.parse::<f64>().is_err() {
                    diags.report(Diagnostic::InvalidCoordinate {
                        line_num,
                        id,
                        value: value.to_string(),
                    });
                }
            }

            let (east, north) = match axis_order {
                AxisOrder::EastNorth => (fields[1], fields[2]),
                AxisOrder::NorthEast => (fields[2], fields[1]),
            };
            let gcp = GcpCoords {
                east: east.to_string(),
                north: north.to_string(),
                elev: fields[3].to_string(),
            };
            if coords.insert(id, gcp).is_some() {
                diags.report(Diagnostic::DuplicateCoordinateId { line_num, id });
            }
        }
        Ok(Self { coords })
    }

    pub fn get(&self, id: i32) -> Option<&GcpCoords> {
        self.coords.get(&id)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.coords.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// All entries in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &GcpCoords)> {
        self.coords.iter().map(|(id, c)| (*id, c))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(buf: &str, sep: &str, order: AxisOrder) -> (CoordinateTable, Diagnostics) {
        let mut diags = Diagnostics::new();
        let table = CoordinateTable::from_reader(buf.as_bytes(), sep, order, &mut diags).unwrap();
        (table, diags)
    }

    #[test]
    fn text_is_kept_verbatim() {
        let (table, diags) = parse(
            "7 100.500 200.250 12.000\n8 650123.1234567 5234567.7654321 101.10\n",
            " ",
            AxisOrder::EastNorth,
        );
        assert!(diags.is_empty());
        assert_eq!(table.len(), 2);
        let c = table.get(7).unwrap();
        assert_eq!(c.east, "100.500");
        assert_eq!(c.north, "200.250");
        assert_eq!(c.elev, "12.000");
        assert_eq!(table.get(8).unwrap().east, "650123.1234567");
    }

    #[test]
    fn north_east_order_is_swapped() {
        let (table, _) = parse("1 5000.0 600.0 10.0\n", " ", AxisOrder::NorthEast);
        let c = table.get(1).unwrap();
        assert_eq!(c.east, "600.0");
        assert_eq!(c.north, "5000.0");
        assert_eq!(c.elev, "10.0");
    }

    #[test]
    fn short_lines_are_skipped() {
        let (table, diags) = parse("1 2 3\n2 10 20 30\n", " ", AxisOrder::EastNorth);
        assert_eq!(table.len(), 1);
        assert!(table.contains(2));
        assert_eq!(
            diags.as_slice(),
            &[Diagnostic::MalformedRecord {
                line_num: 1,
                line: "1 2 3".into()
            }]
        );
    }

    #[test]
    fn non_integer_id_is_skipped() {
        let (table, diags) = parse("A1 10 20 30\n", " ", AxisOrder::EastNorth);
        assert!(table.is_empty());
        assert!(matches!(
            diags.as_slice(),
            [Diagnostic::MalformedRecord { line_num: 1, .. }]
        ));
    }

    #[test]
    fn invalid_coordinate_is_reported_but_stored() {
        let (table, diags) = parse("4 10.0 north 30\n", " ", AxisOrder::EastNorth);
        assert_eq!(table.get(4).unwrap().north, "north");
        assert_eq!(
            diags.as_slice(),
            &[Diagnostic::InvalidCoordinate {
                line_num: 1,
                id: 4,
                value: "north".into()
            }]
        );
    }

    #[test]
    fn duplicate_id_last_write_wins() {
        let (table, diags) = parse("5 1 2 3\n5 4 5 6\n", " ", AxisOrder::EastNorth);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(5).unwrap().east, "4");
        assert_eq!(
            diags.as_slice(),
            &[Diagnostic::DuplicateCoordinateId { line_num: 2, id: 5 }]
        );
    }

    #[test]
    fn custom_separator_and_blank_lines() {
        let (table, diags) = parse("\n3, 1.5, 2.5, 3.5\r\n\n", ",", AxisOrder::EastNorth);
        assert!(diags.is_empty());
        let c = table.get(3).unwrap();
        assert_eq!((c.east.as_str(), c.north.as_str(), c.elev.as_str()), ("1.5", "2.5", "3.5"));
    }

    #[test]
    fn non_utf8_line_is_skipped() {
        let mut diags = Diagnostics::new();
        let table = CoordinateTable::from_reader(
            &b"7 1 2 3\n# Sz\xe9kesfeh\xe9rv\xe1r\n8 4 5 6\n"[..],
            " ",
            AxisOrder::EastNorth,
            &mut diags,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(8).unwrap().elev, "6");
        assert!(matches!(
            diags.as_slice(),
            [Diagnostic::MalformedRecord { line_num: 2, .. }]
        ));
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut diags = Diagnostics::new();
        let res = CoordinateTable::load(
            dir.path().join("nope.txt"),
            " ",
            AxisOrder::EastNorth,
            &mut diags,
        );
        assert!(matches!(res, Err(Error::CoordinateFile { .. })));
    }
}
