//! Non-fatal conditions found while loading coordinates, detecting markers
//! and formatting output.
//!
//! Every diagnostic is logged the moment it is reported and is also retained,
//! so that front-ends can show the full list after a run.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A coordinate file line with too few fields or a non-integer ID.
    MalformedRecord { line_num: usize, line: String },
    /// A coordinate field which does not parse as a number. The line is
    /// still stored.
    InvalidCoordinate {
        line_num: usize,
        id: i32,
        value: String,
    },
    /// A marker ID given more than once in the coordinate file. The later
    /// line replaces the earlier one.
    DuplicateCoordinateId { line_num: usize, id: i32 },
    ImageReadFailure { image: String, reason: String },
    /// The detector backend failed on one image. The image contributes no
    /// markers.
    DetectionFailure { image: String, reason: String },
    NoMarkersFound { image: String },
    /// The same marker ID detected more than once on one image. All
    /// instances are kept.
    DuplicateMarkerId { image: String, ids: Vec<i32> },
    OverLimitDrop { id: i32, image: String },
    MissingCoordinates { id: i32 },
}

impl Diagnostic {
    /// Whether this indicates a problem with the input rather than a purely
    /// informational outcome.
    pub fn is_warning(&self) -> bool {
        use Diagnostic::*;
        match self {
            MalformedRecord { .. }
            | InvalidCoordinate { .. }
            | DuplicateCoordinateId { .. }
            | ImageReadFailure { .. }
            | DetectionFailure { .. }
            | DuplicateMarkerId { .. } => true,
            NoMarkersFound { .. } | OverLimitDrop { .. } | MissingCoordinates { .. } => false,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Diagnostic::*;
        match self {
            MalformedRecord { line_num, line } => {
                write!(f, "Illegal input on line {line_num}: {line}")
            }
            InvalidCoordinate {
                line_num,
                id,
                value,
            } => write!(
                f,
                "Invalid coordinate \"{value}\" for GCP {id} on line {line_num}"
            ),
            DuplicateCoordinateId { line_num, id } => write!(
                f,
                "GCP {id} given again on line {line_num}, earlier coordinates replaced"
            ),
            ImageReadFailure { image, reason } => {
                write!(f, "error reading image: {image} ({reason})")
            }
            DetectionFailure { image, reason } => {
                write!(f, "marker detection failed on image {image} ({reason})")
            }
            NoMarkersFound { image } => write!(f, "No markers found on image {image}"),
            DuplicateMarkerId { image, ids } => {
                write!(f, "duplicate markers on image {image}, marker ids: {ids:?}")
            }
            OverLimitDrop { id, image } => {
                write!(f, "GCP {id} over limit it is dropped on image {image}")
            }
            MissingCoordinates { id } => write!(f, "No coordinates for {id}"),
        }
    }
}

/// Collects diagnostics in the order they were reported.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `diagnostic` and keep it.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_warning() {
            tracing::warn!("{diagnostic}");
        } else {
            tracing::info!("{diagnostic}");
        }
        self.items.push(diagnostic);
    }

    /// Move all diagnostics of `other` to the end of `self` without logging
    /// them again.
    pub fn append(&mut self, other: &mut Diagnostics) {
        self.items.append(&mut other.items);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    /// The rendered messages, suitable for a list view.
    pub fn messages(&self) -> Vec<String> {
        self.items.iter().map(ToString::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn messages_match_reported_order() {
        let mut diags = Diagnostics::new();
        diags.report(Diagnostic::MissingCoordinates { id: 9 });
        diags.report(Diagnostic::OverLimitDrop {
            id: 3,
            image: "a.jpg".into(),
        });
        assert_eq!(
            diags.messages(),
            vec![
                "No coordinates for 9".to_string(),
                "GCP 3 over limit it is dropped on image a.jpg".to_string()
            ]
        );
    }

    #[test]
    fn append_keeps_order() {
        let mut a = Diagnostics::new();
        a.report(Diagnostic::NoMarkersFound {
            image: "1.jpg".into(),
        });
        let mut b = Diagnostics::new();
        b.report(Diagnostic::NoMarkersFound {
            image: "2.jpg".into(),
        });
        a.append(&mut b);
        assert!(b.is_empty());
        assert_eq!(a.len(), 2);
        assert_eq!(
            a.as_slice()[1],
            Diagnostic::NoMarkersFound {
                image: "2.jpg".into()
            }
        );
    }
}
