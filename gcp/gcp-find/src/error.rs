use std::path::PathBuf;

/// Fatal errors. Any of these aborts the run.
///
/// Per-line and per-image problems are not errors, see
/// [crate::diagnostics::Diagnostic].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot open input file {path}: {source}")]
    CoordinateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot open output file {path}: {source}")]
    OutputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no input images given")]
    NoImages,
    #[error("unknown marker dictionary id {0} (use --list to show valid ids)")]
    UnknownDictionary(i32),
    #[error("invalid detector parameter: {0}")]
    InvalidParams(String),
    #[error("reading parameter file {path}: {source}")]
    ParamFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing YAML parameter file {path}: {source}")]
    ParamFileYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("parsing JSON parameter file {path}: {source}")]
    ParamFileJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no marker detector available: built without the \"opencv\" feature")]
    DetectorUnavailable,
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
