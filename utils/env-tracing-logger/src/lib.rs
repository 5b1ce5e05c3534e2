//! Logging setup shared by the command line tools in this workspace.
//!
//! Console output always goes to stderr. Stdout is reserved for the data the
//! tools produce (GCP lists, EXIF rows), which is frequently redirected into a
//! file.

use time::{UtcOffset, format_description::well_known::Iso8601};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
};

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Keeps logging alive. Does not borrow the arguments of the call which
/// created it.
pub struct Guard {}

impl Drop for Guard {
    fn drop(&mut self) {}
}

/// Start console logging at `info` unless `RUST_LOG` says otherwise.
pub fn init() -> Result<Guard, Error> {
    initiate_logging::<&str>(None, false, LevelFilter::INFO)
}

/// The default level filter for a given verbosity. An explicit `RUST_LOG`
/// always takes precedence over it.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

/// Start logging to file and console, both optional.
pub fn initiate_logging<P: AsRef<std::path::Path>>(
    path: Option<P>,
    disable_console: bool,
    default_level: LevelFilter,
) -> Result<Guard, Error> {
    // Create a fixed offset time formatter based on the timezone at the
    // time this line of code runs.
    let timer = OffsetTime::new(
        UtcOffset::from_whole_seconds(chrono::Local::now().offset().local_minus_utc())?,
        Iso8601::DEFAULT,
    );

    let file_layer = if let Some(path) = &path {
        let file = std::fs::File::create(path)?;
        let file_writer = std::sync::Mutex::new(file);
        Some(
            fmt::layer()
                .with_timer(timer.clone())
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(false),
        )
    } else {
        None
    };

    let console_layer = if disable_console {
        None
    } else {
        let with_ansi = !cfg!(windows);
        Some(
            fmt::layer()
                .with_timer(timer)
                .with_writer(std::io::stderr)
                .with_ansi(with_ansi)
                .with_target(false),
        )
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let collector = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(env_filter);
    tracing::subscriber::set_global_default(collector)?;

    let log_var = if let Ok(var) = std::env::var("RUST_LOG") {
        format!(" with RUST_LOG=\"{}\".", var)
    } else {
        format!(" at default level {default_level}.")
    };

    if let Some(path) = &path {
        tracing::debug!(
            "Logging initiated to file \"{}\"{log_var}",
            path.as_ref().display(),
        );
    }

    if !disable_console {
        tracing::debug!("Logging initiated to stderr{log_var}");
    }

    Ok(Guard {})
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(default_level(false), LevelFilter::INFO);
        assert_eq!(default_level(true), LevelFilter::DEBUG);
    }

    #[test]
    fn file_logging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let log_file = Some(path.clone());
        let guard = initiate_logging(log_file.as_ref(), true, LevelFilter::DEBUG).unwrap();
        // the guard does not borrow the path it was created from
        drop(log_file);
        tracing::info!("hello from the test");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("hello from the test"));
        drop(guard);
    }
}
