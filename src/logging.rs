//! Sets up `tracing` for the binaries.

use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log INFO and above to stdout, and DEBUG and above to `log_file_path`.
///
/// The log file is created if needed and appended to otherwise.
///
/// # Errors
/// Returns an error if the log file cannot be opened.
pub fn setup_logging(log_file_path: &Path) -> Result<(), io::Error> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();

    Ok(())
}
