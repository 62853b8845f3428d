use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Explicit `-v`/`-q` flags win; otherwise `RUST_LOG` controls the filter,
/// defaulting to `warn`. With a log file, output goes through a non-blocking
/// writer whose guard must be held until exit.
pub fn init_tracing(
    verbosity: &Verbosity<WarnLevel>,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let filter = if verbosity.is_present() {
        EnvFilter::new(verbosity.tracing_level_filter().to_string())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}
