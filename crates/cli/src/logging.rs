use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// Console output goes to stderr so command output on stdout stays clean.
/// `RUST_LOG` wins over `level`. A file layer is added when `log_file` (or
/// `LOG_FILE_PATH`) is set; keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init_logger(level: Option<&str>, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));

    let file_path = log_file
        .map(Path::to_path_buf)
        .or_else(|| env::var_os("LOG_FILE_PATH").filter(|v| !v.is_empty()).map(Into::into));

    let (file_layer, guard) = match file_path {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "log".into());
            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().with_writer(non_blocking).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).compact())
        .with(file_layer)
        .with(filter_layer)
        .try_init()
        .is_ok();

    if installed {
        debug!("Tracing is configured");
    }
    guard
}
