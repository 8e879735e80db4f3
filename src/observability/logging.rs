use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::LOG_FILE_PREFIX;
use crate::error::Result;

/// Initializes logging with console output and a daily-rotated JSON file
/// under `logs_dir`. `RUST_LOG` wins over `default_level` when set.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the whole run. Fails if `logs_dir` cannot be created.
pub fn init_logging(logs_dir: &Path, default_level: &str) -> Result<WorkerGuard> {
    fs::create_dir_all(logs_dir)?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ocupacion_etl={},warn", default_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}
