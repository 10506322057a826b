use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::Result;
use crate::utils::common::ensure_directories_exist;

/// Installs the tracing subscriber for a binary: console output plus a
/// non-blocking `app.log` file sink under `log_dir`. The returned guard must
/// be held for the life of the process so buffered log lines are flushed.
pub fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    ensure_directories_exist(&[log_dir])?;

    let file_appender = tracing_appender::rolling::never(log_dir, "app.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(file_writer.and(std::io::stdout))
        .with_ansi(false)
        .init();

    Ok(guard)
}
