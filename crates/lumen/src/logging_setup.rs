use anyhow::{Context, Result};
use lumen_core::LogConfig;
use std::fs::File;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Keeps the file writer thread alive; drop it last
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// Returns a guard only when a log file is configured.
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    config
        .ensure_log_directory()
        .context("Failed to create log directory")?;

    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(env_filter(config))
    });

    let file_writer = config.file.as_deref().map(open_log_file).transpose()?;
    let (file_layer, guard) = match file_writer {
        Some((writer, guard)) => (
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(env_filter(config)),
            ),
            Some(LogGuard { _guard: guard }),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        level = %config.level,
        file = ?config.file,
        "Logging initialized"
    );

    Ok(guard)
}

/// `RUST_LOG` wins over the configured level
fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy()
}

fn open_log_file(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let file =
        File::create(path).with_context(|| format!("Failed to create log file: {:?}", path))?;
    Ok(tracing_appender::non_blocking(file))
}
