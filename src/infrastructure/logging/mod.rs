//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber: pretty or JSON
//! console output, `RUST_LOG`-style filtering, and optional daily-rotated
//! file output. The engine itself only emits `tracing` events; calling
//! [`init`] is the host's choice.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use super::config::LoggingSettings;

/// Keeps the non-blocking file writer alive. Drop it and buffered log lines
/// may be lost.
pub struct LoggerGuard {
    _guard: Option<WorkerGuard>,
}

/// Install the global tracing subscriber from `settings`.
///
/// Returns an error when a subscriber is already installed or the level
/// string is unknown.
pub fn init(settings: &LoggingSettings) -> Result<LoggerGuard> {
    let level = parse_level(&settings.level)?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let console_layer: Box<dyn Layer<_> + Send + Sync> = if settings.format == "json" {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().pretty().boxed()
    };

    let (file_layer, guard) = match &settings.log_dir {
        Some(dir) => {
            let appender = rolling::daily(dir, "gepa.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(LoggerGuard { _guard: guard })
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(anyhow!("unknown log level: {other}")),
    }
}
