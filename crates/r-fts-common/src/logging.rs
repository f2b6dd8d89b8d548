//! ---
//! fts_section: "01-core-functionality"
//! fts_subsection: "module"
//! fts_type: "source"
//! fts_scope: "code"
//! fts_description: "Shared primitives and utilities for the fleet runtime."
//! fts_version: "v0.0.0-prealpha"
//! fts_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "R-FTS_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

// Keeps the file writer's background thread alive for the process lifetime.
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Output format of the stdout layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// One JSON object per line, for log shippers.
    #[default]
    StructuredJson,
    /// Human-readable output for interactive runs.
    Pretty,
}

/// Install the workspace tracing subscriber.
///
/// Stdout carries the operator-facing stream in the configured format; a
/// daily-rolling file under `logging.directory` keeps a JSON copy of the
/// same events. The filter comes from `R-FTS_LOG`, then `RUST_LOG`, then
/// `info`.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "unable to create log directory {}",
            config.directory.display()
        )
    })?;

    let appender =
        tracing_appender::rolling::daily(&config.directory, log_file_name(service_name, config));
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);

    let directive = filter_directive();
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("bad log filter '{directive}': {err}; using '{DEFAULT_DIRECTIVE}'");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    });

    let stdout_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer().json().with_target(false).boxed(),
        LogFormat::Pretty => fmt::layer().compact().boxed(),
    };
    let file_layer = fmt::layer().json().with_writer(file_writer).boxed();

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .ok();

    tracing::info!(
        service = service_name,
        log_dir = %config.directory.display(),
        "logging initialised"
    );
    Ok(())
}

/// File name of the rolling log; `file_prefix` wins over the service name.
fn log_file_name(service_name: &str, config: &LoggingConfig) -> String {
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
    format!("{prefix}.log")
}

fn filter_directive() -> String {
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_DIRECTIVE.to_owned())
}
