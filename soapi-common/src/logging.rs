//! Logging initialization
//!
//! Filter priority: `RUST_LOG` > command-line verbosity > `[logging] level`
//! from the TOML file > `warn`. The chosen level applies to the soapi crates;
//! everything else stays at `warn`.

use crate::config::{LoggingConfig, DEFAULT_LOG_LEVEL};
use crate::{Error, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crate targets that follow the configured level
const SOAPI_TARGETS: [&str; 3] = ["soapi_common", "soapi_cli", "soapcli"];

/// Build the default filter directive string for a level
pub fn default_directives(level: &str) -> String {
    let mut directives = vec![DEFAULT_LOG_LEVEL.to_string()];
    directives.extend(SOAPI_TARGETS.iter().map(|target| format!("{}={}", target, level)));
    if level == "debug" || level == "trace" {
        directives.push(format!("tower_http={}", level));
    }
    directives.join(",")
}

/// Pick the effective level from the CLI override and the config file
pub fn effective_level(cli_level: Option<&str>, config: &LoggingConfig) -> String {
    cli_level
        .map(str::to_string)
        .or_else(|| config.level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Install the global tracing subscriber
///
/// Returns the file writer guard when a log file is configured; it must be
/// kept alive until the process exits or buffered lines are lost.
pub fn init(cli_level: Option<&str>, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = effective_level(cli_level, config);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&level)))
        .map_err(|e| Error::Config(format!("invalid log level '{}': {}", level, e)))?;

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| Error::Config(format!("log file has no name: {}", path.display())))?;
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))?;

    Ok(guard)
}
