//! Configuration loading and priority resolution
//!
//! Every setting is resolved in this order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`SOAPI_*`, merged into the CLI layer by clap)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The location has no compiled default. A run without a location selection
//! is a configuration error.

use crate::{Error, Location, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_LOCAL_HOST: &str = "127.0.0.1";
pub const DEFAULT_LOCAL_PORT: u16 = 5780;
pub const DEFAULT_SOAP_HOST: &str = "localhost";
pub const DEFAULT_SOAP_PORT: u16 = 8080;
pub const DEFAULT_SOAP_PATH: &str = "/";
pub const DEFAULT_SERVICE_URN: &str = "urn:soapi:service:Playback:1";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// What happens to playback already under way when the trigger call fails
///
/// A server that is not streaming yet is always stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Request a server stop; the track being streamed finishes
    Stop,
    /// Let the stream play to the end of the playlist
    #[default]
    KeepPlaying,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "stop" => Ok(FailurePolicy::Stop),
            "keep-playing" => Ok(FailurePolicy::KeepPlaying),
            other => Err(Error::InvalidInput(format!(
                "unknown trigger failure policy '{}' (expected stop or keep-playing)",
                other
            ))),
        }
    }
}

/// Bootstrap configuration loaded from TOML file
///
/// All fields are optional; anything missing falls through to the compiled
/// defaults during [`Settings::resolve`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub local: LocalSection,

    #[serde(default)]
    pub soap: SoapSection,

    #[serde(default)]
    pub location: Option<Location>,

    #[serde(default)]
    pub on_trigger_failure: Option<FailurePolicy>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[local]` section: the playback server as seen by the remote device
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalSection {
    /// Host advertised to the remote device in the stream URL
    pub host: Option<String>,
    /// Interface to bind (defaults to `host`)
    pub bind_host: Option<String>,
    pub port: Option<u16>,
}

/// `[soap]` section: the actuation endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SoapSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub service_urn: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,

    /// Log file path (optional, logs to stderr only if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Values supplied on the command line or through `SOAPI_*` variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub local_host: Option<String>,
    pub bind_host: Option<String>,
    pub local_port: Option<u16>,
    pub soap_host: Option<String>,
    pub soap_port: Option<u16>,
    pub soap_path: Option<String>,
    pub soap_service_urn: Option<String>,
    pub soap_timeout_ms: Option<u64>,
    pub location: Option<Location>,
    pub on_trigger_failure: Option<FailurePolicy>,
}

/// Resolved playback server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSettings {
    pub advertise_host: String,
    pub bind_host: String,
    pub port: u16,
}

impl LocalSettings {
    /// Address string handed to the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Resolved actuation endpoint settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapSettings {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub service_urn: String,
    pub timeout: Option<Duration>,
}

/// Fully resolved run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub local: LocalSettings,
    pub soap: SoapSettings,
    pub location: Location,
    pub on_trigger_failure: FailurePolicy,
}

impl Settings {
    /// Merge overrides over the TOML file over compiled defaults
    pub fn resolve(overrides: ConfigOverrides, file: TomlConfig) -> Result<Self> {
        let location = overrides.location.or(file.location).ok_or_else(|| {
            let flags: Vec<String> = Location::ALL.iter().map(|l| format!("--{}", l.name())).collect();
            Error::Config(format!(
                "no location selected; pass --location <name> or one of {}",
                flags.join(", ")
            ))
        })?;

        let advertise_host = overrides
            .local_host
            .or(file.local.host)
            .unwrap_or_else(|| DEFAULT_LOCAL_HOST.to_string());
        let bind_host = overrides
            .bind_host
            .or(file.local.bind_host)
            .unwrap_or_else(|| advertise_host.clone());
        let local_port = overrides.local_port.or(file.local.port).unwrap_or(DEFAULT_LOCAL_PORT);

        let soap_port = overrides.soap_port.or(file.soap.port).unwrap_or(DEFAULT_SOAP_PORT);
        if soap_port == 0 {
            return Err(Error::Config("soap port must be non-zero".to_string()));
        }

        let mut soap_path = overrides
            .soap_path
            .or(file.soap.path)
            .unwrap_or_else(|| DEFAULT_SOAP_PATH.to_string());
        if !soap_path.starts_with('/') {
            soap_path.insert(0, '/');
        }

        let settings = Settings {
            local: LocalSettings {
                advertise_host,
                bind_host,
                port: local_port,
            },
            soap: SoapSettings {
                host: overrides
                    .soap_host
                    .or(file.soap.host)
                    .unwrap_or_else(|| DEFAULT_SOAP_HOST.to_string()),
                port: soap_port,
                path: soap_path,
                service_urn: overrides
                    .soap_service_urn
                    .or(file.soap.service_urn)
                    .unwrap_or_else(|| DEFAULT_SERVICE_URN.to_string()),
                timeout: overrides
                    .soap_timeout_ms
                    .or(file.soap.timeout_ms)
                    .map(Duration::from_millis),
            },
            location,
            on_trigger_failure: overrides
                .on_trigger_failure
                .or(file.on_trigger_failure)
                .unwrap_or_default(),
        };

        debug!(?settings, "Resolved configuration");
        Ok(settings)
    }
}

/// Load the TOML config file
///
/// An explicitly requested file must exist. Without one, the platform default
/// locations are tried and a missing file just yields an empty config.
pub fn load_config_file(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!("Config file not found: {}", path.display())));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) => path,
            None => {
                debug!("No config file found, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    info!("Loading config file: {}", path.display());
    parse_config_file(&path)
}

/// Parse a TOML config file at a known path
pub fn parse_config_file(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// First existing default config file for the platform
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("soapi").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/soapi/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}
