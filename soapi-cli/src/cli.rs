//! Command-line surface of `soapcli`

use crate::error::{Error, Result};
use clap::Parser;
use soapi_common::config::{ConfigOverrides, FailurePolicy};
use soapi_common::Location;
use std::path::PathBuf;

/// Stream a playlist over HTTP and trigger playback on a remote device
#[derive(Parser, Debug)]
#[command(name = "soapcli")]
#[command(about = "Serve songs over HTTP and tell a SOAP-controlled player at a location to play them")]
#[command(version)]
pub struct Args {
    /// Songs to play, in order (paths or file:// URLs)
    #[arg(required = true, value_name = "SONG")]
    pub songs: Vec<String>,

    /// Location of the device that should play the stream
    #[arg(long, value_name = "NAME")]
    pub location: Option<Location>,

    #[arg(long, help = "Play at SOUTH_VADER")]
    pub south_vader: bool,

    #[arg(long, help = "Play at NORTH_VADER")]
    pub north_vader: bool,

    #[arg(long, help = "Play at THE_L")]
    pub the_l: bool,

    #[arg(long, help = "Play at SOUTH_STAIRS")]
    pub south_stairs: bool,

    #[arg(long, help = "Play at NORTH_STAIRS")]
    pub north_stairs: bool,

    /// Host the remote device uses to reach this machine
    #[arg(long, env = "SOAPI_LOCAL_HOST")]
    pub local_host: Option<String>,

    /// Interface the playback server binds (defaults to --local-host)
    #[arg(long, env = "SOAPI_BIND_HOST")]
    pub bind_host: Option<String>,

    /// Playback server port (0 picks a free port)
    #[arg(long, env = "SOAPI_LOCAL_PORT")]
    pub local_port: Option<u16>,

    /// SOAP endpoint host
    #[arg(long, env = "SOAPI_SOAP_HOST")]
    pub soap_host: Option<String>,

    /// SOAP endpoint port
    #[arg(long, env = "SOAPI_SOAP_PORT")]
    pub soap_port: Option<u16>,

    /// SOAP endpoint path
    #[arg(long, env = "SOAPI_SOAP_PATH")]
    pub soap_path: Option<String>,

    /// Service URN used for the SOAP action
    #[arg(long, env = "SOAPI_SOAP_SERVICE_URN")]
    pub soap_service_urn: Option<String>,

    /// Timeout for the trigger call in milliseconds
    #[arg(long, env = "SOAPI_SOAP_TIMEOUT_MS")]
    pub soap_timeout_ms: Option<u64>,

    /// What to do with playback already under way if the trigger fails (keep-playing, stop)
    #[arg(long, env = "SOAPI_ON_TRIGGER_FAILURE", value_name = "POLICY")]
    pub on_trigger_failure: Option<FailurePolicy>,

    /// Config file (TOML)
    #[arg(long, env = "SOAPI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at info level
    #[arg(short, long)]
    pub verbose: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    /// The single location chosen on the command line, if any
    ///
    /// Selecting more than one location is an error. Selecting none is left to
    /// config resolution, which may still find one in the TOML file.
    pub fn location_selection(&self) -> Result<Option<Location>> {
        let flagged = [
            (self.south_vader, Location::SouthVader),
            (self.north_vader, Location::NorthVader),
            (self.the_l, Location::TheL),
            (self.south_stairs, Location::SouthStairs),
            (self.north_stairs, Location::NorthStairs),
        ];

        let mut selected: Vec<Location> = flagged
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, location)| *location)
            .collect();
        if let Some(location) = self.location {
            if !selected.contains(&location) {
                selected.push(location);
            }
        }

        match selected.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            many => {
                let names: Vec<&str> = many.iter().map(|l| l.name()).collect();
                Err(Error::Config(format!(
                    "more than one location selected: {}",
                    names.join(", ")
                )))
            }
        }
    }

    /// Log level requested by `-v`/`-d`
    pub fn log_level(&self) -> Option<&'static str> {
        if self.debug {
            Some("debug")
        } else if self.verbose {
            Some("info")
        } else {
            None
        }
    }

    /// Command-line and environment layer of the configuration
    pub fn overrides(&self) -> Result<ConfigOverrides> {
        Ok(ConfigOverrides {
            local_host: self.local_host.clone(),
            bind_host: self.bind_host.clone(),
            local_port: self.local_port,
            soap_host: self.soap_host.clone(),
            soap_port: self.soap_port,
            soap_path: self.soap_path.clone(),
            soap_service_urn: self.soap_service_urn.clone(),
            soap_timeout_ms: self.soap_timeout_ms,
            location: self.location_selection()?,
            on_trigger_failure: self.on_trigger_failure,
        })
    }
}
