//! soapcli - main entry point
//!
//! Serves the given songs over HTTP and triggers playback at the selected
//! location once the server is listening. Exits 0 when both the server and
//! the trigger succeed, 1 otherwise.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use soapi_cli::cli::Args;
use soapi_cli::controller::{RemoteController, SoapActuator, TriggerEndpoint};
use soapi_cli::orchestrator::Orchestrator;
use soapi_cli::playlist::PlaylistBuilder;
use soapi_cli::server::{HttpStreamer, PlaybackServer};
use soapi_common::config::{self, Settings};
use soapi_common::logging;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let overrides = args.overrides()?;
    let file_config = config::load_config_file(args.config.as_deref())?;
    let _log_guard = logging::init(args.log_level(), &file_config.logging)?;

    info!(
        "soapcli {} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let settings = Settings::resolve(overrides, file_config)?;
    info!(
        location = %settings.location,
        policy = ?settings.on_trigger_failure,
        "Serving on {} (advertised as {}), trigger endpoint {}:{}{}",
        settings.local.bind_addr(),
        settings.local.advertise_host,
        settings.soap.host,
        settings.soap.port,
        settings.soap.path
    );

    let playlist = PlaylistBuilder::build(&args.songs).context("Failed to build playlist")?;
    info!(
        "Playlist ready: {} track(s), {} bytes",
        playlist.len(),
        playlist.total_bytes()
    );

    let server = PlaybackServer::new(playlist, HttpStreamer::new(settings.local.bind_addr()));
    let actuator = SoapActuator::new(TriggerEndpoint::from_settings(&settings.soap), settings.soap.timeout)?;
    let controller = RemoteController::new(
        server.monitor().readiness(),
        actuator,
        settings.location,
        settings.local.advertise_host.clone(),
    );

    let orchestrator = Orchestrator::new(settings.on_trigger_failure);
    let shutdown = orchestrator.shutdown_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    orchestrator
        .run(server, controller)
        .await
        .context("Playback run failed")?;

    info!("Playback complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
