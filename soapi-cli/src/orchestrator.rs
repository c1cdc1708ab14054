//! Run orchestration
//!
//! Runs the playback server (start, then join) and the remote controller as
//! two tasks on a `JoinSet` and waits for both. The first failure becomes the
//! run's result and cancellation is requested for the other task:
//! - server failure always cancels the controller
//! - controller failure stops a server nobody is streaming from yet; a
//!   server already playing is stopped only under `FailurePolicy::Stop`
//!
//! Cancellation is advisory. A trigger call already in flight finishes.

use crate::controller::RemoteController;
use crate::error::{Error, Result};
use crate::server::{PlaybackServer, ServerState};
use soapi_common::config::FailurePolicy;
use std::fmt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// The two concurrent units of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Server,
    Controller,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Server => write!(f, "playback server"),
            Unit::Controller => write!(f, "remote controller"),
        }
    }
}

/// Fan-out/fan-in of one playback session
pub struct Orchestrator {
    policy: FailurePolicy,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops both units (signal handling)
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run both units to completion and aggregate their outcomes
    pub async fn run(self, mut server: PlaybackServer, controller: RemoteController) -> Result<()> {
        let server_stop = server.stop_handle();
        let monitor = server.monitor();
        let controller_cancel = CancellationToken::new();

        let mut units = JoinSet::new();
        units.spawn(async move {
            let outcome = match server.start().await {
                Ok(_) => server.join().await,
                Err(err) => Err(err),
            };
            (Unit::Server, outcome)
        });
        {
            let cancel = controller_cancel.clone();
            units.spawn(async move { (Unit::Controller, controller.run(cancel).await) });
        }

        let mut first_failure: Option<Error> = None;
        let mut shutdown_seen = false;

        loop {
            let joined = tokio::select! {
                joined = units.join_next() => joined,
                _ = self.shutdown.cancelled(), if !shutdown_seen => {
                    shutdown_seen = true;
                    info!("Shutdown requested, stopping both units");
                    server_stop.cancel();
                    controller_cancel.cancel();
                    continue;
                }
            };
            let Some(joined) = joined else {
                break;
            };

            let (unit, outcome) = match joined {
                Ok(finished) => finished,
                Err(join_err) => {
                    let err = Error::Internal(format!("unit task failed: {}", join_err));
                    error!("{}", err);
                    server_stop.cancel();
                    controller_cancel.cancel();
                    first_failure.get_or_insert(err);
                    continue;
                }
            };

            match outcome {
                Ok(()) => info!("{} finished", unit),
                Err(err) if first_failure.is_some() => {
                    debug!("{} ended after an earlier failure: {}", unit, err);
                }
                Err(err) => {
                    error!("{} failed: {}", unit, err);
                    match unit {
                        Unit::Server => controller_cancel.cancel(),
                        Unit::Controller => match (monitor.state(), self.policy) {
                            (ServerState::Playing { track }, FailurePolicy::KeepPlaying) => {
                                info!(track, "Trigger failed, letting the current stream finish");
                            }
                            (ServerState::Playing { track }, FailurePolicy::Stop) => {
                                info!(track, "Stopping playback after trigger failure");
                                server_stop.cancel();
                            }
                            (state, _) => {
                                info!(state = state.name(), "Trigger failed, stopping idle playback server");
                                server_stop.cancel();
                            }
                        },
                    }
                    first_failure = Some(err);
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
