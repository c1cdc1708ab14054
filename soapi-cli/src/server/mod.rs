//! Playback server
//!
//! Owns the playlist and a serving resource, exposes the readiness latch,
//! and drives playback once started.
//!
//! Lifecycle: `Created → Starting → Listening → Playing → Stopped`, with
//! `Failed` reachable from any non-terminal state.

pub mod http;
pub mod readiness;

use crate::error::{Error, Result};
use crate::playlist::Playlist;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use http::HttpStreamer;
pub use readiness::{Readiness, ReadinessSignal, ReadinessWaiter};

/// Playback server lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Starting,
    Listening,
    /// Streaming the track at this playlist index
    Playing { track: usize },
    Stopped,
    Failed(Error),
}

impl ServerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerState::Stopped | ServerState::Failed(_))
    }

    /// Short lowercase name for logs and the health endpoint
    pub fn name(&self) -> &'static str {
        match self {
            ServerState::Created => "created",
            ServerState::Starting => "starting",
            ServerState::Listening => "listening",
            ServerState::Playing { .. } => "playing",
            ServerState::Stopped => "stopped",
            ServerState::Failed(_) => "failed",
        }
    }
}

/// Anything that can be bound and then serve a playlist
///
/// `bind` acquires the resource (listener, device) and returns the address
/// the remote device should use. `serve` runs until the playlist has been
/// played or the session's stop is requested.
#[async_trait]
pub trait ServingResource: Send + 'static {
    async fn bind(&mut self) -> Result<SocketAddr>;

    async fn serve(self: Box<Self>, session: PlaybackSession) -> Result<()>;
}

/// Handle given to the serving resource while it plays
#[derive(Clone)]
pub struct PlaybackSession {
    playlist: Arc<Playlist>,
    state: Arc<watch::Sender<ServerState>>,
    stop: CancellationToken,
    failure: Arc<OnceLock<Error>>,
}

impl PlaybackSession {
    pub fn playlist(&self) -> &Arc<Playlist> {
        &self.playlist
    }

    pub fn state(&self) -> ServerState {
        self.state.borrow().clone()
    }

    /// Record that the track at `index` started
    pub fn track_started(&self, index: usize) {
        self.state.send_replace(ServerState::Playing { track: index });
    }

    /// Whole playlist delivered; the server stops
    pub fn finished(&self) {
        info!("Playlist finished");
        self.stop.cancel();
    }

    /// Explicit stop (HTTP endpoint, signal, orchestrator)
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Record a playback failure and stop; only the first failure is kept
    pub fn fail(&self, err: Error) {
        error!("Playback failed: {}", err);
        let _ = self.failure.set(err);
        self.stop.cancel();
    }

    pub fn failure(&self) -> Option<Error> {
        self.failure.get().cloned()
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }
}

/// Cloneable observer of a running server
#[derive(Clone)]
pub struct ServerMonitor {
    state: watch::Receiver<ServerState>,
    readiness: ReadinessWaiter,
}

impl ServerMonitor {
    pub fn state(&self) -> ServerState {
        self.state.borrow().clone()
    }

    pub fn readiness(&self) -> ReadinessWaiter {
        self.readiness.clone()
    }

    /// Block until the server is listening or failed to start
    pub async fn wait_for_start(&self) -> Result<SocketAddr> {
        self.readiness.wait().await
    }

    /// Block until the server reaches `Stopped` or `Failed`
    pub async fn join(&self) -> Result<()> {
        let mut rx = self.state.clone();
        let terminal = rx.wait_for(ServerState::is_terminal).await.map(|s| s.clone());
        match terminal {
            Ok(ServerState::Failed(err)) => Err(err),
            Ok(_) => Ok(()),
            Err(_) => Err(Error::Internal(
                "server was dropped before reaching a terminal state".to_string(),
            )),
        }
    }
}

/// Playback server owning the playlist and its serving resource
pub struct PlaybackServer {
    playlist: Arc<Playlist>,
    resource: Option<Box<dyn ServingResource>>,
    readiness: ReadinessSignal,
    state: Arc<watch::Sender<ServerState>>,
    stop: CancellationToken,
}

impl PlaybackServer {
    pub fn new(playlist: Playlist, resource: impl ServingResource) -> Self {
        let (state, _rx) = watch::channel(ServerState::Created);
        Self {
            playlist: Arc::new(playlist),
            resource: Some(Box::new(resource)),
            readiness: ReadinessSignal::new(),
            state: Arc::new(state),
            stop: CancellationToken::new(),
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn state(&self) -> ServerState {
        self.state.borrow().clone()
    }

    pub fn monitor(&self) -> ServerMonitor {
        ServerMonitor {
            state: self.state.subscribe(),
            readiness: self.readiness.waiter(),
        }
    }

    /// Token that requests an explicit stop when cancelled
    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Block until the server is listening or failed to start
    pub async fn wait_for_start(&self) -> Result<SocketAddr> {
        self.readiness.waiter().wait().await
    }

    /// Bind the serving resource and fire the readiness latch
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if self.state() != ServerState::Created {
            return Err(Error::InvalidState(format!(
                "start called in state {}",
                self.state().name()
            )));
        }
        self.set_state(ServerState::Starting);

        let resource = self
            .resource
            .as_mut()
            .ok_or_else(|| Error::InvalidState("serving resource missing".to_string()))?;

        let bound = resource.bind().await;
        match bound {
            Ok(addr) => {
                self.set_state(ServerState::Listening);
                self.readiness.fire(addr);
                info!(%addr, tracks = self.playlist.len(), "Playback server ready");
                Ok(addr)
            }
            Err(err) => {
                let cause = match err {
                    Error::ServerStart(cause) => cause,
                    other => other.to_string(),
                };
                error!("Playback server failed to start: {}", cause);
                self.resource = None;
                self.readiness.fail(cause.clone());
                let err = Error::ServerStart(cause);
                self.set_state(ServerState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Play the playlist until it completes or a stop is requested
    ///
    /// Returns the terminal error if the server failed. Calling `join` again
    /// after a terminal state returns the same outcome.
    pub async fn join(&mut self) -> Result<()> {
        match self.state() {
            ServerState::Stopped => return Ok(()),
            ServerState::Failed(err) => return Err(err),
            ServerState::Listening => {}
            other => {
                return Err(Error::InvalidState(format!(
                    "join called in state {}",
                    other.name()
                )))
            }
        }

        let resource = self
            .resource
            .take()
            .ok_or_else(|| Error::InvalidState("serving resource already consumed".to_string()))?;
        let failure = Arc::new(OnceLock::new());
        let session = PlaybackSession {
            playlist: Arc::clone(&self.playlist),
            state: Arc::clone(&self.state),
            stop: self.stop.clone(),
            failure: Arc::clone(&failure),
        };

        let outcome = resource.serve(session).await.and_then(|()| match failure.get() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        });
        match outcome {
            Ok(()) => {
                info!("Playback server stopped");
                self.set_state(ServerState::Stopped);
                Ok(())
            }
            Err(err) => {
                let err = match err {
                    Error::Playback(_) => err,
                    other => Error::Playback(other.to_string()),
                };
                warn!("Playback server failed: {}", err);
                self.set_state(ServerState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    fn set_state(&self, state: ServerState) {
        self.state.send_replace(state);
    }
}
